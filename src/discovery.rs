//! Bridge discovery via the vendor's N-UPnP endpoint.

use std::time::Duration;

use log::info;
use serde::Deserialize;

use crate::bridge::BridgeBuilder;
use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// Public endpoint listing the bridges seen on the caller's network.
pub const DISCOVERY_URL: &str = "https://discovery.meethue.com/";

/// A bridge reported by the discovery endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiscoveredBridge {
    /// Bridge id
    pub id: String,
    /// Address of the bridge on the local network
    #[serde(rename = "internalipaddress")]
    pub internal_ip_address: String,
}

impl DiscoveredBridge {
    /// Start building a [`crate::Bridge`] for this address.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let bridges = discover_bridges().await?;
    /// if let Some(found) = bridges.first() {
    ///     let bridge = found.builder().connect().await?;
    /// }
    /// ```
    pub fn builder(&self) -> BridgeBuilder {
        BridgeBuilder::default().address(&self.internal_ip_address)
    }
}

/// Ask the vendor's discovery endpoint which bridges share this network.
///
/// # Examples
///
/// ```ignore
/// use hue_lights_rs::discover_bridges;
///
/// for bridge in discover_bridges().await? {
///     println!("{} - {}", bridge.id, bridge.internal_ip_address);
/// }
/// ```
pub async fn discover_bridges() -> Result<Vec<DiscoveredBridge>> {
    discover_bridges_at(DISCOVERY_URL).await
}

/// Like [`discover_bridges`], against any endpoint answering in the same format.
pub async fn discover_bridges_at(url: &str) -> Result<Vec<DiscoveredBridge>> {
    info!("Connecting to {}", url);
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    let response = client.get(url).send().await?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(Error::Remote {
            status: status.as_u16(),
            body,
        });
    }

    let bridges: Vec<DiscoveredBridge> = serde_json::from_str(&body).map_err(Error::JsonLoad)?;
    Ok(bridges
        .into_iter()
        .filter(|bridge| !bridge.internal_ip_address.is_empty())
        .collect())
}
