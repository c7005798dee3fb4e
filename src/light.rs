//! Individual light control and the capability shared with groups.

use std::future::Future;
use std::sync::Arc;

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::connection::Connection;
use crate::errors::Error;
use crate::resource::{ResourceKind, Update};
use crate::types::{Alert, Brightness, Effect, Hue, Kelvin, Mired, Saturation, Xy};

type Result<T> = std::result::Result<T, Error>;

/// Client-side bookkeeping for the off-with-transition firmware quirk.
///
/// Switching a bulb off with a transition time leaves its brightness pinned
/// near zero; the next power-on must re-send the brightness seen before.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrightnessRestore {
    /// Last brightness read from or written to this proxy.
    pub brightness: Option<u8>,
    /// Set once the proxy switched off while a transition time was configured.
    pub pending: bool,
}

/// Light-state surface shared by single lights and groups.
///
/// Every getter performs a fresh read; nothing is served from a cache.
#[allow(async_fn_in_trait)]
pub trait LightLike: Send {
    /// The session this proxy reads and writes through.
    fn connection(&self) -> &Connection;

    /// Read one attribute of this resource.
    fn read(&self, attribute: &str) -> impl Future<Output = Result<Value>> + Send;

    /// Write an update to this resource, applying the configured transition time.
    fn write(&mut self, update: Update) -> impl Future<Output = Result<Value>> + Send;

    /// Fade duration for writes, in tenths of a second.
    fn transition_time(&self) -> Option<u16>;

    fn restore(&mut self) -> &mut BrightnessRestore;

    async fn name(&self) -> Result<String> {
        decode(self.read("name").await?)
    }

    async fn on(&self) -> Result<bool> {
        decode(self.read("on").await?)
    }

    /// Switch on or off.
    ///
    /// Switching off with a transition time marks the brightness for restore;
    /// the next switch-on first re-sends the cached brightness, then `on`.
    async fn set_on(&mut self, on: bool) -> Result<Value> {
        if on {
            let restore = *self.restore();
            if restore.pending {
                match restore.brightness {
                    Some(bri) => {
                        warn!(
                            target: self.connection().log_target(),
                            "Light was turned off with transitiontime specified, brightness needs to be reset now."
                        );
                        self.write(Update::attribute("bri", bri)).await?;
                    }
                    None => warn!(
                        target: self.connection().log_target(),
                        "Light was turned off with transitiontime specified but no brightness was ever observed"
                    ),
                }
                self.restore().pending = false;
            }
        } else if self.transition_time().is_some() {
            warn!(
                target: self.connection().log_target(),
                "Turned off light with transitiontime specified, brightness will be reset on power on"
            );
            self.restore().pending = true;
        }

        self.write(Update::attribute("on", on)).await
    }

    async fn brightness(&mut self) -> Result<u8> {
        let bri: u8 = decode(self.read("bri").await?)?;
        self.restore().brightness = Some(bri);
        Ok(bri)
    }

    async fn set_brightness(&mut self, value: u8) -> Result<Value> {
        let bri = Brightness::clamped_for(value, self.connection().log_target()).value();
        self.restore().brightness = Some(bri);
        self.write(Update::attribute("bri", bri)).await
    }

    async fn hue(&self) -> Result<u16> {
        decode(self.read("hue").await?)
    }

    async fn set_hue(&mut self, value: u16) -> Result<Value> {
        self.write(Update::attribute("hue", Hue::new(value).value())).await
    }

    async fn saturation(&self) -> Result<u8> {
        decode(self.read("sat").await?)
    }

    async fn set_saturation(&mut self, value: u8) -> Result<Value> {
        let sat = Saturation::clamped_for(value, self.connection().log_target()).value();
        self.write(Update::attribute("sat", sat)).await
    }

    async fn xy(&self) -> Result<Xy> {
        decode(self.read("xy").await?)
    }

    async fn set_xy(&mut self, x: f64, y: f64) -> Result<Value> {
        let xy = Xy::clamped_for(x, y, self.connection().log_target());
        let xy = serde_json::to_value(xy).map_err(Error::JsonDump)?;
        self.write(Update::attribute("xy", xy)).await
    }

    /// Color temperature in mireds.
    async fn colortemp(&self) -> Result<u16> {
        decode(self.read("ct").await?)
    }

    async fn set_colortemp(&mut self, mireds: u16) -> Result<Value> {
        let ct = Mired::clamped_for(mireds, self.connection().log_target()).value();
        self.write(Update::attribute("ct", ct)).await
    }

    /// Color temperature in Kelvin, derived from the mired value as reported.
    async fn colortemp_k(&self) -> Result<u16> {
        let value = self.colortemp().await?;
        Ok(Mired { value }.to_kelvin())
    }

    async fn set_colortemp_k(&mut self, kelvin: u16) -> Result<Value> {
        let kelvin = Kelvin::clamped_for(kelvin, self.connection().log_target());
        let mireds = kelvin.to_mired();
        debug!(
            target: self.connection().log_target(),
            "{} K is {} mireds", kelvin.kelvin(), mireds.value()
        );
        self.set_colortemp(mireds.value()).await
    }

    async fn effect(&self) -> Result<Effect> {
        decode(self.read("effect").await?)
    }

    async fn set_effect(&mut self, effect: Effect) -> Result<Value> {
        self.write(Update::attribute("effect", effect.as_ref())).await
    }

    async fn alert(&self) -> Result<Alert> {
        decode(self.read("alert").await?)
    }

    /// `None` clears any running alert.
    async fn set_alert(&mut self, alert: Option<Alert>) -> Result<Value> {
        let alert = alert.unwrap_or_default();
        self.write(Update::attribute("alert", alert.as_ref())).await
    }

    /// Current color mode: `hs`, `xy` or `ct`.
    async fn colormode(&self) -> Result<String> {
        decode(self.read("colormode").await?)
    }
}

pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(Error::JsonLoad)
}

/// Take the single outcome of a one-target write.
pub(crate) fn single(mut results: Vec<Result<Value>>) -> Result<Value> {
    match results.pop() {
        Some(result) if results.is_empty() => result,
        _ => Err(Error::UnexpectedResponse(Value::Null)),
    }
}

/// Proxy for one light on the bridge.
///
/// A `Light` holds no authoritative state: every read goes to the bridge.
/// The transition time configured here is applied to every write made
/// through this proxy.
///
/// # Example
///
/// ```ignore
/// use hue_lights_rs::{Bridge, LightLike};
///
/// let mut bridge = Bridge::builder().address("192.168.1.10").connect().await?;
/// let light = bridge.light("Kitchen").await?;
/// light.set_transition_time(Some(20));
/// light.set_brightness(200).await?;
/// light.set_on(false).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Light {
    conn: Arc<Connection>,
    light_id: u32,
    transition_time: Option<u16>,
    restore: BrightnessRestore,
}

impl Light {
    pub fn new(conn: Arc<Connection>, light_id: u32) -> Self {
        Light {
            conn,
            light_id,
            transition_time: None,
            restore: BrightnessRestore::default(),
        }
    }

    pub fn light_id(&self) -> u32 {
        self.light_id
    }

    pub fn set_transition_time(&mut self, transition_time: Option<u16>) {
        self.transition_time = transition_time;
    }

    /// Full resource object as reported by the bridge.
    pub async fn state(&self) -> Result<Value> {
        self.conn
            .get_resource(ResourceKind::Light, self.light_id, None)
            .await
    }

    /// Rename the light on the bridge.
    ///
    /// Use [`crate::Bridge::rename_light`] to keep the bridge's name index in step.
    pub async fn set_name(&mut self, name: &str) -> Result<Value> {
        debug!(
            target: self.conn.log_target(),
            "Renaming light {} to '{}'", self.light_id, name
        );
        self.write(Update::attribute("name", name)).await
    }

    pub async fn reachable(&self) -> Result<bool> {
        decode(self.read("reachable").await?)
    }

    pub async fn light_type(&self) -> Result<String> {
        decode(self.read("type").await?)
    }
}

impl LightLike for Light {
    fn connection(&self) -> &Connection {
        &self.conn
    }

    async fn read(&self, attribute: &str) -> Result<Value> {
        self.conn
            .get_resource(ResourceKind::Light, self.light_id, Some(attribute))
            .await
    }

    async fn write(&mut self, update: Update) -> Result<Value> {
        if let Some(tt) = self.transition_time {
            debug!(
                target: self.conn.log_target(),
                "Setting with transitiontime = {} ds = {} s", tt, f64::from(tt) / 10.0
            );
        }
        let results = self
            .conn
            .set_resources(ResourceKind::Light, self.light_id.into(), update, self.transition_time)
            .await;
        single(results)
    }

    fn transition_time(&self) -> Option<u16> {
        self.transition_time
    }

    fn restore(&mut self) -> &mut BrightnessRestore {
        &mut self.restore
    }
}
