//! # hue_lights_rs
//!
//! An async Rust library for controlling Hue lights through a bridge on the
//! local network.
//!
//! The bridge speaks JSON over HTTP. This crate pairs with a bridge, keeps
//! the issued username in a small credential file, and exposes lights, groups
//! and sensors as proxy objects that read and write through to the bridge.
//!
//! ## Quick Start
//!
//! ```ignore
//! use hue_lights_rs::{Bridge, Error, LightLike};
//!
//! async fn control_lights() -> Result<(), Error> {
//!     // Reads the username from ~/.python_hue, or registers with the bridge.
//!     let mut bridge = Bridge::builder().address("192.168.1.10").connect().await?;
//!
//!     // Cached proxies by id or name
//!     let kitchen = bridge.light("Kitchen").await?;
//!     kitchen.set_on(true).await?;
//!     kitchen.set_brightness(200).await?;
//!
//!     // Bulk writes, one request per light
//!     for result in bridge.set_light(vec![1u32, 2, 3], ("ct", 370), None).await {
//!         result?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Pairing
//!
//! The first connection to a bridge needs its link button pressed. Until it
//! is, [`BridgeBuilder::connect`] fails with [`Error::Registration`]; press
//! the button and connect again. The issued username is written to the
//! credential file and reused from then on.
//!
//! ## Features
//!
//! - **Lights and Groups**: Shared light-state surface through [`LightLike`]
//! - **Sensors**: Read and update sensor state and config with [`Sensor`]
//! - **Scenes**: Activate scenes by group and scene name with [`Bridge::run_scene`]
//! - **Schedules**: Timed light and group commands
//! - **Value types**: Clamped [`Brightness`], [`Hue`], [`Mired`], [`Kelvin`] and [`Xy`]
//! - **Discovery**: Find bridges with [`discover_bridges`]
//! - **Remote access**: Reach a bridge through the vendor cloud with [`RemoteTransport`]
//! - **Request history**: Recent exchanges through [`Bridge::history`]
//!
//! ## Logging
//!
//! Records go through the [`log`] facade under a per-bridge target, which
//! defaults to `hue_lights_rs::bridge` and can be changed with
//! [`BridgeBuilder::log_target`].

mod bridge;
mod connection;
mod credentials;
mod discovery;
mod errors;
mod group;
mod history;
mod light;
pub mod registration;
pub mod remote;
mod resource;
mod scene;
mod sensor;
#[cfg(test)]
mod testing;
mod transport;
mod types;

// Re-export public API
pub use bridge::{Bridge, BridgeBuilder};
pub use connection::Connection;
pub use credentials::{
    CONFIG_FILE_NAME, CredentialStore, LoadOutcome, StoredCredential, default_config_path,
};
pub use discovery::{DISCOVERY_URL, DiscoveredBridge, discover_bridges, discover_bridges_at};
pub use errors::Error;
pub use group::Group;
pub use history::{HistoryEntry, HistorySummary, MessageHistory, MessageType};
pub use light::{BrightnessRestore, Light, LightLike};
pub use registration::{ConnectState, Connector};
pub use remote::{RemoteTransport, TokenPair, TokenStore};
pub use resource::{
    ApiError, Field, ResourceKey, ResourceKind, Targets, Update, embedded_error, field_location,
};
pub use scene::Scene;
pub use sensor::{NewSensor, Sensor};
pub use transport::{HttpTransport, Method, Transport};
pub use types::{Alert, Brightness, Effect, Hue, Kelvin, Mired, Saturation, Xy};
