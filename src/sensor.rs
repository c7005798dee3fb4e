//! Sensor proxies and sensor creation requests.

use std::sync::Arc;

use log::{debug, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;

use crate::connection::Connection;
use crate::errors::Error;
use crate::light::decode;
use crate::resource::{ResourceKind, Update, embedded_error};
use crate::transport::Method;

type Result<T> = std::result::Result<T, Error>;

/// Which part of a sensor object a write addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SensorSection {
    Root,
    State,
    Config,
}

impl SensorSection {
    fn suffix(&self) -> &'static str {
        match self {
            SensorSection::Root => "",
            SensorSection::State => "/state",
            SensorSection::Config => "/config",
        }
    }
}

/// PUT `update` to one section of a sensor.
///
/// `lastupdated` is read-only on the bridge and is dropped from state and
/// config writes.
pub(crate) async fn write_sensor(
    conn: &Connection,
    sensor_id: u32,
    section: SensorSection,
    update: Update,
) -> Result<Value> {
    let mut body = update.into_body();
    if section != SensorSection::Root {
        body.remove("lastupdated");
    }
    let body = Value::Object(body);
    debug!(target: conn.log_target(), "{}", body);

    let path = conn.api_path(&format!("/sensors/{}{}", sensor_id, section.suffix()));
    let result = conn.request(Method::Put, &path, Some(&body)).await?;
    if let Some(error) = embedded_error(&result) {
        warn!(
            target: conn.log_target(),
            "ERROR: {} for sensor {}", error.description, sensor_id
        );
    }
    debug!(target: conn.log_target(), "{}", result);
    Ok(result)
}

/// A sensor registered on the bridge.
///
/// Every accessor reads the sensor object fresh; all sensor fields live at
/// the top level of that object.
#[derive(Debug, Clone)]
pub struct Sensor {
    conn: Arc<Connection>,
    sensor_id: u32,
}

impl Sensor {
    pub fn new(conn: Arc<Connection>, sensor_id: u32) -> Self {
        Sensor { conn, sensor_id }
    }

    pub fn sensor_id(&self) -> u32 {
        self.sensor_id
    }

    async fn read(&self, attribute: &str) -> Result<Value> {
        self.conn
            .get_resource(ResourceKind::Sensor, self.sensor_id, Some(attribute))
            .await
    }

    async fn read_string(&self, attribute: &str) -> Result<String> {
        decode(self.read(attribute).await?)
    }

    pub async fn name(&self) -> Result<String> {
        self.read_string("name").await
    }

    pub async fn set_name(&mut self, name: &str) -> Result<Value> {
        debug!(
            target: self.conn.log_target(),
            "Renaming sensor {} to '{}'", self.sensor_id, name
        );
        write_sensor(
            &self.conn,
            self.sensor_id,
            SensorSection::Root,
            Update::attribute("name", name),
        )
        .await
    }

    /// Identifier of the hardware model.
    pub async fn modelid(&self) -> Result<String> {
        self.read_string("modelid").await
    }

    /// Firmware version.
    pub async fn swversion(&self) -> Result<String> {
        self.read_string("swversion").await
    }

    /// Sensor type, such as `ZLLPresence` or `CLIPGenericStatus`.
    pub async fn sensor_type(&self) -> Result<String> {
        self.read_string("type").await
    }

    pub async fn uniqueid(&self) -> Result<String> {
        self.read_string("uniqueid").await
    }

    pub async fn manufacturername(&self) -> Result<String> {
        self.read_string("manufacturername").await
    }

    /// Whether the bridge removes this sensor once nothing references it.
    pub async fn recycle(&self) -> Result<bool> {
        decode(self.read("recycle").await?)
    }

    pub async fn state(&self) -> Result<Map<String, Value>> {
        decode(self.read("state").await?)
    }

    /// Write some or all of the sensor's state. Read-only keys are rejected
    /// by the bridge per key.
    pub async fn set_state(&mut self, state: Map<String, Value>) -> Result<Value> {
        write_sensor(&self.conn, self.sensor_id, SensorSection::State, state.into()).await
    }

    pub async fn config(&self) -> Result<Map<String, Value>> {
        decode(self.read("config").await?)
    }

    pub async fn set_config(&mut self, config: Map<String, Value>) -> Result<Value> {
        write_sensor(&self.conn, self.sensor_id, SensorSection::Config, config.into()).await
    }
}

/// Body of a sensor creation request.
///
/// Empty `state` and `config` maps are left out of the request.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewSensor {
    pub name: String,
    pub modelid: String,
    pub swversion: String,
    #[serde(rename = "type")]
    pub sensor_type: String,
    pub uniqueid: String,
    pub manufacturername: String,
    pub recycle: bool,
    pub state: Option<Map<String, Value>>,
    pub config: Option<Map<String, Value>>,
}

impl NewSensor {
    pub fn new(
        name: &str,
        modelid: &str,
        swversion: &str,
        sensor_type: &str,
        uniqueid: &str,
        manufacturername: &str,
    ) -> Self {
        NewSensor {
            name: name.to_string(),
            modelid: modelid.to_string(),
            swversion: swversion.to_string(),
            sensor_type: sensor_type.to_string(),
            uniqueid: uniqueid.to_string(),
            manufacturername: manufacturername.to_string(),
            ..Default::default()
        }
    }

    pub fn recycle(mut self, recycle: bool) -> Self {
        self.recycle = recycle;
        self
    }

    pub fn state(mut self, state: Map<String, Value>) -> Self {
        self.state = (!state.is_empty()).then_some(state);
        self
    }

    pub fn config(mut self, config: Map<String, Value>) -> Self {
        self.config = (!config.is_empty()).then_some(config);
        self
    }

    pub(crate) fn to_body(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(Error::JsonDump)
    }
}
