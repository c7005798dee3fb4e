//! The bridge facade: connection setup, resource caches and named operations.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde_json::{Value, json};

use crate::connection::Connection;
use crate::credentials::{CredentialStore, default_config_path};
use crate::errors::Error;
use crate::group::Group;
use crate::history::MessageHistory;
use crate::light::{Light, LightLike, decode};
use crate::registration::{Connector, DEFAULT_DEVICE_TYPE};
use crate::resource::{ResourceKey, ResourceKind, Targets, Update, embedded_error};
use crate::scene::Scene;
use crate::sensor::{NewSensor, Sensor, SensorSection, write_sensor};
use crate::transport::{HttpTransport, Method, Transport};

type Result<T> = std::result::Result<T, Error>;

/// Options for connecting to a bridge.
///
/// Anything left unset is resolved on [`BridgeBuilder::connect`]: the address
/// and username come from the credential file, falling back to registering
/// with the bridge.
pub struct BridgeBuilder {
    address: Option<String>,
    username: Option<String>,
    config_file_path: Option<PathBuf>,
    timeout: Duration,
    device_type: String,
    transport: Option<Box<dyn Transport>>,
    log_target: String,
}

impl Default for BridgeBuilder {
    fn default() -> Self {
        BridgeBuilder {
            address: None,
            username: None,
            config_file_path: None,
            timeout: HttpTransport::DEFAULT_TIMEOUT,
            device_type: DEFAULT_DEVICE_TYPE.to_string(),
            transport: None,
            log_target: module_path!().to_string(),
        }
    }
}

impl BridgeBuilder {
    /// Bridge host, optionally with a port.
    pub fn address(mut self, address: &str) -> Self {
        self.address = Some(address.to_string());
        self
    }

    pub fn username(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    /// Credential file to read and write instead of the default location.
    pub fn config_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file_path = Some(path.into());
        self
    }

    /// Timeout applied to each request by the default HTTP transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Identifier sent with the registration request.
    pub fn device_type(mut self, device_type: &str) -> Self {
        self.device_type = device_type.to_string();
        self
    }

    /// Replace the HTTP transport, e.g. with a
    /// [`RemoteTransport`](crate::remote::RemoteTransport).
    pub fn transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Log target for every record emitted on behalf of this bridge.
    pub fn log_target(mut self, log_target: &str) -> Self {
        self.log_target = log_target.to_string();
        self
    }

    /// Resolve the credential, registering if needed, and build the bridge.
    ///
    /// Returns [`Error::Registration`] when the bridge asks for its link
    /// button to be pressed. Nothing is retried here.
    pub async fn connect(self) -> Result<Bridge> {
        let config_file_path = self.config_file_path.unwrap_or_else(default_config_path);
        let transport = match self.transport {
            Some(transport) => transport,
            None => Box::new(HttpTransport::new(self.timeout)?),
        };

        let conn = Connector::new(
            self.address,
            self.username,
            CredentialStore::new(&config_file_path),
            transport,
        )
        .device_type(&self.device_type)
        .log_target(&self.log_target)
        .run()
        .await?;
        info!(target: conn.log_target(), "Connected to bridge at {}", conn.address());

        Ok(Bridge {
            conn: Arc::new(conn),
            config_file_path,
            lights_by_id: HashMap::new(),
            lights_by_name: HashMap::new(),
            lights_loaded: false,
            sensors_by_id: HashMap::new(),
            sensors_by_name: HashMap::new(),
            sensors_loaded: false,
        })
    }
}

/// A connected bridge.
///
/// Light and sensor proxies are cached on first use, indexed both by id and
/// by name; both indexes are filled together from one listing and stay as
/// they are until [`Bridge::refresh_lights`] or [`Bridge::refresh_sensors`].
/// Every attribute read on a proxy still goes to the bridge.
///
/// # Example
///
/// ```ignore
/// use hue_lights_rs::{Bridge, LightLike};
///
/// let mut bridge = Bridge::builder().address("192.168.1.10").connect().await?;
/// bridge.light("Kitchen").await?.set_on(true).await?;
/// bridge.set_light(vec![1u32, 2], ("bri", 127), None).await;
/// bridge.run_scene("Living Room", "Relax").await?;
/// ```
#[derive(Debug)]
pub struct Bridge {
    conn: Arc<Connection>,
    config_file_path: PathBuf,
    lights_by_id: HashMap<u32, Light>,
    lights_by_name: HashMap<String, u32>,
    lights_loaded: bool,
    sensors_by_id: HashMap<u32, Sensor>,
    sensors_by_name: HashMap<String, u32>,
    sensors_loaded: bool,
}

impl Bridge {
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::default()
    }

    pub fn address(&self) -> &str {
        self.conn.address()
    }

    pub fn username(&self) -> &str {
        self.conn.username()
    }

    pub fn config_file_path(&self) -> &Path {
        &self.config_file_path
    }

    pub fn log_target(&self) -> &str {
        self.conn.log_target()
    }

    /// Shared session used by every proxy of this bridge.
    pub fn connection(&self) -> Arc<Connection> {
        Arc::clone(&self.conn)
    }

    /// Send a raw request, e.g. `bridge.request(Method::Get, "/api/<user>/config", None)`.
    pub async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        self.conn.request(method, path, body).await
    }

    /// Snapshot of the recent request history.
    pub async fn history(&self) -> MessageHistory {
        self.conn.history().await
    }

    pub async fn clear_history(&self) {
        self.conn.clear_history().await
    }

    /// The bridge's own name.
    pub async fn name(&self) -> Result<String> {
        let config = self.get_config().await?;
        let name = config
            .get("name")
            .cloned()
            .ok_or_else(|| Error::attribute_not_found("name", "config"))?;
        decode(name)
    }

    pub async fn set_name(&self, name: &str) -> Result<Value> {
        let path = self.conn.api_path("/config");
        self.conn
            .request(Method::Put, &path, Some(&json!({"name": name})))
            .await
    }

    pub async fn get_config(&self) -> Result<Value> {
        let path = self.conn.api_path("/config");
        self.conn.request(Method::Get, &path, None).await
    }

    /// The full datastore: lights, groups, config, schedules and so on.
    pub async fn get_api(&self) -> Result<Value> {
        let path = self.conn.api_path("");
        self.conn.request(Method::Get, &path, None).await
    }

    async fn index(&self, kind: ResourceKind) -> Result<Vec<(u32, String)>> {
        let listing = self.conn.list(kind).await?;
        if let Some(error) = embedded_error(&listing) {
            return Err(Error::protocol(error.id, &error.description));
        }
        let Value::Object(entries) = listing else {
            return Err(Error::UnexpectedResponse(listing));
        };

        entries
            .into_iter()
            .map(|(id, entry)| {
                let id = id
                    .parse::<u32>()
                    .map_err(|_| Error::UnexpectedResponse(Value::String(id.clone())))?;
                let name = entry
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Ok((id, name))
            })
            .collect()
    }

    // Lights

    /// Full light listing keyed by id.
    pub async fn get_lights(&self) -> Result<Value> {
        self.conn.list(ResourceKind::Light).await
    }

    /// One light, or one attribute of it.
    pub async fn get_light(&self, key: impl Into<ResourceKey>, attribute: Option<&str>) -> Result<Value> {
        let id = self.require(ResourceKind::Light, key.into()).await?;
        self.conn.get_resource(ResourceKind::Light, id, attribute).await
    }

    /// Write `update` to each target light in turn.
    ///
    /// The result holds one entry per target in the given order. See
    /// [`Connection::set_resources`].
    pub async fn set_light(
        &self,
        targets: impl Into<Targets>,
        update: impl Into<Update>,
        transition_time: Option<u16>,
    ) -> Vec<Result<Value>> {
        self.conn
            .set_resources(ResourceKind::Light, targets.into(), update.into(), transition_time)
            .await
    }

    /// Id of the light named `name`, or `None` if there is none.
    pub async fn get_light_id_by_name(&self, name: &str) -> Result<Option<u32>> {
        self.conn.resource_id_by_name(ResourceKind::Light, name).await
    }

    async fn ensure_lights(&mut self) -> Result<()> {
        if self.lights_loaded {
            return Ok(());
        }
        let index = self.index(ResourceKind::Light).await?;
        debug!(target: self.conn.log_target(), "Caching {} lights", index.len());

        let mut by_id = HashMap::with_capacity(index.len());
        let mut by_name = HashMap::with_capacity(index.len());
        for (id, name) in index {
            by_id.insert(id, Light::new(Arc::clone(&self.conn), id));
            by_name.insert(name, id);
        }
        self.lights_by_id = by_id;
        self.lights_by_name = by_name;
        self.lights_loaded = true;
        Ok(())
    }

    /// Cached light proxies keyed by id.
    pub async fn light_objects(&mut self) -> Result<&HashMap<u32, Light>> {
        self.ensure_lights().await?;
        Ok(&self.lights_by_id)
    }

    /// Cached light names mapped to their ids.
    pub async fn light_names(&mut self) -> Result<&HashMap<String, u32>> {
        self.ensure_lights().await?;
        Ok(&self.lights_by_name)
    }

    /// Cached light proxies ordered by id.
    pub async fn lights(&mut self) -> Result<Vec<&mut Light>> {
        self.ensure_lights().await?;
        let mut lights: Vec<&mut Light> = self.lights_by_id.values_mut().collect();
        lights.sort_by_key(|light| light.light_id());
        Ok(lights)
    }

    /// The cached proxy for a light id or name.
    pub async fn light(&mut self, key: impl Into<ResourceKey>) -> Result<&mut Light> {
        self.ensure_lights().await?;
        let key = key.into();
        let id = match &key {
            ResourceKey::Id(id) => Some(*id),
            ResourceKey::Name(name) => self.lights_by_name.get(name).copied(),
        };
        id.and_then(|id| self.lights_by_id.get_mut(&id))
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    /// Rename a light and update the name index.
    pub async fn rename_light(&mut self, key: impl Into<ResourceKey>, name: &str) -> Result<Value> {
        let light = self.light(key).await?;
        let id = light.light_id();
        let result = light.set_name(name).await?;

        self.lights_by_name.retain(|_, cached| *cached != id);
        self.lights_by_name.insert(name.to_string(), id);
        Ok(result)
    }

    /// Drop the light caches; the next cached access lists lights again.
    pub fn refresh_lights(&mut self) {
        self.lights_by_id.clear();
        self.lights_by_name.clear();
        self.lights_loaded = false;
    }

    // Sensors

    pub async fn get_sensors(&self) -> Result<Value> {
        self.conn.list(ResourceKind::Sensor).await
    }

    /// One sensor, or one of its top-level fields.
    ///
    /// `None` when the bridge answers with an error list instead of the
    /// sensor object.
    pub async fn get_sensor(&self, key: impl Into<ResourceKey>, attribute: Option<&str>) -> Result<Option<Value>> {
        let id = self.require(ResourceKind::Sensor, key.into()).await?;
        let path = self.conn.api_path(&format!("/sensors/{id}"));
        let data = self.conn.request(Method::Get, &path, None).await?;

        if data.is_array() {
            debug!(
                target: self.conn.log_target(),
                "Unable to read sensor with ID {}: {}", id, data
            );
            return Ok(None);
        }
        match attribute {
            None => Ok(Some(data)),
            Some(attribute) => data
                .get(attribute)
                .cloned()
                .map(Some)
                .ok_or_else(|| Error::attribute_not_found(attribute, &format!("sensor {id}"))),
        }
    }

    /// Write top-level sensor fields such as `name`.
    pub async fn set_sensor(&self, sensor_id: u32, update: impl Into<Update>) -> Result<Value> {
        write_sensor(&self.conn, sensor_id, SensorSection::Root, update.into()).await
    }

    pub async fn set_sensor_state(&self, sensor_id: u32, update: impl Into<Update>) -> Result<Value> {
        write_sensor(&self.conn, sensor_id, SensorSection::State, update.into()).await
    }

    pub async fn set_sensor_config(&self, sensor_id: u32, update: impl Into<Update>) -> Result<Value> {
        write_sensor(&self.conn, sensor_id, SensorSection::Config, update.into()).await
    }

    /// Create a sensor. Returns the new id, or `None` if the bridge refused;
    /// the refusal is logged.
    pub async fn create_sensor(&mut self, sensor: &NewSensor) -> Result<Option<u32>> {
        let path = self.conn.api_path("/sensors/");
        let body = sensor.to_body()?;
        let result = self.conn.request(Method::Post, &path, Some(&body)).await?;

        let new_id = result
            .get(0)
            .and_then(|entry| entry.get("success"))
            .and_then(|success| success.get("id"))
            .and_then(Value::as_str)
            .and_then(|id| id.parse::<u32>().ok());

        match new_id {
            Some(id) => {
                debug!(target: self.conn.log_target(), "Created sensor with ID {}", id);
                if self.sensors_loaded {
                    self.sensors_by_id.insert(id, Sensor::new(Arc::clone(&self.conn), id));
                    self.sensors_by_name.insert(sensor.name.clone(), id);
                }
                Ok(Some(id))
            }
            None => {
                warn!(
                    target: self.conn.log_target(),
                    "Failed to create sensor: {}", result.get(0).unwrap_or(&result)
                );
                Ok(None)
            }
        }
    }

    /// Delete a cached sensor. Unknown ids are logged and left alone.
    pub async fn delete_sensor(&mut self, sensor_id: u32) -> Result<Option<Value>> {
        self.ensure_sensors().await?;
        if self.sensors_by_id.remove(&sensor_id).is_none() {
            debug!(
                target: self.conn.log_target(),
                "Unable to delete nonexistent sensor with ID {}", sensor_id
            );
            return Ok(None);
        }
        self.sensors_by_name.retain(|_, id| *id != sensor_id);

        let path = self.conn.api_path(&format!("/sensors/{sensor_id}"));
        self.conn.request(Method::Delete, &path, None).await.map(Some)
    }

    pub async fn get_sensor_id_by_name(&self, name: &str) -> Result<Option<u32>> {
        self.conn.resource_id_by_name(ResourceKind::Sensor, name).await
    }

    async fn ensure_sensors(&mut self) -> Result<()> {
        if self.sensors_loaded {
            return Ok(());
        }
        let index = self.index(ResourceKind::Sensor).await?;
        debug!(target: self.conn.log_target(), "Caching {} sensors", index.len());

        let mut by_id = HashMap::with_capacity(index.len());
        let mut by_name = HashMap::with_capacity(index.len());
        for (id, name) in index {
            by_id.insert(id, Sensor::new(Arc::clone(&self.conn), id));
            by_name.insert(name, id);
        }
        self.sensors_by_id = by_id;
        self.sensors_by_name = by_name;
        self.sensors_loaded = true;
        Ok(())
    }

    pub async fn sensor_objects(&mut self) -> Result<&HashMap<u32, Sensor>> {
        self.ensure_sensors().await?;
        Ok(&self.sensors_by_id)
    }

    pub async fn sensor_names(&mut self) -> Result<&HashMap<String, u32>> {
        self.ensure_sensors().await?;
        Ok(&self.sensors_by_name)
    }

    pub async fn sensor(&mut self, key: impl Into<ResourceKey>) -> Result<&mut Sensor> {
        self.ensure_sensors().await?;
        let key = key.into();
        let id = match &key {
            ResourceKey::Id(id) => Some(*id),
            ResourceKey::Name(name) => self.sensors_by_name.get(name).copied(),
        };
        id.and_then(|id| self.sensors_by_id.get_mut(&id))
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    /// Rename a sensor and update the name index.
    pub async fn rename_sensor(&mut self, key: impl Into<ResourceKey>, name: &str) -> Result<Value> {
        let sensor = self.sensor(key).await?;
        let id = sensor.sensor_id();
        let result = sensor.set_name(name).await?;

        self.sensors_by_name.retain(|_, cached| *cached != id);
        self.sensors_by_name.insert(name.to_string(), id);
        Ok(result)
    }

    pub fn refresh_sensors(&mut self) {
        self.sensors_by_id.clear();
        self.sensors_by_name.clear();
        self.sensors_loaded = false;
    }

    // Groups

    pub async fn get_groups(&self) -> Result<Value> {
        self.conn.list(ResourceKind::Group).await
    }

    /// One group, or one attribute of it.
    pub async fn get_group(&self, key: impl Into<ResourceKey>, attribute: Option<&str>) -> Result<Value> {
        let id = self.require(ResourceKind::Group, key.into()).await?;
        self.conn.get_resource(ResourceKind::Group, id, attribute).await
    }

    /// Write `update` to each target group in turn, one result per target.
    pub async fn set_group(
        &self,
        targets: impl Into<Targets>,
        update: impl Into<Update>,
        transition_time: Option<u16>,
    ) -> Vec<Result<Value>> {
        self.conn
            .set_resources(ResourceKind::Group, targets.into(), update.into(), transition_time)
            .await
    }

    pub async fn get_group_id_by_name(&self, name: &str) -> Result<Option<u32>> {
        self.conn.resource_id_by_name(ResourceKind::Group, name).await
    }

    /// Proxies for every listed group.
    pub async fn groups(&self) -> Result<Vec<Group>> {
        let mut groups: Vec<Group> = self
            .index(ResourceKind::Group)
            .await?
            .into_iter()
            .map(|(id, _)| Group::from_id(Arc::clone(&self.conn), id))
            .collect();
        groups.sort_by_key(Group::group_id);
        Ok(groups)
    }

    /// A group proxy by id or name; see [`Group::new`].
    pub async fn group(&self, key: impl Into<ResourceKey>) -> Result<Group> {
        Group::resolve(Arc::clone(&self.conn), key.into()).await
    }

    pub fn all_lights(&self) -> Group {
        Group::all_lights(self)
    }

    pub async fn create_group(&self, name: &str, light_ids: &[u32]) -> Result<Value> {
        let path = self.conn.api_path("/groups/");
        let lights: Vec<String> = light_ids.iter().map(u32::to_string).collect();
        self.conn
            .request(Method::Post, &path, Some(&json!({"lights": lights, "name": name})))
            .await
    }

    pub async fn delete_group(&self, group_id: u32) -> Result<Value> {
        let path = self.conn.api_path(&format!("/groups/{group_id}"));
        self.conn.request(Method::Delete, &path, None).await
    }

    // Scenes

    /// Raw scene listing keyed by scene id.
    pub async fn get_scenes(&self) -> Result<Value> {
        let path = self.conn.api_path("/scenes");
        self.conn.request(Method::Get, &path, None).await
    }

    pub async fn scenes(&self) -> Result<Vec<Scene>> {
        Scene::from_listing(self.get_scenes().await?)
    }

    pub async fn activate_scene(&self, group_id: u32, scene_id: &str) -> Result<Value> {
        let path = self.conn.api_path(&format!("/groups/{group_id}/action"));
        self.conn
            .request(Method::Put, &path, Some(&json!({"scene": scene_id})))
            .await
    }

    /// Activate a scene by group name and scene name.
    ///
    /// The group name must match exactly one group. If exactly one scene has
    /// the name it is activated; if several do, the first whose member lights
    /// equal the group's is. Returns whether a scene was activated; misses are
    /// logged, not raised.
    pub async fn run_scene(&self, group_name: &str, scene_name: &str) -> Result<bool> {
        let listing = self.get_groups().await?;
        let groups: Vec<(u32, &Value)> = listing
            .as_object()
            .into_iter()
            .flatten()
            .filter(|(_, entry)| entry.get("name").and_then(Value::as_str) == Some(group_name))
            .filter_map(|(id, entry)| Some((id.parse().ok()?, entry)))
            .collect();
        let [(group_id, group)] = groups.as_slice() else {
            warn!(
                target: self.conn.log_target(),
                "run_scene: expected exactly 1 group named {}, found {}", group_name, groups.len()
            );
            return Ok(false);
        };

        let scenes: Vec<Scene> = self
            .scenes()
            .await?
            .into_iter()
            .filter(|scene| scene.name() == scene_name)
            .collect();
        let scene = match scenes.as_slice() {
            [] => {
                warn!(target: self.conn.log_target(), "run_scene: No scene found {}", scene_name);
                return Ok(false);
            }
            [scene] => scene,
            _ => {
                let mut group_lights: Vec<u32> = group
                    .get("lights")
                    .cloned()
                    .map(decode::<Vec<String>>)
                    .transpose()?
                    .unwrap_or_default()
                    .iter()
                    .filter_map(|id| id.parse().ok())
                    .collect();
                group_lights.sort_unstable();

                match scenes.iter().find(|scene| scene.lights() == group_lights.as_slice()) {
                    Some(scene) => scene,
                    None => {
                        warn!(
                            target: self.conn.log_target(),
                            "run_scene: did not find a scene: {} that shared lights with group {}",
                            scene_name, group_name
                        );
                        return Ok(false);
                    }
                }
            }
        };

        self.activate_scene(*group_id, scene.scene_id()).await?;
        Ok(true)
    }

    // Schedules

    pub async fn get_schedules(&self) -> Result<Value> {
        let path = self.conn.api_path("/schedules");
        self.conn.request(Method::Get, &path, None).await
    }

    pub async fn get_schedule(&self, schedule_id: u32) -> Result<Value> {
        let path = self.conn.api_path(&format!("/schedules/{schedule_id}"));
        self.conn.request(Method::Get, &path, None).await
    }

    /// Schedule a state change for one light. `time` uses the bridge's
    /// schedule time format, e.g. `2024-06-01T07:30:00`.
    pub async fn create_schedule(
        &self,
        name: &str,
        time: &str,
        light_id: u32,
        data: Value,
        description: Option<&str>,
    ) -> Result<Value> {
        let address = self.conn.api_path(&format!("/lights/{light_id}/state"));
        self.post_schedule(name, time, &address, data, description).await
    }

    /// Schedule an action for a group of lights.
    pub async fn create_group_schedule(
        &self,
        name: &str,
        time: &str,
        group_id: u32,
        data: Value,
        description: Option<&str>,
    ) -> Result<Value> {
        let address = self.conn.api_path(&format!("/groups/{group_id}/action"));
        self.post_schedule(name, time, &address, data, description).await
    }

    async fn post_schedule(
        &self,
        name: &str,
        time: &str,
        address: &str,
        data: Value,
        description: Option<&str>,
    ) -> Result<Value> {
        let schedule = json!({
            "name": name,
            "time": time,
            "description": description.unwrap_or(" "),
            "command": {
                "method": Method::Put.to_string(),
                "address": address,
                "body": data,
            }
        });
        let path = self.conn.api_path("/schedules");
        self.conn.request(Method::Post, &path, Some(&schedule)).await
    }

    pub async fn delete_schedule(&self, schedule_id: u32) -> Result<Value> {
        let path = self.conn.api_path(&format!("/schedules/{schedule_id}"));
        self.conn.request(Method::Delete, &path, None).await
    }

    async fn require(&self, kind: ResourceKind, key: ResourceKey) -> Result<u32> {
        self.conn
            .resolve(kind, &key)
            .await?
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeTransport, lights_fixture};
    use tempfile::TempDir;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn bridge(fake: &FakeTransport) -> Bridge {
        Bridge::builder()
            .address("10.0.0.2")
            .username("user")
            .config_file_path("/nonexistent/.python_hue")
            .transport(Box::new(fake.clone()))
            .connect()
            .await
            .unwrap()
    }

    fn groups_fixture() -> Value {
        json!({
            "1": {"name": "Living Room", "lights": ["2", "1"], "action": {"on": true}},
            "2": {"name": "Bedroom", "lights": ["3"], "action": {"on": false}}
        })
    }

    fn scenes_fixture() -> Value {
        json!({
            "relax-bed": {"name": "Relax", "lights": ["3"]},
            "relax-living": {"name": "Relax", "lights": ["1", "2"]},
            "focus": {"name": "Focus", "lights": ["1", "2", "3"]}
        })
    }

    #[tokio::test]
    async fn test_supplied_credentials_skip_network() {
        let fake = FakeTransport::new();
        let bridge = bridge(&fake).await;

        assert_eq!(bridge.address(), "10.0.0.2");
        assert_eq!(bridge.username(), "user");
        assert_eq!(bridge.log_target(), "hue_lights_rs::bridge");
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_light_caches_fill_together() {
        let fake = FakeTransport::new();
        fake.route(Method::Get, "/api/user/lights/", lights_fixture());
        let mut bridge = bridge(&fake).await;

        assert_eq!(bridge.light("Kitchen").await.unwrap().light_id(), 2);
        assert_eq!(bridge.light(1u32).await.unwrap().light_id(), 1);
        assert_eq!(bridge.light_names().await.unwrap().len(), 2);
        assert_eq!(bridge.light_objects().await.unwrap().len(), 2);
        assert_eq!(fake.calls().len(), 1);

        let err = bridge.light("Porch").await.unwrap_err();
        assert_eq!(err, Error::NotFound("Porch".to_string()));
        assert!(err.to_string().contains("Porch"));

        bridge.refresh_lights();
        bridge.light(2u32).await.unwrap();
        assert_eq!(fake.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_cached_proxy_keeps_restore_state() {
        let fake = FakeTransport::new();
        fake.route(Method::Get, "/api/user/lights/", lights_fixture());
        let mut bridge = bridge(&fake).await;

        let light = bridge.light(1u32).await.unwrap();
        light.set_transition_time(Some(4));
        light.set_brightness(180).await.unwrap();
        light.set_on(false).await.unwrap();
        fake.reset_calls();

        bridge.light("Living Room Bulb").await.unwrap().set_on(true).await.unwrap();
        let puts = fake.calls_with(Method::Put);
        assert_eq!(puts.len(), 2);
        assert_eq!(puts[0].body, Some(json!({"bri": 180, "transitiontime": 4})));
    }

    #[tokio::test]
    async fn test_rename_light_updates_index() {
        let fake = FakeTransport::new();
        fake.route(Method::Get, "/api/user/lights/", lights_fixture());
        let mut bridge = bridge(&fake).await;
        bridge.light_names().await.unwrap();

        // Renamed elsewhere since the cache was filled.
        let mut renamed = lights_fixture()["2"].clone();
        renamed["name"] = json!("Scullery");
        fake.route(Method::Get, "/api/user/lights/2", renamed);

        bridge.rename_light("Kitchen", "Pantry").await.unwrap();
        let names = bridge.light_names().await.unwrap();
        assert_eq!(
            *names,
            HashMap::from([
                ("Pantry".to_string(), 2u32),
                ("Living Room Bulb".to_string(), 1u32),
            ])
        );
        assert_eq!(fake.calls_with(Method::Get).len(), 1);

        let put = &fake.calls_with(Method::Put)[0];
        assert_eq!(put.path, "/api/user/lights/2");
        assert_eq!(put.body, Some(json!({"name": "Pantry"})));
    }

    #[tokio::test]
    async fn test_rename_sensor_replaces_cached_name() {
        let fake = FakeTransport::new();
        fake.route(
            Method::Get,
            "/api/user/sensors/",
            json!({"1": {"name": "Daylight"}, "4": {"name": "Hall switch"}}),
        );
        let mut bridge = bridge(&fake).await;

        bridge.rename_sensor(4u32, "Porch switch").await.unwrap();
        let names = bridge.sensor_names().await.unwrap();
        assert_eq!(names.get("Porch switch"), Some(&4));
        assert!(!names.contains_key("Hall switch"));
        assert_eq!(names.len(), 2);
        assert_eq!(fake.calls_with(Method::Get).len(), 1);
    }

    #[tokio::test]
    async fn test_empty_listing_is_cached() {
        let fake = FakeTransport::new();
        fake.route(Method::Get, "/api/user/lights/", json!({}));
        fake.route(Method::Get, "/api/user/sensors/", json!({}));
        let mut bridge = bridge(&fake).await;

        for _ in 0..3 {
            assert!(bridge.light(1u32).await.is_err());
            assert!(bridge.sensor("Daylight").await.is_err());
        }
        assert_eq!(fake.calls().len(), 2);

        bridge.refresh_lights();
        assert!(bridge.light_objects().await.unwrap().is_empty());
        assert_eq!(fake.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_bulk_set_in_caller_order() {
        let fake = FakeTransport::new();
        fake.time_out(Method::Put, "/api/user/lights/3/state");
        let bridge = bridge(&fake).await;

        let results = bridge.set_light(vec![3u32, 1], ("on", true), None).await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        assert!(results[1].is_ok());

        let paths: Vec<String> = fake.calls().into_iter().map(|call| call.path).collect();
        assert_eq!(paths, vec!["/api/user/lights/3/state", "/api/user/lights/1/state"]);
    }

    #[tokio::test]
    async fn test_get_light_name_and_state() {
        let fake = FakeTransport::new();
        fake.route(Method::Get, "/api/user/lights/1", lights_fixture()["1"].clone());
        let bridge = bridge(&fake).await;

        assert_eq!(
            bridge.get_light(1u32, Some("name")).await.unwrap(),
            json!("Living Room Bulb")
        );
        assert_eq!(bridge.get_light(1u32, Some("bri")).await.unwrap(), json!(144));
        assert_eq!(bridge.get_light(1u32, None).await.unwrap(), lights_fixture()["1"]);
    }

    #[tokio::test]
    async fn test_light_id_by_name_sentinel() {
        let fake = FakeTransport::new();
        fake.route(Method::Get, "/api/user/lights/", lights_fixture());
        let bridge = bridge(&fake).await;

        assert_eq!(bridge.get_light_id_by_name("Kitchen").await.unwrap(), Some(2));
        assert_eq!(bridge.get_light_id_by_name("kitchen").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unreadable_sensor_is_none() {
        let fake = FakeTransport::new();
        fake.route(
            Method::Get,
            "/api/user/sensors/4",
            json!({"name": "Daylight", "config": {"on": true}}),
        );
        let bridge = bridge(&fake).await;

        assert_eq!(bridge.get_sensor(9u32, None).await.unwrap(), None);
        assert_eq!(
            bridge.get_sensor(4u32, Some("name")).await.unwrap(),
            Some(json!("Daylight"))
        );
    }

    #[tokio::test]
    async fn test_create_and_delete_sensor() {
        let fake = FakeTransport::new();
        fake.route(
            Method::Get,
            "/api/user/sensors/",
            json!({"1": {"name": "Daylight"}}),
        );
        fake.route(
            Method::Post,
            "/api/user/sensors/",
            json!([{"success": {"id": "7"}}]),
        );
        let mut bridge = bridge(&fake).await;
        bridge.sensor_objects().await.unwrap();

        let new = NewSensor::new("Flag", "PHWA01", "1.0", "CLIPGenericFlag", "flag-1", "me");
        assert_eq!(bridge.create_sensor(&new).await.unwrap(), Some(7));
        assert_eq!(bridge.sensor("Flag").await.unwrap().sensor_id(), 7);

        assert!(bridge.delete_sensor(7).await.unwrap().is_some());
        assert!(bridge.delete_sensor(7).await.unwrap().is_none());
        assert_eq!(fake.calls_with(Method::Delete).len(), 1);
        assert!(bridge.sensor("Flag").await.is_err());
    }

    #[tokio::test]
    async fn test_create_sensor_refused() {
        let fake = FakeTransport::new();
        fake.route(
            Method::Post,
            "/api/user/sensors/",
            json!([{"error": {"type": 11, "description": "too many items in list"}}]),
        );
        let mut bridge = bridge(&fake).await;

        let new = NewSensor::new("Flag", "PHWA01", "1.0", "CLIPGenericFlag", "flag-1", "me");
        assert_eq!(bridge.create_sensor(&new).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sensor_config_write() {
        let fake = FakeTransport::new();
        let bridge = bridge(&fake).await;

        bridge.set_sensor_config(4, ("on", false)).await.unwrap();
        let put = &fake.calls()[0];
        assert_eq!(put.path, "/api/user/sensors/4/config");
        assert_eq!(put.body, Some(json!({"on": false})));
    }

    #[tokio::test]
    async fn test_run_scene_single_match() {
        let fake = FakeTransport::new();
        fake.route(Method::Get, "/api/user/groups/", groups_fixture());
        fake.route(Method::Get, "/api/user/scenes", scenes_fixture());
        let bridge = bridge(&fake).await;

        assert!(bridge.run_scene("Bedroom", "Focus").await.unwrap());
        let put = &fake.calls_with(Method::Put)[0];
        assert_eq!(put.path, "/api/user/groups/2/action");
        assert_eq!(put.body, Some(json!({"scene": "focus"})));
    }

    #[tokio::test]
    async fn test_run_scene_disambiguates_by_lights() {
        let fake = FakeTransport::new();
        fake.route(Method::Get, "/api/user/groups/", groups_fixture());
        fake.route(Method::Get, "/api/user/scenes", scenes_fixture());
        let bridge = bridge(&fake).await;

        assert!(bridge.run_scene("Living Room", "Relax").await.unwrap());
        let put = &fake.calls_with(Method::Put)[0];
        assert_eq!(put.path, "/api/user/groups/1/action");
        assert_eq!(put.body, Some(json!({"scene": "relax-living"})));
    }

    #[tokio::test]
    async fn test_run_scene_misses_report_false() {
        let fake = FakeTransport::new();
        fake.route(
            Method::Get,
            "/api/user/groups/",
            json!({"1": {"name": "Hall", "lights": ["5"]}}),
        );
        fake.route(Method::Get, "/api/user/scenes", scenes_fixture());
        let bridge = bridge(&fake).await;

        assert!(!bridge.run_scene("Garage", "Relax").await.unwrap());
        assert!(!bridge.run_scene("Hall", "Party").await.unwrap());
        assert!(!bridge.run_scene("Hall", "Relax").await.unwrap());
        assert!(fake.calls_with(Method::Put).is_empty());
    }

    #[tokio::test]
    async fn test_group_schedule_command() {
        let fake = FakeTransport::new();
        let bridge = bridge(&fake).await;

        bridge
            .create_group_schedule("Wake", "2024-06-01T07:30:00", 1, json!({"on": true}), None)
            .await
            .unwrap();
        let post = &fake.calls()[0];
        assert_eq!(post.path, "/api/user/schedules");
        assert_eq!(
            post.body,
            Some(json!({
                "name": "Wake",
                "time": "2024-06-01T07:30:00",
                "description": " ",
                "command": {
                    "method": "PUT",
                    "address": "/api/user/groups/1/action",
                    "body": {"on": true}
                }
            }))
        );
    }

    #[tokio::test]
    async fn test_bridge_name_and_history() {
        let fake = FakeTransport::new();
        fake.route(Method::Get, "/api/user/config", json!({"name": "Philips hue"}));
        let bridge = bridge(&fake).await;

        assert_eq!(bridge.name().await.unwrap(), "Philips hue");
        bridge.set_name("Upstairs").await.unwrap();
        assert_eq!(bridge.history().await.summary().send_count, 2);

        bridge.clear_history().await;
        assert!(bridge.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_register_then_reconnect_from_file() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let config = dir.path().join(".python_hue");
        let address = server.address().to_string();

        Mock::given(method("POST"))
            .and(path("/api"))
            .and(body_json(json!({"devicetype": "python_hue"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"success": {"username": "newuser"}}])),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/newuser/lights/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(lights_fixture()))
            .mount(&server)
            .await;

        let mut bridge = Bridge::builder()
            .address(&address)
            .config_file_path(&config)
            .connect()
            .await
            .unwrap();
        assert_eq!(bridge.username(), "newuser");
        assert_eq!(bridge.light_objects().await.unwrap().len(), 2);
        assert_eq!(
            std::fs::read_to_string(&config).unwrap(),
            format!("{{\"{address}\":{{\"username\":\"newuser\"}}}}")
        );

        let again = Bridge::builder()
            .config_file_path(&config)
            .connect()
            .await
            .unwrap();
        assert_eq!(again.address(), address);
        assert_eq!(again.username(), "newuser");
    }

    #[tokio::test]
    async fn test_link_button_error_reaches_caller() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        Mock::given(method("POST"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"error": {"type": 101, "address": "", "description": "link button not pressed"}}
            ])))
            .mount(&server)
            .await;

        let err = Bridge::builder()
            .address(&server.address().to_string())
            .config_file_path(dir.path().join(".python_hue"))
            .connect()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Registration { id: 101, .. }));
        assert!(!dir.path().join(".python_hue").exists());
    }
}
