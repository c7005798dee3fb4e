//! Groups of lights tracked on the bridge.

use std::sync::Arc;

use log::debug;
use serde_json::Value;

use crate::connection::{Connection, find_id_by_name};
use crate::errors::Error;
use crate::light::{BrightnessRestore, Light, LightLike, decode, single};
use crate::resource::{ResourceKey, ResourceKind, Update};

type Result<T> = std::result::Result<T, Error>;

/// A group of lights, addressed as one on the bridge.
///
/// A group supports the same light-state surface as a single [`Light`]
/// through [`LightLike`]; writes go to the group's `action` object and fan
/// out to every member on the bridge side. Unlike a light, a group also has a
/// member set.
///
/// # Example
///
/// ```ignore
/// use hue_lights_rs::{Bridge, Group, LightLike};
///
/// let bridge = Bridge::builder().connect().await?;
/// let mut kitchen = Group::new(&bridge, "Kitchen").await?; // fails if no such group
/// kitchen.set_hue(50_000).await?;
/// kitchen.set_on(false).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Group {
    conn: Arc<Connection>,
    group_id: u32,
    transition_time: Option<u16>,
    restore: BrightnessRestore,
}

impl Group {
    /// Group 0 always contains every light known to the bridge. It is not
    /// part of the group listing but can be addressed explicitly.
    pub const ALL_LIGHTS: u32 = 0;

    /// Build a proxy for a group given by id or by name.
    ///
    /// Names are matched exactly against the group listing. Unlike the
    /// `*_id_by_name` lookups, a miss here is an error:
    /// [`Error::GroupNotFound`].
    pub async fn new(bridge: &crate::Bridge, key: impl Into<ResourceKey>) -> Result<Self> {
        Self::resolve(bridge.connection(), key.into()).await
    }

    pub(crate) async fn resolve(conn: Arc<Connection>, key: ResourceKey) -> Result<Self> {
        let group_id = match key {
            ResourceKey::Id(id) => id,
            ResourceKey::Name(name) => {
                let listing = conn.list(ResourceKind::Group).await?;
                find_id_by_name(&listing, &name).ok_or(Error::GroupNotFound(name))?
            }
        };
        Ok(Self::from_id(conn, group_id))
    }

    pub(crate) fn from_id(conn: Arc<Connection>, group_id: u32) -> Self {
        Group {
            conn,
            group_id,
            transition_time: None,
            restore: BrightnessRestore::default(),
        }
    }

    /// Proxy for the implicit group of all lights.
    pub fn all_lights(bridge: &crate::Bridge) -> Self {
        Self::from_id(bridge.connection(), Self::ALL_LIGHTS)
    }

    pub fn group_id(&self) -> u32 {
        self.group_id
    }

    pub fn set_transition_time(&mut self, transition_time: Option<u16>) {
        self.transition_time = transition_time;
    }

    /// Full group object as reported by the bridge.
    pub async fn state(&self) -> Result<Value> {
        self.conn
            .get_resource(ResourceKind::Group, self.group_id, None)
            .await
    }

    pub async fn set_name(&mut self, name: &str) -> Result<Value> {
        debug!(
            target: self.conn.log_target(),
            "Renaming light group {} to '{}'", self.group_id, name
        );
        self.write(Update::attribute("name", name)).await
    }

    /// Ids of the member lights, sorted.
    pub async fn light_ids(&self) -> Result<Vec<u32>> {
        let ids: Vec<String> = decode(self.read("lights").await?)?;
        let mut ids = ids
            .iter()
            .map(|id| {
                id.parse()
                    .map_err(|_| Error::UnexpectedResponse(Value::String(id.clone())))
            })
            .collect::<Result<Vec<u32>>>()?;
        ids.sort_unstable();
        Ok(ids)
    }

    /// Proxies for the member lights.
    pub async fn lights(&self) -> Result<Vec<Light>> {
        Ok(self
            .light_ids()
            .await?
            .into_iter()
            .map(|id| Light::new(Arc::clone(&self.conn), id))
            .collect())
    }

    /// Replace the member set.
    pub async fn set_lights(&mut self, light_ids: &[u32]) -> Result<Value> {
        debug!(
            target: self.conn.log_target(),
            "Setting lights in group {} to {:?}", self.group_id, light_ids
        );
        self.write(Update::attribute("lights", light_ids.to_vec())).await
    }
}

impl LightLike for Group {
    fn connection(&self) -> &Connection {
        &self.conn
    }

    async fn read(&self, attribute: &str) -> Result<Value> {
        self.conn
            .get_resource(ResourceKind::Group, self.group_id, Some(attribute))
            .await
    }

    async fn write(&mut self, update: Update) -> Result<Value> {
        let results = self
            .conn
            .set_resources(ResourceKind::Group, self.group_id.into(), update, self.transition_time)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTransport;
    use crate::transport::Method;
    use serde_json::json;

    fn connection(fake: &FakeTransport) -> Arc<Connection> {
        Arc::new(Connection::new(
            "10.0.0.2".to_string(),
            "user".to_string(),
            Box::new(fake.clone()),
            "hue_lights_rs::test".to_string(),
        ))
    }

    fn groups_fixture() -> Value {
        json!({
            "1": {"name": "Kitchen", "lights": ["3", "1"], "type": "Room",
                  "action": {"on": true, "bri": 120, "hue": 8000}},
            "2": {"name": "Upstairs", "lights": ["2"], "type": "LightGroup",
                  "action": {"on": false, "bri": 1}}
        })
    }

    #[tokio::test]
    async fn test_resolve_by_name() {
        let fake = FakeTransport::new();
        fake.route(Method::Get, "/api/user/groups/", groups_fixture());

        let group = Group::resolve(connection(&fake), "Upstairs".into()).await.unwrap();
        assert_eq!(group.group_id(), 2);
    }

    #[tokio::test]
    async fn test_unknown_name_is_fatal() {
        let fake = FakeTransport::new();
        fake.route(Method::Get, "/api/user/groups/", groups_fixture());

        let err = Group::resolve(connection(&fake), "Garage".into()).await.unwrap_err();
        assert_eq!(err, Error::GroupNotFound("Garage".to_string()));
    }

    #[tokio::test]
    async fn test_reads_action_and_members() {
        let fake = FakeTransport::new();
        fake.route(Method::Get, "/api/user/groups/1", groups_fixture()["1"].clone());
        let mut group = Group::from_id(connection(&fake), 1);

        assert_eq!(group.name().await.unwrap(), "Kitchen");
        assert_eq!(group.brightness().await.unwrap(), 120);
        assert_eq!(group.light_ids().await.unwrap(), vec![1, 3]);
        let lights = group.lights().await.unwrap();
        assert_eq!(lights[1].light_id(), 3);
    }

    #[tokio::test]
    async fn test_writes_go_to_action() {
        let fake = FakeTransport::new();
        let mut group = Group::from_id(connection(&fake), 1);
        group.set_transition_time(Some(3));
        group.set_hue(50_000).await.unwrap();
        group.set_lights(&[4, 5]).await.unwrap();

        let calls = fake.calls();
        assert_eq!(calls[0].path, "/api/user/groups/1/action");
        assert_eq!(calls[0].body, Some(json!({"hue": 50000, "transitiontime": 3})));
        assert_eq!(calls[1].path, "/api/user/groups/1");
        assert_eq!(calls[1].body, Some(json!({"lights": ["4", "5"], "transitiontime": 3})));
    }

    #[tokio::test]
    async fn test_group_restores_brightness() {
        let fake = FakeTransport::new();
        let mut group = Group::from_id(connection(&fake), Group::ALL_LIGHTS);
        group.set_transition_time(Some(10));
        group.set_brightness(90).await.unwrap();
        group.set_on(false).await.unwrap();
        fake.reset_calls();

        group.set_on(true).await.unwrap();
        let puts = fake.calls_with(Method::Put);
        assert_eq!(puts[0].path, "/api/user/groups/0/action");
        assert_eq!(puts[0].body, Some(json!({"bri": 90, "transitiontime": 10})));
    }
}
