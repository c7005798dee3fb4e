//! Scenes stored on the bridge.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SceneEntry {
    name: String,
    lights: Vec<String>,
    owner: String,
    locked: bool,
    recycle: bool,
    version: u32,
    lastupdated: Option<String>,
    picture: String,
    appdata: Map<String, Value>,
}

/// An immutable snapshot of one scene from the scene listing.
///
/// The member lights are kept as a sorted list of ids so that two scenes,
/// or a scene and a group, can be compared by membership.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    scene_id: String,
    name: String,
    lights: Vec<u32>,
    owner: String,
    locked: bool,
    recycle: bool,
    version: u32,
    last_updated: Option<String>,
    picture: String,
    app_data: Map<String, Value>,
}

impl Scene {
    /// Build a scene from one `(id, object)` entry of the scene listing.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::json;
    /// use hue_lights_rs::Scene;
    ///
    /// let scene = Scene::from_entry("ab12", json!({"name": "Relax", "lights": ["3", "1"]})).unwrap();
    /// assert_eq!(scene.name(), "Relax");
    /// assert_eq!(scene.lights(), &[1, 3]);
    /// ```
    pub fn from_entry(scene_id: &str, entry: Value) -> Result<Self> {
        let entry: SceneEntry = serde_json::from_value(entry).map_err(Error::JsonLoad)?;
        let mut lights = entry
            .lights
            .iter()
            .map(|id| {
                id.parse()
                    .map_err(|_| Error::UnexpectedResponse(Value::String(id.clone())))
            })
            .collect::<Result<Vec<u32>>>()?;
        lights.sort_unstable();

        Ok(Scene {
            scene_id: scene_id.to_string(),
            name: entry.name,
            lights,
            owner: entry.owner,
            locked: entry.locked,
            recycle: entry.recycle,
            version: entry.version,
            last_updated: entry.lastupdated,
            picture: entry.picture,
            app_data: entry.appdata,
        })
    }

    /// Parse a whole scene listing keyed by scene id.
    pub(crate) fn from_listing(listing: Value) -> Result<Vec<Self>> {
        let Value::Object(entries) = listing else {
            return Err(Error::UnexpectedResponse(listing));
        };
        entries
            .into_iter()
            .map(|(id, entry)| Scene::from_entry(&id, entry))
            .collect()
    }

    pub fn scene_id(&self) -> &str {
        &self.scene_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member light ids in ascending order.
    pub fn lights(&self) -> &[u32] {
        &self.lights
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn locked(&self) -> bool {
        self.locked
    }

    pub fn recycle(&self) -> bool {
        self.recycle
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn last_updated(&self) -> Option<&str> {
        self.last_updated.as_deref()
    }

    pub fn picture(&self) -> &str {
        &self.picture
    }

    pub fn app_data(&self) -> &Map<String, Value> {
        &self.app_data
    }
}
