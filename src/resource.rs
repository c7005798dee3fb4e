//! Addressing and update types shared by every resource proxy.

use std::fmt;

use serde_json::{Map, Value};
use strum_macros::{AsRefStr, Display};

/// The kinds of bridge resources that can be read and written through a proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ResourceKind {
    Light,
    Group,
    Sensor,
}

impl ResourceKind {
    /// Collection segment of the resource path, e.g. `lights`.
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceKind::Light => "lights",
            ResourceKind::Group => "groups",
            ResourceKind::Sensor => "sensors",
        }
    }

    /// Nested sub-object that holds the writable current state.
    pub fn nested(&self) -> &'static str {
        match self {
            ResourceKind::Light | ResourceKind::Sensor => "state",
            ResourceKind::Group => "action",
        }
    }
}

/// Where an attribute lives in a resource's JSON object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Top-level structural field, written with a PUT to the resource root.
    Root,
    /// Field of the nested state (or action) object.
    Nested,
}

const LIGHT_ROOT_FIELDS: &[&str] = &[
    "name",
    "type",
    "modelid",
    "uniqueid",
    "manufacturername",
    "productid",
    "swversion",
    "luminaireuniqueid",
    "capabilities",
];

const GROUP_ROOT_FIELDS: &[&str] = &["name", "lights", "type", "class", "state"];

/// Locate `attribute` for a resource kind.
///
/// # Examples
///
/// ```
/// use hue_lights_rs::{Field, ResourceKind, field_location};
///
/// assert_eq!(field_location(ResourceKind::Light, "name"), Field::Root);
/// assert_eq!(field_location(ResourceKind::Light, "bri"), Field::Nested);
/// assert_eq!(field_location(ResourceKind::Group, "lights"), Field::Root);
/// assert_eq!(field_location(ResourceKind::Sensor, "state"), Field::Root);
/// ```
pub fn field_location(kind: ResourceKind, attribute: &str) -> Field {
    let root = match kind {
        ResourceKind::Light => LIGHT_ROOT_FIELDS.contains(&attribute),
        ResourceKind::Group => GROUP_ROOT_FIELDS.contains(&attribute),
        ResourceKind::Sensor => true,
    };
    if root { Field::Root } else { Field::Nested }
}

/// Identifies a resource either by numeric id or by its exact name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    Id(u32),
    Name(String),
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKey::Id(id) => write!(f, "{id}"),
            ResourceKey::Name(name) => write!(f, "{name}"),
        }
    }
}

impl From<u32> for ResourceKey {
    fn from(id: u32) -> Self {
        ResourceKey::Id(id)
    }
}

impl From<&str> for ResourceKey {
    fn from(name: &str) -> Self {
        ResourceKey::Name(name.to_string())
    }
}

impl From<String> for ResourceKey {
    fn from(name: String) -> Self {
        ResourceKey::Name(name)
    }
}

/// One or more resources addressed by a bulk write, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Targets(Vec<ResourceKey>);

impl Targets {
    pub fn keys(&self) -> &[ResourceKey] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for Targets {
    type Item = ResourceKey;
    type IntoIter = std::vec::IntoIter<ResourceKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<ResourceKey> for Targets {
    fn from(key: ResourceKey) -> Self {
        Targets(vec![key])
    }
}

impl From<u32> for Targets {
    fn from(id: u32) -> Self {
        Targets(vec![ResourceKey::Id(id)])
    }
}

impl From<&str> for Targets {
    fn from(name: &str) -> Self {
        Targets(vec![ResourceKey::from(name)])
    }
}

impl<K: Into<ResourceKey>> From<Vec<K>> for Targets {
    fn from(keys: Vec<K>) -> Self {
        Targets(keys.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<ResourceKey> + Clone> From<&[K]> for Targets {
    fn from(keys: &[K]) -> Self {
        Targets(keys.iter().cloned().map(Into::into).collect())
    }
}

/// The change carried by a write: one attribute, or a whole attribute map.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Attribute(String, Value),
    Map(Map<String, Value>),
}

impl Update {
    pub fn attribute(name: &str, value: impl Into<Value>) -> Self {
        Update::Attribute(name.to_string(), value.into())
    }

    /// The attribute name for single-attribute updates.
    pub fn parameter(&self) -> Option<&str> {
        match self {
            Update::Attribute(name, _) => Some(name),
            Update::Map(_) => None,
        }
    }

    /// The JSON body for this update.
    pub fn into_body(self) -> Map<String, Value> {
        match self {
            Update::Attribute(name, value) => Map::from_iter([(name, value)]),
            Update::Map(map) => map,
        }
    }
}

impl<V: Into<Value>> From<(&str, V)> for Update {
    fn from((name, value): (&str, V)) -> Self {
        Update::attribute(name, value)
    }
}

impl From<Map<String, Value>> for Update {
    fn from(map: Map<String, Value>) -> Self {
        Update::Map(map)
    }
}

/// A device-reported error found inside a command response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub id: u64,
    pub address: Option<String>,
    pub description: String,
}

/// Extract the first embedded `{"error": {...}}` entry of a command response.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use hue_lights_rs::embedded_error;
///
/// let ok = json!([{"success": {"/lights/1/state/on": true}}]);
/// assert!(embedded_error(&ok).is_none());
///
/// let failed = json!([{"error": {"type": 201, "description": "device is off"}}]);
/// assert_eq!(embedded_error(&failed).unwrap().id, 201);
/// ```
pub fn embedded_error(response: &Value) -> Option<ApiError> {
    let entries = response.as_array()?;
    entries.iter().find_map(|entry| {
        let error = entry.get("error")?;
        Some(ApiError {
            id: error.get("type").and_then(Value::as_u64).unwrap_or_default(),
            address: error
                .get("address")
                .and_then(Value::as_str)
                .map(String::from),
            description: error
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    })
}
