//! Authenticated bridge session shared by the facade and every proxy.

use log::{debug, warn};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::errors::Error;
use crate::history::{MessageHistory, MessageType};
use crate::resource::{Field, ResourceKey, ResourceKind, Targets, Update, embedded_error, field_location};
use crate::transport::{Method, Transport};

type Result<T> = std::result::Result<T, Error>;

/// A resolved bridge address and username together with the transport used
/// to reach it.
///
/// Proxies hold this behind an `Arc`; it carries no cached resource state.
pub struct Connection {
    address: String,
    username: String,
    transport: Box<dyn Transport>,
    history: Mutex<MessageHistory>,
    log_target: String,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("log_target", &self.log_target)
            .finish_non_exhaustive()
    }
}

impl Connection {
    pub(crate) fn new(
        address: String,
        username: String,
        transport: Box<dyn Transport>,
        log_target: String,
    ) -> Self {
        Connection {
            address,
            username,
            transport,
            history: Mutex::new(MessageHistory::new()),
            log_target,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn log_target(&self) -> &str {
        &self.log_target
    }

    pub async fn history(&self) -> MessageHistory {
        self.history.lock().await.clone()
    }

    pub async fn clear_history(&self) {
        self.history.lock().await.clear();
    }

    /// `/api/<username>` followed by `suffix`.
    pub fn api_path(&self, suffix: &str) -> String {
        format!("/api/{}{}", self.username, suffix)
    }

    /// Issue one request and record it in the history.
    pub async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let line = format!("{method} {path}");
        debug!(target: self.log_target.as_str(), "{} {:?}", line, body);
        self.history
            .lock()
            .await
            .record(MessageType::Send, &line, body.unwrap_or(&Value::Null));

        match self.transport.request(&self.address, method, path, body).await {
            Ok(response) => {
                self.history
                    .lock()
                    .await
                    .record(MessageType::Receive, &line, &response);
                Ok(response)
            }
            Err(e) => {
                self.history.lock().await.record_error(&e.to_string());
                Err(e)
            }
        }
    }

    /// Full listing of a resource collection.
    pub async fn list(&self, kind: ResourceKind) -> Result<Value> {
        let path = self.api_path(&format!("/{}/", kind.collection()));
        self.request(Method::Get, &path, None).await
    }

    /// Resolve a resource name to its id by scanning the full listing.
    ///
    /// Matching is exact and case-sensitive. A miss is `Ok(None)`, not an error.
    pub async fn resource_id_by_name(&self, kind: ResourceKind, name: &str) -> Result<Option<u32>> {
        let listing = self.list(kind).await?;
        Ok(find_id_by_name(&listing, name))
    }

    /// Resolve a key to an id; names go through [`Self::resource_id_by_name`].
    pub async fn resolve(&self, kind: ResourceKind, key: &ResourceKey) -> Result<Option<u32>> {
        match key {
            ResourceKey::Id(id) => Ok(Some(*id)),
            ResourceKey::Name(name) => self.resource_id_by_name(kind, name).await,
        }
    }

    /// Read one resource, optionally narrowed to a single attribute.
    ///
    /// Structural attributes come from the top level of the resource object,
    /// everything else from its nested state (or action) object. A missing
    /// attribute is [`Error::AttributeNotFound`].
    pub async fn get_resource(&self, kind: ResourceKind, id: u32, attribute: Option<&str>) -> Result<Value> {
        let path = self.api_path(&format!("/{}/{}", kind.collection(), id));
        let state = self.request(Method::Get, &path, None).await?;

        let Some(attribute) = attribute else {
            return Ok(state);
        };

        let value = match field_location(kind, attribute) {
            Field::Root => state.get(attribute),
            Field::Nested => state.get(kind.nested()).and_then(|nested| nested.get(attribute)),
        };
        value
            .cloned()
            .ok_or_else(|| Error::attribute_not_found(attribute, &format!("{kind} {id}")))
    }

    /// Write `update` to each target in turn.
    ///
    /// One request is made per target, in the given order. A failure for one
    /// target never stops the others: transport failures and unresolvable
    /// names land in that target's slot, and device errors embedded in a
    /// response are logged and returned as-is.
    pub async fn set_resources(
        &self,
        kind: ResourceKind,
        targets: Targets,
        update: Update,
        transition_time: Option<u16>,
    ) -> Vec<Result<Value>> {
        let root = update
            .parameter()
            .is_some_and(|parameter| field_location(kind, parameter) == Field::Root && parameter != "state");

        let mut body = update.into_body();
        if kind == ResourceKind::Group {
            if let Some(lights) = body.get_mut("lights") {
                *lights = light_id_strings(lights);
            }
        }
        if let Some(transition_time) = transition_time {
            body.insert("transitiontime".to_string(), Value::from(transition_time));
        }
        let body = Value::Object(body);

        let mut results = Vec::with_capacity(targets.len());
        for key in targets {
            debug!(target: self.log_target.as_str(), "{}", body);
            let result = self.set_one(kind, &key, root, &body).await;
            match &result {
                Ok(response) => {
                    if let Some(error) = embedded_error(response) {
                        warn!(
                            target: self.log_target.as_str(),
                            "ERROR: {} for {} {}", error.description, kind, key
                        );
                    }
                }
                Err(e) => warn!(target: self.log_target.as_str(), "{} {} failed: {}", kind, key, e),
            }
            results.push(result);
        }

        debug!(target: self.log_target.as_str(), "{:?}", results);
        results
    }

    async fn set_one(&self, kind: ResourceKind, key: &ResourceKey, root: bool, body: &Value) -> Result<Value> {
        let id = self
            .resolve(kind, key)
            .await?
            .ok_or_else(|| Error::NotFound(key.to_string()))?;

        let path = if root {
            self.api_path(&format!("/{}/{}", kind.collection(), id))
        } else {
            self.api_path(&format!("/{}/{}/{}", kind.collection(), id, kind.nested()))
        };
        self.request(Method::Put, &path, Some(body)).await
    }
}

/// Find the id of the entry named `name` in an id-keyed listing.
pub(crate) fn find_id_by_name(listing: &Value, name: &str) -> Option<u32> {
    listing.as_object()?.iter().find_map(|(id, entry)| {
        if entry.get("name").and_then(Value::as_str) == Some(name) {
            id.parse().ok()
        } else {
            None
        }
    })
}

/// Group membership is sent as a list of string ids.
fn light_id_strings(lights: &Value) -> Value {
    let as_string = |v: &Value| match v {
        Value::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    };
    match lights {
        Value::Array(items) => Value::Array(items.iter().map(as_string).collect()),
        single => Value::Array(vec![as_string(single)]),
    }
}
