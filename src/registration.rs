//! Pairing with a bridge and resolving the credential used for every request.
//!
//! Connecting walks a small state machine:
//!
//! ```text
//! Uninitialized -> AwaitingCredentials -> Connected
//!                          |
//!                          v
//!                  AwaitingLinkPress -> Uninitialized (once) | Failed
//! ```
//!
//! Registration is attempted at most once per connect. A missing link-button
//! press surfaces as [`Error::Registration`]; waiting for the operator and
//! trying again is up to the caller.

use log::{debug, info};
use serde_json::{Value, json};

use crate::connection::Connection;
use crate::credentials::{CredentialStore, LoadOutcome};
use crate::errors::Error;
use crate::transport::{Method, Transport};

type Result<T> = std::result::Result<T, Error>;

/// Identifier sent to the bridge when registering.
pub const DEFAULT_DEVICE_TYPE: &str = "python_hue";

/// Where a [`Connector`] is in the pairing handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectState {
    /// Address and/or username are unknown.
    Uninitialized,
    /// Looking the credential up in the credential store.
    AwaitingCredentials,
    /// Next step sends a registration request to the bridge.
    AwaitingLinkPress,
    Connected,
    /// Terminal; the step that led here returned the error.
    Failed,
}

/// Drives the pairing handshake one transition at a time.
pub struct Connector {
    state: ConnectState,
    address: Option<String>,
    username: Option<String>,
    store: CredentialStore,
    transport: Box<dyn Transport>,
    device_type: String,
    log_target: String,
    registered: bool,
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("state", &self.state)
            .field("address", &self.address)
            .field("username", &self.username)
            .field("store", &self.store)
            .field("registered", &self.registered)
            .finish_non_exhaustive()
    }
}

impl Connector {
    pub fn new(
        address: Option<String>,
        username: Option<String>,
        store: CredentialStore,
        transport: Box<dyn Transport>,
    ) -> Self {
        Connector {
            state: ConnectState::Uninitialized,
            address,
            username,
            store,
            transport,
            device_type: DEFAULT_DEVICE_TYPE.to_string(),
            log_target: module_path!().to_string(),
            registered: false,
        }
    }

    pub fn device_type(mut self, device_type: &str) -> Self {
        self.device_type = device_type.to_string();
        self
    }

    /// Send connection and credential-file records to `log_target`.
    pub fn log_target(mut self, log_target: &str) -> Self {
        self.log_target = log_target.to_string();
        self.store = self.store.with_log_target(log_target);
        self
    }

    pub fn state(&self) -> ConnectState {
        self.state
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Perform exactly one transition and return the new state.
    ///
    /// An error moves the connector to [`ConnectState::Failed`]. Stepping a
    /// connected or failed connector does nothing.
    pub async fn step(&mut self) -> Result<ConnectState> {
        let next = match self.state {
            ConnectState::Uninitialized => Ok(self.check_supplied()),
            ConnectState::AwaitingCredentials => self.load_credentials(),
            ConnectState::AwaitingLinkPress => self.register().await,
            state @ (ConnectState::Connected | ConnectState::Failed) => Ok(state),
        };
        match next {
            Ok(state) => {
                self.state = state;
                Ok(state)
            }
            Err(e) => {
                self.state = ConnectState::Failed;
                Err(e)
            }
        }
    }

    /// Step until connected and hand over the resulting connection.
    pub async fn run(mut self) -> Result<Connection> {
        info!(target: self.log_target.as_str(), "Attempting to connect to the bridge...");
        loop {
            match self.step().await? {
                ConnectState::Connected => return self.into_connection(),
                ConnectState::Failed => return Err(Error::NotConnected),
                _ => {}
            }
        }
    }

    /// The connection for a connector that reached [`ConnectState::Connected`].
    pub fn into_connection(self) -> Result<Connection> {
        match (self.state, self.address, self.username) {
            (ConnectState::Connected, Some(address), Some(username)) => {
                Ok(Connection::new(address, username, self.transport, self.log_target))
            }
            _ => Err(Error::NotConnected),
        }
    }

    fn check_supplied(&self) -> ConnectState {
        match (&self.address, &self.username) {
            (Some(address), Some(username)) => {
                info!(target: self.log_target.as_str(), "Using ip: {}", address);
                info!(target: self.log_target.as_str(), "Using username: {}", username);
                ConnectState::Connected
            }
            _ => ConnectState::AwaitingCredentials,
        }
    }

    fn load_credentials(&mut self) -> Result<ConnectState> {
        match self.store.load(self.address.as_deref()) {
            LoadOutcome::Found(stored) => {
                if self.address.is_none() {
                    info!(target: self.log_target.as_str(), "Using ip from config: {}", stored.address);
                    self.address = Some(stored.address);
                }
                if self.username.is_none() {
                    info!(
                        target: self.log_target.as_str(),
                        "Using username from config: {}", stored.username
                    );
                    self.username = Some(stored.username);
                }
                Ok(ConnectState::Connected)
            }
            LoadOutcome::NotFound if self.registered => {
                Err(Error::CredentialsUnavailable(self.store.path().to_path_buf()))
            }
            LoadOutcome::NotFound => {
                info!(
                    target: self.log_target.as_str(),
                    "Error opening config file, will attempt bridge registration"
                );
                Ok(ConnectState::AwaitingLinkPress)
            }
        }
    }

    async fn register(&mut self) -> Result<ConnectState> {
        let address = self.address.clone().ok_or(Error::MissingAddress)?;
        let body = json!({"devicetype": self.device_type});
        debug!(target: self.log_target.as_str(), "POST /api {}", body);

        let response = self
            .transport
            .request(&address, Method::Post, "/api", Some(&body))
            .await?;
        debug!(target: self.log_target.as_str(), "{}", response);

        let username = parse_registration(&response)?;
        self.store.save(&address, &username)?;
        self.registered = true;
        info!(target: self.log_target.as_str(), "Reconnecting to the bridge");
        Ok(ConnectState::Uninitialized)
    }
}

/// Extract the issued username from a registration response.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use hue_lights_rs::{Error, registration::parse_registration};
///
/// let ok = json!([{"success": {"username": "83b7780291a6ceffbe0bd049104df"}}]);
/// assert_eq!(parse_registration(&ok).unwrap(), "83b7780291a6ceffbe0bd049104df");
///
/// let pending = json!([{"error": {"type": 101, "address": "", "description": "link button not pressed"}}]);
/// assert!(matches!(parse_registration(&pending), Err(Error::Registration { id: 101, .. })));
/// ```
pub fn parse_registration(response: &Value) -> Result<String> {
    let entries = response.as_array().into_iter().flatten();
    for entry in entries {
        if let Some(username) = entry
            .get("success")
            .and_then(|success| success.get("username"))
            .and_then(Value::as_str)
        {
            return Ok(username.to_string());
        }
        if let Some(error) = entry.get("error") {
            let id = error.get("type").and_then(Value::as_u64).unwrap_or_default();
            return Err(match id {
                101 => Error::link_button_not_pressed(),
                7 => Error::protocol(7, "Unknown username"),
                _ => Error::protocol(
                    id,
                    error
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or_default(),
                ),
            });
        }
    }
    Err(Error::UnexpectedResponse(response.clone()))
}
