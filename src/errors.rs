use std::path::PathBuf;

use serde_json::Value;

use crate::transport::Method;

/// All error types that can occur when talking to a Hue bridge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to serialize data to JSON.
    #[error("failed to dump json: {0:?}")]
    JsonDump(serde_json::Error),

    /// Failed to deserialize JSON data.
    #[error("failed to load json: {0:?}")]
    JsonLoad(serde_json::Error),

    /// The HTTP exchange with the bridge failed before a response was read.
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A single request exceeded the transport timeout.
    #[error("{method} request to {url} timed out")]
    RequestTimeout { method: Method, url: String },

    /// The link button was not pressed before registering.
    #[error("registration failed ({id}): {message}")]
    Registration { id: u64, message: String },

    /// Any other error reported by the bridge.
    #[error("bridge error {id}: {message}")]
    Protocol { id: u64, message: String },

    /// The bridge answered with a payload of an unexpected shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(Value),

    /// The requested attribute is not part of the resource's state.
    #[error("not a valid key, parameter {parameter} is not associated with {resource}")]
    AttributeNotFound { parameter: String, resource: String },

    /// A light or sensor lookup by id or name found nothing.
    #[error("not a valid key (integer id or name): {0}")]
    NotFound(String),

    /// No group carries the given name.
    #[error("could not find a group named {0:?}")]
    GroupNotFound(String),

    /// Registration was needed but no bridge address is known.
    #[error("no bridge address supplied and none stored")]
    MissingAddress,

    /// The connector failed earlier or has not finished connecting.
    #[error("not connected to a bridge")]
    NotConnected,

    /// Registration succeeded but the credential could not be read back.
    #[error("no credential available in {0} after registration")]
    CredentialsUnavailable(PathBuf),

    /// Writing the credential file failed.
    #[error("failed to write credentials to {path}: {err:?}")]
    CredentialWrite { path: PathBuf, err: std::io::Error },

    /// The remote API returned a non-success status.
    #[error("remote api returned HTTP {status}: {body}")]
    Remote { status: u16, body: String },

    /// Both remote tokens have expired; a new authorization is required.
    #[error("remote access and refresh tokens have expired")]
    TokenExpired,

    /// Reading or writing the remote token file failed.
    #[error("token store {path} error: {err:?}")]
    TokenStore { path: PathBuf, err: std::io::Error },
}

impl Error {
    /// Create a new registration error for a link button that was not pressed
    pub fn link_button_not_pressed() -> Self {
        Error::Registration {
            id: 101,
            message: "The link button has not been pressed in the last 30 seconds.".to_string(),
        }
    }

    /// Create a new protocol error
    pub fn protocol(id: u64, message: &str) -> Self {
        Error::Protocol {
            id,
            message: message.to_string(),
        }
    }

    /// Create a new attribute not found error
    pub fn attribute_not_found(parameter: &str, resource: &str) -> Self {
        Error::AttributeNotFound {
            parameter: parameter.to_string(),
            resource: resource.to_string(),
        }
    }

    /// Create a new request timeout error
    pub fn timeout(method: Method, url: &str) -> Self {
        Error::RequestTimeout {
            method,
            url: url.to_string(),
        }
    }

    /// The device error id carried by registration and protocol errors.
    pub fn id(&self) -> Option<u64> {
        match self {
            Error::Registration { id, .. } | Error::Protocol { id, .. } => Some(*id),
            _ => None,
        }
    }
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
