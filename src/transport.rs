//! HTTP request/response plumbing.
//!
//! The [`Transport`] trait is the seam between the bridge facade and the
//! network. [`HttpTransport`] talks JSON-over-HTTP to a bridge on the local
//! network; [`crate::RemoteTransport`] talks to the vendor cloud instead.

use std::time::Duration;

use futures::future::BoxFuture;
use log::{debug, error};
use serde_json::Value;
use strum_macros::{AsRefStr, Display};

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// HTTP method of a bridge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

impl Method {
    /// Whether requests with this method carry a JSON body.
    pub fn has_body(&self) -> bool {
        matches!(self, Method::Put | Method::Post)
    }

    pub(crate) fn as_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Put => reqwest::Method::PUT,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A single request/response exchange with a bridge.
///
/// Implementations issue exactly one HTTP operation per call and return the
/// parsed JSON body as-is. No schema validation happens at this layer.
pub trait Transport: Send + Sync {
    /// Send `method path` to the bridge at `address`.
    ///
    /// `body` is only serialized for PUT and POST; GET and DELETE never
    /// carry a payload.
    fn request<'a>(
        &'a self,
        address: &'a str,
        method: Method,
        path: &'a str,
        body: Option<&'a Value>,
    ) -> BoxFuture<'a, Result<Value>>;
}

/// Plain HTTP transport for a bridge on the local network.
///
/// Each call opens its own connection; idle connections are never kept.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .user_agent(format!("hue-lights-rs/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(HttpTransport { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn send(
        &self,
        address: &str,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = format!("http://{address}{path}");
        debug!("{} {} {:?}", method, url, body);

        let mut request = self.client.request(method.as_reqwest(), &url);
        if method.has_body() {
            let payload = serde_json::to_string(body.unwrap_or(&Value::Null))
                .map_err(Error::JsonDump)?;
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(payload);
        }

        let exchange = async {
            let response = request.send().await?;
            let text = response.text().await?;
            serde_json::from_str::<Value>(&text).map_err(Error::JsonLoad)
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(Error::Transport(e))) if e.is_timeout() => {
                error!("{} request to {} timed out", method, url);
                Err(Error::timeout(method, &url))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                error!("{} request to {} timed out", method, url);
                Err(Error::timeout(method, &url))
            }
        }
    }
}

impl Transport for HttpTransport {
    fn request<'a>(
        &'a self,
        address: &'a str,
        method: Method,
        path: &'a str,
        body: Option<&'a Value>,
    ) -> BoxFuture<'a, Result<Value>> {
        Box::pin(self.send(address, method, path, body))
    }
}
