//! Access to a bridge through the vendor cloud.
//!
//! [`RemoteTransport`] plugs into [`crate::BridgeBuilder::transport`] in place
//! of the local HTTP transport. Local paths `/api/<rest>` are sent to
//! `<base>/bridge/<rest>` with a bearer token. Tokens come in an
//! access/refresh pair with their own expiry times; the access token is
//! refreshed on demand and the new pair is written back to the token store.
//!
//! Obtaining the first token pair (the interactive authorization step) is not
//! handled here.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::errors::Error;
use crate::transport::{HttpTransport, Method, Transport};

type Result<T> = std::result::Result<T, Error>;

/// Base URL of the vendor cloud API.
pub const REMOTE_API_URL: &str = "https://api.meethue.com";

/// Access and refresh tokens with their expiry times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

impl TokenPair {
    pub fn access_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.access_expires_at
    }

    pub fn refresh_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.refresh_expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(alias = "access_token_expires_in")]
    expires_in: i64,
    refresh_token: String,
    #[serde(default = "default_refresh_lifetime")]
    refresh_token_expires_in: i64,
}

// Refresh tokens are issued for 100 days when the response does not say.
fn default_refresh_lifetime() -> i64 {
    100 * 24 * 60 * 60
}

impl TokenResponse {
    fn into_pair(self, now: DateTime<Utc>) -> TokenPair {
        TokenPair {
            access_token: self.access_token,
            access_expires_at: now + chrono::Duration::seconds(self.expires_in),
            refresh_token: self.refresh_token,
            refresh_expires_at: now + chrono::Duration::seconds(self.refresh_token_expires_in),
        }
    }
}

/// JSON file holding a [`TokenPair`].
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TokenStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<TokenPair> {
        let contents = fs::read_to_string(&self.path).map_err(|err| Error::TokenStore {
            path: self.path.clone(),
            err,
        })?;
        serde_json::from_str(&contents).map_err(Error::JsonLoad)
    }

    pub fn save(&self, tokens: &TokenPair) -> Result<()> {
        let contents = serde_json::to_string_pretty(tokens).map_err(Error::JsonDump)?;
        info!("Writing remote tokens to {}", self.path.display());
        fs::write(&self.path, contents).map_err(|err| Error::TokenStore {
            path: self.path.clone(),
            err,
        })
    }
}

/// Transport that reaches the bridge through the vendor cloud.
#[derive(Debug)]
pub struct RemoteTransport {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    tokens: Mutex<TokenPair>,
    store: Option<TokenStore>,
    timeout: Duration,
}

impl RemoteTransport {
    pub fn new(client_id: &str, client_secret: &str, tokens: TokenPair) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("hue-lights-rs/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(RemoteTransport {
            client,
            base_url: REMOTE_API_URL.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            tokens: Mutex::new(tokens),
            store: None,
            timeout: HttpTransport::DEFAULT_TIMEOUT,
        })
    }

    /// Load the token pair from `store` and persist refreshed tokens there.
    pub fn from_store(client_id: &str, client_secret: &str, store: TokenStore) -> Result<Self> {
        let tokens = store.load()?;
        Ok(Self::new(client_id, client_secret, tokens)?.with_store(store))
    }

    pub fn with_store(mut self, store: TokenStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The current token pair.
    pub async fn tokens(&self) -> TokenPair {
        self.tokens.lock().await.clone()
    }

    /// A usable access token, refreshing it first when it has expired.
    async fn access_token(&self) -> Result<String> {
        let mut tokens = self.tokens.lock().await;
        let now = Utc::now();
        if tokens.access_valid_at(now) {
            return Ok(tokens.access_token.clone());
        }
        if !tokens.refresh_valid_at(now) {
            error!("Remote access and refresh tokens have expired");
            return Err(Error::TokenExpired);
        }

        info!("Remote access token expired, refreshing");
        let refreshed = self.refresh(&tokens.refresh_token).await?;
        if let Some(store) = &self.store {
            store.save(&refreshed)?;
        }
        *tokens = refreshed;
        Ok(tokens.access_token.clone())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let url = format!("{}/v2/oauth2/token", self.base_url);
        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(Error::Remote {
                status: status.as_u16(),
                body: text,
            });
        }
        let token: TokenResponse = serde_json::from_str(&text).map_err(Error::JsonLoad)?;
        Ok(token.into_pair(Utc::now()))
    }

    fn url(&self, path: &str) -> String {
        match path.strip_prefix("/api") {
            Some(rest) => format!("{}/bridge{}", self.base_url, rest),
            None => format!("{}{}", self.base_url, path),
        }
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let token = self.access_token().await?;
        let url = self.url(path);
        debug!("{} {} {:?}", method, url, body);

        let mut request = self
            .client
            .request(method.as_reqwest(), &url)
            .bearer_auth(token)
            .timeout(self.timeout);
        if method.has_body() {
            request = request.json(body.unwrap_or(&Value::Null));
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                error!("{} request to {} timed out", method, url);
                return Err(Error::timeout(method, &url));
            }
            Err(e) => return Err(e.into()),
        };
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(Error::Remote {
                status: status.as_u16(),
                body: text,
            });
        }
        serde_json::from_str(&text).map_err(Error::JsonLoad)
    }
}

impl Transport for RemoteTransport {
    fn request<'a>(
        &'a self,
        _address: &'a str,
        method: Method,
        path: &'a str,
        body: Option<&'a Value>,
    ) -> BoxFuture<'a, Result<Value>> {
        Box::pin(self.send(method, path, body))
    }
}
