//! Session and transport for the OptionsHouse API.
//!
//! A [`Session`] owns the auth token, the HTTP connection, and the request
//! throttle. Every call goes through [`Session::api`], which logs in when no
//! token is held, signs a copy of the envelope, posts it, and classifies the
//! response. A rejected token triggers exactly one re-login and retry.

use crate::error::Error;
use crate::throttle::{DEFAULT_MIN_INTERVAL, Throttle};
use crate::types::{AUTH_TOKEN_KEY, Action, ApiPath, Envelope, Message};
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use serde_json::{Map, Value};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

#[cfg(test)]
mod tests;

/// Production API host.
pub const DEFAULT_REMOTE_HOST: &str = "https://api.optionshouse.com";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Session configuration.
#[derive(Clone)]
pub struct ClientConfig {
    /// Login name.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Token from an earlier login, used until the server rejects it.
    pub auth_token: Option<String>,
    /// Base URL of the API.
    pub remote_host: String,
    /// Return server-reported errors as [`Error::Api`]. When false they stay
    /// embedded in the returned envelope. Auth failures always surface.
    pub raise_errors: bool,
    /// Skip the spacing between requests.
    pub fast_api: bool,
    /// Spacing between requests when `fast_api` is off.
    pub min_request_interval: Duration,
    /// Request timeout.
    pub timeout: Duration,
    /// Disable TLS certificate verification.
    pub accept_invalid_certs: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            auth_token: None,
            remote_host: DEFAULT_REMOTE_HOST.to_string(),
            raise_errors: true,
            fast_api: false,
            min_request_interval: DEFAULT_MIN_INTERVAL,
            timeout: Duration::from_secs(30),
            accept_invalid_certs: false,
        }
    }
}

impl ClientConfig {
    /// Configuration for the production host with the given credentials.
    #[must_use]
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            ..Default::default()
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("remote_host", &self.remote_host)
            .field("raise_errors", &self.raise_errors)
            .field("fast_api", &self.fast_api)
            .field("min_request_interval", &self.min_request_interval)
            .field("timeout", &self.timeout)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

/// Authenticated connection to the OptionsHouse API.
///
/// All calls take `&mut self`; a session serves one caller at a time.
pub struct Session {
    config: ClientConfig,
    base_url: String,
    token: Option<String>,
    client: Option<Client>,
    throttle: Throttle,
}

impl Session {
    /// Creates a session. No request is sent until the first call.
    ///
    /// # Errors
    /// Returns error if `remote_host` is not a valid URL.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        Url::parse(&config.remote_host)?;

        Ok(Self {
            base_url: config.remote_host.trim_end_matches('/').to_string(),
            token: config.auth_token.clone().filter(|t| !t.is_empty()),
            client: None,
            throttle: Throttle::new(config.min_request_interval),
            config,
        })
    }

    /// Creates a session for the production host.
    ///
    /// # Errors
    /// Returns error if the session cannot be created.
    pub fn with_credentials(username: &str, password: &str) -> Result<Self, Error> {
        Self::new(ClientConfig::new(username, password))
    }

    /// Session configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Currently held auth token.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// True when a token is held. The token may still be expired server-side.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// True when a connection handle is held.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// When the last request was issued.
    #[must_use]
    pub fn last_request_at(&self) -> Option<Instant> {
        self.throttle.last_sent()
    }

    /// Drops the held token without contacting the server.
    pub fn forget_token(&mut self) {
        self.token = None;
    }

    /// Full URL for an API path.
    #[must_use]
    pub fn endpoint(&self, path: ApiPath) -> String {
        format!("{}{}", self.base_url, path.as_str())
    }

    // ========================================================================
    // Connection
    // ========================================================================

    /// Opens a fresh connection, dropping any previous one.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built. The session is left
    /// disconnected.
    pub fn connect(&mut self) -> Result<(), Error> {
        self.disconnect();

        if self.config.accept_invalid_certs {
            warn!("TLS certificate verification is disabled");
        }

        let client = Client::builder()
            .timeout(self.config.timeout)
            .pool_max_idle_per_host(1)
            .danger_accept_invalid_certs(self.config.accept_invalid_certs)
            .build()
            .inspect_err(|e| error!("Failed to connect to {}: {}", self.base_url, e))?;

        info!("Connected to {}", self.base_url);
        self.client = Some(client);
        Ok(())
    }

    /// Closes the connection if one is open. Never fails.
    pub fn disconnect(&mut self) {
        if self.client.take().is_some() {
            debug!("Disconnected from {}", self.base_url);
        }
    }

    fn connection(&mut self) -> Result<Client, Error> {
        if self.client.is_none() {
            self.connect()?;
        }
        self.client.clone().ok_or(Error::ConnectionClosed)
    }

    // ========================================================================
    // Protocol
    // ========================================================================

    /// Returns a copy of `envelope` with the current token in every message.
    ///
    /// # Errors
    /// Returns error if the envelope is malformed or no token is held.
    pub fn sign(&self, envelope: &Envelope) -> Result<Envelope, Error> {
        envelope.validate()?;
        let token = self.token.as_deref().ok_or(Error::MissingToken)?;

        let mut signed = envelope.clone();
        for message in signed.messages_mut() {
            if message.data.is_null() {
                message.data = Value::Object(Map::new());
            }
            let data = message.data.as_object_mut().ok_or_else(|| {
                Error::InvalidEnvelope(format!("{} data is not an object", message.action))
            })?;
            data.insert(AUTH_TOKEN_KEY.to_string(), Value::String(token.to_string()));
        }
        Ok(signed)
    }

    /// Parses a response body and classifies the errors it carries.
    ///
    /// An error entry with an `access` key means the token was rejected: the
    /// token is dropped and [`Error::Auth`] returned. Other errors become
    /// [`Error::Api`] when `raise_errors` is set.
    ///
    /// # Errors
    /// Returns error if the body is not a valid envelope or carries errors
    /// as described above.
    pub fn analyze(&mut self, body: &str) -> Result<Envelope, Error> {
        let envelope = Envelope::parse(body)?;
        let errors: Vec<Value> = envelope.errors().into_iter().cloned().collect();

        if errors.iter().any(|e| e.get("access").is_some()) {
            warn!("Auth token rejected by server");
            self.token = None;
            return Err(Error::Auth { errors });
        }

        if !errors.is_empty() {
            if self.config.raise_errors {
                return Err(Error::Api { errors });
            }
            debug!("Returning response with {} embedded errors", errors.len());
        }

        Ok(envelope)
    }

    /// Logs in and stores the returned token.
    ///
    /// # Errors
    /// Returns error if the login fails or the response has no token.
    #[instrument(skip(self))]
    pub async fn authenticate(&mut self) -> Result<(), Error> {
        self.token = None;

        let mut data = Map::new();
        data.insert("userName".to_string(), Value::String(self.config.username.clone()));
        data.insert("password".to_string(), Value::String(self.config.password.clone()));
        let envelope = Envelope::single(Message::new(Action::AuthLogin, data));

        let response = self.send(ApiPath::General, &envelope).await?;
        let token = response
            .data()
            .and_then(|data| data.get(AUTH_TOKEN_KEY))
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or(Error::MissingToken)?;

        self.token = Some(token.to_string());
        info!("Authenticated as {}", self.config.username);
        Ok(())
    }

    /// Sends an envelope, logging in first when needed.
    ///
    /// If the server rejects the token, the session logs in again and
    /// retries once. A second rejection is returned to the caller.
    ///
    /// # Errors
    /// Returns error if the envelope is malformed, the request fails, or the
    /// server reports errors.
    #[instrument(skip(self, envelope))]
    pub async fn api(&mut self, path: ApiPath, envelope: &Envelope) -> Result<Envelope, Error> {
        envelope.validate()?;

        if !self.is_authenticated() {
            self.authenticate().await?;
        }

        match self.send_signed(path, envelope).await {
            Err(err) if err.is_auth() => {
                warn!("Retrying after re-authentication: {}", err);
                self.authenticate().await?;
                self.send_signed(path, envelope).await
            }
            result => result,
        }
    }

    async fn send_signed(
        &mut self,
        path: ApiPath,
        envelope: &Envelope,
    ) -> Result<Envelope, Error> {
        let signed = self.sign(envelope)?;
        self.send(path, &signed).await
    }

    // ========================================================================
    // Transport
    // ========================================================================

    async fn send(&mut self, path: ApiPath, envelope: &Envelope) -> Result<Envelope, Error> {
        let payload = serde_json::to_string(envelope)?;
        let body = serde_urlencoded::to_string(&[("r", payload.as_str())])?;
        let actions: Vec<&str> = envelope.messages().iter().map(|m| m.action.as_str()).collect();
        debug!("POST {} {:?}", path, actions);

        let text = self.post(path, body).await?;
        self.analyze(&text)
    }

    async fn post(&mut self, path: ApiPath, body: String) -> Result<String, Error> {
        if !self.config.fast_api {
            self.throttle.wait().await;
        }

        let url = self.endpoint(path);
        let outcome = self.dispatch(&url, body).await;
        self.throttle.mark_sent();
        let response = outcome.inspect_err(|e| error!("Request to {} failed: {}", url, e))?;

        let status = response.status();
        let headers = render_headers(response.headers());
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(is_json_content_type);
        let text = response.text().await?;

        if status.as_u16() != 200 || !is_json {
            error!("Unexpected response from {} ({})", url, status);
            return Err(Error::UnexpectedResponse {
                status: status.as_u16(),
                headers,
                body: text,
            });
        }

        debug!("Response from {}: {} bytes", url, text.len());
        Ok(text)
    }

    async fn dispatch(&mut self, url: &str, body: String) -> Result<reqwest::Response, Error> {
        let client = self.connection()?;
        let result = client
            .post(url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await;

        match result {
            Ok(response) => Ok(response),
            Err(e) => {
                if e.is_connect() {
                    self.disconnect();
                }
                Err(e.into())
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.is_authenticated())
            .field("connected", &self.is_connected())
            .field("throttle", &self.throttle)
            .finish()
    }
}

fn is_json_content_type(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("json")
}

fn render_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value.to_str().unwrap_or("<binary>")))
        .collect::<Vec<_>>()
        .join("\n")
}
