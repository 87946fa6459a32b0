//! Authenticated gateway session
//!
//! The gateway exposes a local HTTPS JSON API behind a self-signed
//! certificate. A session logs in once with the customer password and then
//! attaches the returned token as `AuthCookie` on every subsequent request.
//! Metric fetches never fail the caller: a bad response becomes
//! [`FetchOutcome::NoData`] and the next scheduled tick simply tries again.

use crate::config::GatewayConfig;
use crate::error::{GridlogError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use reqwest::header::{ACCEPT, COOKIE};
use serde_json::{Value, json};
use std::fmt;
use std::time::Duration;

pub const LOGIN_PATH: &str = "/api/login/Basic";
pub const GRID_STATUS_PATH: &str = "/api/system_status/grid_status";
pub const SOE_PATH: &str = "/api/system_status/soe";
pub const AGGREGATES_PATH: &str = "/api/meters/aggregates";

/// Cookie name the gateway expects the session token under
pub const AUTH_COOKIE: &str = "AuthCookie";

const LOGIN_USERNAME: &str = "customer";
const LOGIN_EMAIL: &str = "nobody@example.com";

/// Why a fetch produced no usable document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoDataReason {
    /// Connection, TLS or timeout failure
    Transport(String),
    /// Non-2xx HTTP status
    Status(u16),
    /// 2xx response with nothing in it
    EmptyBody,
    /// Body was not valid JSON
    InvalidJson(String),
}

impl fmt::Display for NoDataReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {}", e),
            Self::Status(code) => write!(f, "HTTP status {}", code),
            Self::EmptyBody => write!(f, "empty response body"),
            Self::InvalidJson(e) => write!(f, "invalid JSON: {}", e),
        }
    }
}

/// Result of a single metric fetch
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Data(Value),
    NoData(NoDataReason),
}

impl FetchOutcome {
    /// Parsed document, if any
    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Data(v) => Some(v),
            Self::NoData(_) => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData(_))
    }
}

/// Classify a raw HTTP response into a fetch outcome
pub fn interpret_response(status: u16, body: &str) -> FetchOutcome {
    if !(200..300).contains(&status) {
        return FetchOutcome::NoData(NoDataReason::Status(status));
    }
    if body.trim().is_empty() {
        return FetchOutcome::NoData(NoDataReason::EmptyBody);
    }
    match serde_json::from_str::<Value>(body) {
        Ok(value) => FetchOutcome::Data(value),
        Err(e) => FetchOutcome::NoData(NoDataReason::InvalidJson(e.to_string())),
    }
}

/// JSON body posted to the login endpoint
pub fn login_body(password: &str) -> Value {
    json!({
        "username": LOGIN_USERNAME,
        "password": password,
        "email": LOGIN_EMAIL,
        "force_sm_off": false,
    })
}

/// Something that can answer metric fetches for the sampler
#[async_trait::async_trait]
pub trait DeviceApi: Send + Sync {
    /// GET `path`, or POST `body` to it when one is given
    async fn fetch_json(&self, path: &str, body: Option<&Value>) -> FetchOutcome;
}

/// Authenticated connection to one gateway
pub struct SessionClient {
    http: reqwest::Client,
    base_url: String,
    hostname: String,
    auth_token: Option<String>,
    logger: StructuredLogger,
}

impl SessionClient {
    /// Log in to `https://<hostname>` and return a ready session
    pub async fn login(config: &GatewayConfig) -> Result<Self> {
        let base_url = format!("https://{}", config.hostname.trim());
        Self::login_with_base_url(&base_url, config).await
    }

    /// Log in against an explicit base URL such as `http://127.0.0.1:8443`
    pub async fn login_with_base_url(base_url: &str, config: &GatewayConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let hostname = config.hostname.trim().to_string();
        let logger = get_logger_with_context(LogContext::new("session").with_hostname(&hostname));

        let mut client = Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            hostname,
            auth_token: None,
            logger,
        };
        let token = match client.request_token(&config.password).await {
            Ok(token) => token,
            Err(e) => {
                client.logger.error(&format!("Login failed: {}", e));
                return Err(e);
            }
        };
        client.auth_token = Some(token);
        client.logger.info("Logged in to gateway");
        Ok(client)
    }

    async fn request_token(&self, password: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, LOGIN_PATH);
        self.logger.debug(&format!("POST {}", url));

        let resp = self
            .http
            .post(&url)
            .header(ACCEPT, "application/json")
            .json(&login_body(password))
            .send()
            .await
            .map_err(|e| GridlogError::auth(format!("Login request to {} failed: {}", url, e)))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| GridlogError::auth(format!("Failed to read login response: {}", e)))?;

        if !status.is_success() {
            return Err(GridlogError::auth(format!(
                "Login rejected with HTTP status {}",
                status.as_u16()
            )));
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| GridlogError::auth(format!("Login response is not JSON: {}", e)))?;

        value
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or_else(|| GridlogError::auth("Login response did not contain a token"))
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn has_token(&self) -> bool {
        self.auth_token.is_some()
    }

    async fn send(
        &self,
        path: &str,
        body: Option<&Value>,
    ) -> std::result::Result<(u16, String), reqwest::Error> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = match body {
            Some(b) => self.http.post(&url).json(b),
            None => self.http.get(&url),
        };
        request = request.header(ACCEPT, "application/json");
        if let Some(token) = &self.auth_token {
            request = request.header(COOKIE, format!("{}={}", AUTH_COOKIE, token));
        }

        let resp = request.send().await?;
        let status = resp.status().as_u16();
        let text = resp.text().await?;
        Ok((status, text))
    }
}

#[async_trait::async_trait]
impl DeviceApi for SessionClient {
    async fn fetch_json(&self, path: &str, body: Option<&Value>) -> FetchOutcome {
        let method = if body.is_some() { "POST" } else { "GET" };
        self.logger.debug(&format!("{} {}", method, path));

        let outcome = match self.send(path, body).await {
            Ok((status, text)) => {
                self.logger
                    .debug(&format!("{} -> {} {}", path, status, text.trim_end()));
                interpret_response(status, &text)
            }
            Err(e) => FetchOutcome::NoData(NoDataReason::Transport(e.to_string())),
        };

        if let FetchOutcome::NoData(reason) = &outcome {
            self.logger
                .error(&format!("No data from {}: {}", path, reason));
        }
        outcome
    }
}
