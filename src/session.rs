//! Credential and session handling
//!
//! The caller's cookie is the only credential. Before each logical call it is
//! exchanged for a short-lived access token, and the resulting [`Session`]
//! produces the headers every outbound request carries.

use crate::models::MediaKind;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, COOKIE, ORIGIN, REFERER};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

const ORIGIN_VALUE: &str = "https://labs.google";

/// Opaque cookie string that authenticates against the backend.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(cookie: impl Into<String>) -> Result<Self> {
        let cookie = cookie.into();
        if cookie.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Cookie is required and cannot be empty".to_string(),
            ));
        }
        Ok(Self(cookie))
    }

    fn header_value(&self) -> Result<HeaderValue> {
        HeaderValue::from_str(self.0.trim()).map_err(|_| {
            Error::Unauthorized("Cookie contains characters not allowed in a header".to_string())
        })
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Headers shared by every request of one media kind. Never mutated; each
/// call derives its own copy.
pub fn header_template(kind: MediaKind) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ORIGIN, HeaderValue::from_static(ORIGIN_VALUE));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(REFERER, HeaderValue::from_static(kind.referer()));
    headers
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires: Option<DateTime<Utc>>,
    #[serde(default)]
    user: Option<SessionUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionUser {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Authorization state derived from the credential for one call.
#[derive(Debug, Clone)]
pub struct Session {
    headers: HeaderMap,
    expires: Option<DateTime<Utc>>,
    user: Option<SessionUser>,
}

impl Session {
    /// Header set to attach to generation and telemetry requests.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }
}

/// Exchanges the credential for a fresh [`Session`]. Holds no session state
/// of its own, so concurrent refreshes never race.
#[derive(Debug, Clone)]
pub struct SessionManager {
    client: Client,
    credential: Credential,
    session_url: String,
    timeout: Duration,
}

impl SessionManager {
    pub fn new(client: Client, credential: Credential, session_url: String, timeout: Duration) -> Self {
        Self {
            client,
            credential,
            session_url,
            timeout,
        }
    }

    /// Perform the session handshake. Never retried here.
    pub async fn refresh(&self, kind: MediaKind) -> Result<Session> {
        let mut headers = header_template(kind);
        headers.insert(COOKIE, self.credential.header_value()?);

        tracing::debug!("Refreshing session for {}", kind.tool());

        let response = self
            .client
            .get(&self.session_url)
            .timeout(self.timeout)
            .headers(headers.clone())
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to reach session endpoint: {}", e);
                Error::from_transport(e, self.timeout)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Session refresh rejected (status {}): {}", status, error_text);
            return Err(Error::Unauthorized(format!(
                "Session refresh failed (status {}): {}",
                status.as_u16(),
                error_text
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::from_transport(e, self.timeout))?;
        let parsed: SessionResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse session response: {}\nBody: {}", e, body);
            Error::MalformedResponse(format!("Failed to parse session response: {}", e))
        })?;

        let token = parsed
            .access_token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                Error::Unauthorized("Session response has no access token. Please check your cookie.".to_string())
            })?;

        if let Some(expires) = parsed.expires {
            if expires <= Utc::now() {
                return Err(Error::Unauthorized(format!(
                    "Session expired at {}. Please refresh your cookie.",
                    expires.to_rfc3339()
                )));
            }
        }

        let bearer = HeaderValue::from_str(&format!("Bearer {}", token.trim())).map_err(|_| {
            Error::MalformedResponse("Access token is not a valid header value".to_string())
        })?;
        headers.insert(AUTHORIZATION, bearer);

        Ok(Session {
            headers,
            expires: parsed.expires,
            user: parsed.user,
        })
    }
}
