use super::telemetry::{Telemetry, USER_AGENT};
use super::ClientContext;
use crate::models::{Endpoints, MediaKind, DEFAULT_TIMEOUT};
use crate::session::{Credential, Session, SessionManager};
use crate::{Error, Result};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// One outbound request, prepared once and replayed on retry.
#[derive(Debug, Clone)]
pub(crate) struct Call {
    method: Method,
    url: String,
    body: Option<String>,
}

impl Call {
    pub(crate) fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            body: None,
        }
    }

    pub(crate) fn post(url: impl Into<String>, body: String) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            body: Some(body),
        }
    }
}

/// Shared HTTP engine for the FX backends: session refresh, deadline,
/// bounded retry and telemetry.
pub struct FxHttpClient {
    client: Client,
    credential: Credential,
    endpoints: Endpoints,
    timeout: Duration,
}

impl FxHttpClient {
    pub fn new(cookie: impl Into<String>) -> Result<Self> {
        let credential = Credential::new(cookie)?;
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::from_parts(credential, client))
    }

    /// Construct on top of an existing connection pool.
    pub fn new_with_client(cookie: impl Into<String>, client: Client) -> Result<Self> {
        Ok(Self::from_parts(Credential::new(cookie)?, client))
    }

    fn from_parts(credential: Credential, client: Client) -> Self {
        Self {
            client,
            credential,
            endpoints: Endpoints::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Override the per-request deadline (60 seconds by default).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Derive fresh authorization state for one logical call.
    pub async fn refresh_session(&self, kind: MediaKind) -> Result<Session> {
        SessionManager::new(
            self.client.clone(),
            self.credential.clone(),
            self.endpoints.session.clone(),
            self.timeout,
        )
        .refresh(kind)
        .await
    }

    fn telemetry(&self) -> Telemetry {
        Telemetry::new(
            self.client.clone(),
            self.endpoints.telemetry.clone(),
            self.timeout,
        )
    }

    /// Run one generation: refresh the session, post `body` with retries,
    /// parse the response, then report the outcome on a detached task.
    ///
    /// Session failures return before anything is reported.
    pub(crate) async fn generate<Resp: DeserializeOwned>(
        &self,
        kind: MediaKind,
        url: &str,
        context: &ClientContext,
        body: String,
        max_retries: u32,
    ) -> Result<Resp> {
        let session = self.refresh_session(kind).await?;

        let call = Call::post(url, body);
        let outcome = self
            .send_with_retry(&call, session.headers(), max_retries)
            .await
            .and_then(|text| parse_json(&text));

        self.telemetry().report(
            context.tool(),
            context.session_id().to_string(),
            session.headers().clone(),
            outcome.is_ok(),
        );

        outcome
    }

    /// Refresh the session and issue a single call without telemetry.
    pub(crate) async fn request<Resp: DeserializeOwned>(
        &self,
        kind: MediaKind,
        call: Call,
    ) -> Result<Resp> {
        let session = self.refresh_session(kind).await?;
        let text = self.send_with_retry(&call, session.headers(), 0).await?;
        parse_json(&text)
    }

    /// Attempt `call` until it succeeds, fails terminally, or the retry
    /// budget runs out. Only server errors and plain transport failures are
    /// retried; 401, 429 and deadline expiry end the loop immediately.
    pub(crate) async fn send_with_retry(
        &self,
        call: &Call,
        headers: &HeaderMap,
        max_retries: u32,
    ) -> Result<String> {
        let mut remaining = max_retries;

        loop {
            match self.attempt(call, headers).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() && remaining > 0 => {
                    remaining -= 1;
                    tracing::warn!(
                        "Request to {} failed: {}. Retrying ({} retries left)",
                        call.url,
                        e,
                        remaining
                    );
                }
                Err(e) => {
                    tracing::error!("Request to {} failed: {}", call.url, e);
                    return Err(e);
                }
            }
        }
    }

    async fn attempt(&self, call: &Call, headers: &HeaderMap) -> Result<String> {
        tracing::debug!("{} {}", call.method, call.url);

        let mut request = self
            .client
            .request(call.method.clone(), &call.url)
            .timeout(self.timeout)
            .headers(headers.clone());
        if let Some(body) = &call.body {
            request = request.body(body.clone());
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::from_transport(e, self.timeout))?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse().ok());
            return Err(Error::RateLimited { retry_after });
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized(
                "Unauthorized. Please check your cookie.".to_string(),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::from_transport(e, self.timeout))?;

        if !status.is_success() {
            return Err(Error::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

pub(crate) fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!("Failed to parse FX response: {}\nBody: {}", e, body);
        Error::MalformedResponse(format!("Failed to parse response: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::test_support;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_PATH: &str = "/v1:test";

    #[derive(Debug, serde::Deserialize)]
    struct Echo {
        ok: bool,
    }

    async fn make_client(server: &MockServer) -> FxHttpClient {
        test_support::mount_session(server).await;
        FxHttpClient::new("sid=abc")
            .unwrap()
            .with_endpoints(test_support::endpoints(server))
            .with_timeout(Duration::from_millis(500))
    }

    async fn send(client: &FxHttpClient, server: &MockServer, retries: u32) -> Result<String> {
        let session = client.refresh_session(MediaKind::Music).await.unwrap();
        let call = Call::post(format!("{}{}", server.uri(), TEST_PATH), "{}".to_string());
        client.send_with_retry(&call, session.headers(), retries).await
    }

    #[test]
    fn test_blank_cookie_fails_construction() {
        assert!(matches!(FxHttpClient::new("  "), Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_server_error_is_attempted_retries_plus_one_times() {
        for retries in [0u32, 1, 3] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path(TEST_PATH))
                .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
                .expect(u64::from(retries) + 1)
                .mount(&server)
                .await;

            let client = make_client(&server).await;
            let err = send(&client, &server, retries).await.unwrap_err();

            match err {
                Error::ServerError { status, body } => {
                    assert_eq!(status, 500);
                    assert_eq!(body, "boom");
                }
                other => panic!("expected ServerError, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_after_transient_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TEST_PATH))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(TEST_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"ok\":true}"))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server).await;
        let body = send(&client, &server, 2).await.unwrap();
        let echo: Echo = parse_json(&body).unwrap();
        assert!(echo.ok);
    }

    #[tokio::test]
    async fn test_rate_limit_is_never_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TEST_PATH))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server).await;
        let err = send(&client, &server, 5).await.unwrap_err();
        assert!(matches!(
            err,
            Error::RateLimited {
                retry_after: Some(7)
            }
        ));
    }

    #[tokio::test]
    async fn test_unauthorized_is_never_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TEST_PATH))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server).await;
        let err = send(&client, &server, 5).await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_deadline_is_timeout_and_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TEST_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{\"ok\":true}")
                    .set_delay(Duration::from_secs(3)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server).await;
        let err = send(&client, &server, 3).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test]
    async fn test_connection_failure_is_network_failure() {
        let server = MockServer::start().await;
        let client = make_client(&server).await;
        let session = client.refresh_session(MediaKind::Image).await.unwrap();

        let call = Call::post("http://127.0.0.1:1/v1:test", "{}".to_string());
        let err = client
            .send_with_retry(&call, session.headers(), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NetworkFailure(_)));
    }

    #[tokio::test]
    async fn test_retries_replay_identical_body_and_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TEST_PATH))
            .and(body_string("{\"nonce\":\";42\"}"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let client = make_client(&server).await;
        let session = client.refresh_session(MediaKind::Image).await.unwrap();
        let call = Call::post(
            format!("{}{}", server.uri(), TEST_PATH),
            "{\"nonce\":\";42\"}".to_string(),
        );
        let err = client
            .send_with_retry(&call, session.headers(), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ServerError { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_get_call_sends_no_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TEST_PATH))
            .and(body_string(""))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"ok\":false}"))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server).await;
        let echo: Echo = client
            .request(MediaKind::Image, Call::get(format!("{}{}", server.uri(), TEST_PATH)))
            .await
            .unwrap();
        assert!(!echo.ok);
    }

    #[test]
    fn test_parse_json_failure_is_malformed() {
        let err = parse_json::<Echo>("not json").unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }
}
