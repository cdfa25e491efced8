//! Best-effort usage reporting.
//!
//! The backend expects a batch log after every generation. Reports run on a
//! detached task; their failures are logged and dropped.

use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

const EVENT_NAME: &str = "IM_FEELING_LUCKY";

#[derive(Debug, Clone)]
pub struct Telemetry {
    client: Client,
    url: String,
    timeout: Duration,
}

impl Telemetry {
    pub fn new(client: Client, url: String, timeout: Duration) -> Self {
        Self {
            client,
            url,
            timeout,
        }
    }

    /// Fire the report on its own task. The handle is only useful to tests;
    /// generation never awaits it.
    pub fn report(
        &self,
        tool: &'static str,
        session_id: String,
        headers: HeaderMap,
        success: bool,
    ) -> JoinHandle<()> {
        let telemetry = self.clone();
        tokio::spawn(async move {
            if let Err(e) = telemetry.submit(tool, &session_id, headers, success).await {
                tracing::warn!("Failed to submit batch log: {}", e);
            }
        })
    }

    /// Send one batch log. Only transport failures are errors; the response
    /// status is not inspected.
    pub async fn submit(
        &self,
        tool: &str,
        session_id: &str,
        headers: HeaderMap,
        success: bool,
    ) -> Result<()> {
        let body = batch_log(tool, session_id, success, Utc::now());

        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .headers(headers)
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| Error::from_transport(e, self.timeout))?;

        tracing::debug!("Batch log submitted (status {})", response.status());
        Ok(())
    }
}

/// Event batch in the shape the logging endpoint accepts.
pub fn batch_log(tool: &str, session_id: &str, success: bool, event_time: DateTime<Utc>) -> Value {
    json!({
        "json": {
            "appEvents": [{
                "event": EVENT_NAME,
                "eventProperties": [
                    { "key": "TOOL_NAME", "stringValue": tool },
                    { "key": "USER_AGENT", "stringValue": USER_AGENT },
                    { "key": "IS_DESKTOP" },
                    {
                        "key": "GENERATION_STATUS",
                        "stringValue": if success { "SUCCESS" } else { "FAILURE" }
                    }
                ],
                "activeExperiments": [],
                "eventMetadata": { "sessionId": session_id },
                "eventTime": event_time.to_rfc3339_opts(SecondsFormat::Millis, true)
            }]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::test_support;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use wiremock::MockServer;

    #[test]
    fn test_batch_log_shape() {
        let time = Utc.with_ymd_and_hms(2025, 11, 20, 18, 53, 15).unwrap();
        let body = batch_log("MUSICLM_V2", ";1763664795734", false, time);

        let event = &body["json"]["appEvents"][0];
        assert_eq!(event["event"], "IM_FEELING_LUCKY");
        assert_eq!(event["eventTime"], "2025-11-20T18:53:15.000Z");
        assert_eq!(event["eventMetadata"]["sessionId"], ";1763664795734");
        assert_eq!(
            event["eventProperties"][0],
            json!({ "key": "TOOL_NAME", "stringValue": "MUSICLM_V2" })
        );
        assert_eq!(event["eventProperties"][2], json!({ "key": "IS_DESKTOP" }));
        assert_eq!(
            event["eventProperties"][3],
            json!({ "key": "GENERATION_STATUS", "stringValue": "FAILURE" })
        );
    }

    #[tokio::test]
    async fn test_submit_ignores_error_status() {
        let server = MockServer::start().await;
        test_support::mount_telemetry(&server, 500).await;

        let telemetry = Telemetry::new(
            Client::new(),
            format!("{}{}", server.uri(), test_support::TELEMETRY_PATH),
            Duration::from_secs(5),
        );

        telemetry
            .submit("IMAGE_FX", ";1", HeaderMap::new(), true)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_report_swallows_transport_failure() {
        // Nothing listens on port 1.
        let telemetry = Telemetry::new(
            Client::new(),
            "http://127.0.0.1:1/log".to_string(),
            Duration::from_secs(1),
        );

        let handle = telemetry.report("IMAGE_FX", ";1".to_string(), HeaderMap::new(), true);
        assert!(handle.await.is_ok());
    }
}
