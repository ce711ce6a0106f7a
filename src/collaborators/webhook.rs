//! HTTP webhook dispatcher
//!
//! Posts the outbound response for a case to an external messaging gateway.
//! Transient failures (5xx and network errors) are retried with exponential
//! backoff; client errors and timeouts fail immediately.

use crate::case::Case;
use crate::collaborators::{CollaboratorError, CollaboratorResult, Dispatcher};
use crate::config::DispatchConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

const CAPABILITY: &str = "dispatcher";

const BASE_BACKOFF_MS: u64 = 100;
const MAX_BACKOFF_MS: u64 = 10_000;

/// Exponential backoff before retry `attempt + 1`, capped at [`MAX_BACKOFF_MS`]
fn backoff_delay(attempt: usize) -> Duration {
    let factor = u32::try_from(attempt)
        .ok()
        .and_then(|exp| 2_u64.checked_pow(exp))
        .unwrap_or(u64::MAX);
    Duration::from_millis(BASE_BACKOFF_MS.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

/// Dispatcher that delivers responses over HTTP
pub struct WebhookDispatcher {
    config: DispatchConfig,
    client: reqwest::Client,
}

/// Body posted to the webhook
#[derive(Debug, Clone, Serialize)]
struct DispatchPayload<'a> {
    case_id: &'a str,
    queue: Option<&'a str>,
    channel: &'a str,
    response_text: &'a str,
    citations: &'a [String],
    disclaimers: &'a [String],
    sla_deadline: Option<DateTime<Utc>>,
}

impl WebhookDispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }

    async fn post_with_retry(&self, payload: &DispatchPayload<'_>) -> CollaboratorResult<()> {
        let mut last_error = None;
        let url = &self.config.webhook_url;
        let timeout = self.timeout();
        let retry_attempts = self.config.retry_attempts;

        for attempt in 0..=retry_attempts {
            debug!(
                attempt = attempt + 1,
                max_attempts = retry_attempts + 1,
                url = %url,
                "Posting case response to webhook"
            );

            match self
                .client
                .post(url)
                .json(payload)
                .timeout(timeout)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        info!(case_id = payload.case_id, status = %status, "Webhook accepted response");
                        return Ok(());
                    } else if status.is_server_error() && attempt < retry_attempts {
                        warn!(
                            status = %status,
                            attempt = attempt + 1,
                            "Webhook returned server error, retrying..."
                        );

                        tokio::time::sleep(backoff_delay(attempt)).await;

                        last_error = Some(format!("Server error: {status}"));
                        continue;
                    } else if status.is_client_error() {
                        return Err(CollaboratorError::rejected(
                            CAPABILITY,
                            format!("webhook refused delivery with status {status}"),
                        ));
                    } else {
                        return Err(CollaboratorError::unavailable(
                            CAPABILITY,
                            format!("webhook failed with status {status}"),
                        ));
                    }
                }
                Err(e) if e.is_timeout() => {
                    return Err(CollaboratorError::unavailable(
                        CAPABILITY,
                        format!("webhook timeout after {timeout:?}"),
                    ));
                }
                Err(e) if attempt < retry_attempts => {
                    warn!(
                        error = %e,
                        attempt = attempt + 1,
                        "Webhook network error, retrying..."
                    );

                    tokio::time::sleep(backoff_delay(attempt)).await;

                    last_error = Some(format!("Network error: {e}"));
                    continue;
                }
                Err(e) => {
                    return Err(CollaboratorError::unavailable(
                        CAPABILITY,
                        format!("webhook delivery failed: {e}"),
                    ));
                }
            }
        }

        Err(CollaboratorError::unavailable(
            CAPABILITY,
            format!(
                "webhook delivery failed after {} retries: {}",
                retry_attempts,
                last_error.unwrap_or_else(|| "Unknown error".to_string())
            ),
        ))
    }
}

#[async_trait]
impl Dispatcher for WebhookDispatcher {
    async fn send(&self, case: &Case) -> CollaboratorResult<()> {
        let draft = case
            .draft
            .as_ref()
            .ok_or_else(|| CollaboratorError::rejected(CAPABILITY, "case has no draft to send"))?;

        let payload = DispatchPayload {
            case_id: &case.case_id,
            queue: case.routing_queue.as_deref(),
            channel: &case.channel,
            response_text: &draft.text,
            citations: &draft.citations,
            disclaimers: &draft.disclaimers,
            sla_deadline: case.sla_deadline,
        };

        self.post_with_retry(&payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::Draft;
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sendable_case() -> Case {
        let mut case = Case::new("C_WEB_1", "text", "email");
        case.routing_queue = Some("CardDisputes".to_string());
        case.draft = Some(Draft {
            draft_id: Uuid::new_v4(),
            text: "We are reviewing your report.".to_string(),
            citations: vec!["policy_refund_v4#clause2".to_string()],
            disclaimers: vec![],
            recommended_actions: vec![],
            tone: "neutral".to_string(),
            confidence: 0.8,
        });
        case
    }

    fn dispatcher_for(server: &MockServer, retry_attempts: usize) -> WebhookDispatcher {
        WebhookDispatcher::new(DispatchConfig {
            webhook_url: format!("{}/dispatch", server.uri()),
            timeout_ms: 2000,
            retry_attempts,
        })
    }

    #[tokio::test]
    async fn test_webhook_posts_case_payload() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/dispatch"))
            .and(body_partial_json(json!({
                "case_id": "C_WEB_1",
                "queue": "CardDisputes",
                "channel": "email",
                "response_text": "We are reviewing your report."
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dispatcher = dispatcher_for(&mock_server, 3);
        assert!(dispatcher.send(&sendable_case()).await.is_ok());
    }

    #[tokio::test]
    async fn test_webhook_retries_server_errors() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/dispatch"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/dispatch"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let dispatcher = dispatcher_for(&mock_server, 3);
        assert!(dispatcher.send(&sendable_case()).await.is_ok());
    }

    #[tokio::test]
    async fn test_webhook_client_error_is_rejection() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/dispatch"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dispatcher = dispatcher_for(&mock_server, 3);
        let err = dispatcher.send(&sendable_case()).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_webhook_gives_up_after_retries() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/dispatch"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&mock_server)
            .await;

        let dispatcher = dispatcher_for(&mock_server, 1);
        let err = dispatcher.send(&sendable_case()).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Unavailable { .. }));
        assert_eq!(err.capability(), "dispatcher");
    }

    #[tokio::test]
    async fn test_webhook_requires_draft() {
        let mock_server = MockServer::start().await;
        let dispatcher = dispatcher_for(&mock_server, 0);

        let err = dispatcher
            .send(&Case::new("C_WEB_2", "text", "chat"))
            .await
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::Rejected { .. }));
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        assert_eq!(backoff_delay(0), Duration::from_millis(100));
        assert_eq!(backoff_delay(1), Duration::from_millis(200));
        assert_eq!(backoff_delay(6), Duration::from_millis(6400));
        assert_eq!(backoff_delay(7), Duration::from_millis(MAX_BACKOFF_MS));
        assert_eq!(backoff_delay(58), Duration::from_millis(MAX_BACKOFF_MS));
        assert_eq!(backoff_delay(usize::MAX), Duration::from_millis(MAX_BACKOFF_MS));
    }
}
