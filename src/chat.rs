use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::error;

use crate::error::{TrackerError, TrackerResult};
use crate::types::ChatPayload;

/// What gets announced after an environment's artifacts are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotice {
    pub label: String,
    pub count: usize,
    pub file_name: String,
    pub at: DateTime<Utc>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: &ChangeNotice) -> TrackerResult<()>;
}

pub fn build_chat_payload(notice: &ChangeNotice) -> ChatPayload {
    ChatPayload {
        text: format!(
            "📣 *{}* WordPress changes detected:\n• Entries: *{}*\n• Log file: `{}`\n• Time: {}",
            notice.label,
            notice.count,
            notice.file_name,
            notice.at.format("%Y-%m-%d %H:%M"),
        ),
    }
}

/// Posts notices to a Google Chat incoming webhook. Single attempt, no retry.
pub struct WebhookNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl WebhookNotifier {
    pub fn new(webhook_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build webhook HTTP client")?;
        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notice: &ChangeNotice) -> TrackerResult<()> {
        let payload = build_chat_payload(notice);
        let res = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| TrackerError::Notify(format!("Failed to send webhook request: {e}")))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            error!("Chat webhook failed: {} - {}", status, body);
            return Err(TrackerError::Notify(format!(
                "webhook returned non-success status {status}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn notice() -> ChangeNotice {
        ChangeNotice {
            label: "live".to_string(),
            count: 3,
            file_name: "stream-changes-live-2024-01-01_00-00-00.csv".to_string(),
            at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 5, 59).unwrap(),
        }
    }

    #[test]
    fn test_build_chat_payload() {
        let payload = build_chat_payload(&notice());

        assert!(payload.text.contains("*live*"));
        assert!(payload.text.contains("Entries: *3*"));
        assert!(payload
            .text
            .contains("`stream-changes-live-2024-01-01_00-00-00.csv`"));
        assert!(payload.text.ends_with("Time: 2024-01-01 00:05"));
        assert_eq!(payload.text.lines().count(), 4);

        let body = serde_json::to_value(&payload).unwrap();
        assert_eq!(body.as_object().unwrap().len(), 1);
        assert!(body["text"].is_string());
    }

    #[tokio::test]
    async fn test_webhook_posts_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/spaces/abc/messages")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::Regex("Entries: \\*3\\*".to_string()))
            .with_status(200)
            .create_async()
            .await;

        let url = format!("{}/v1/spaces/abc/messages", server.url());
        let notifier = WebhookNotifier::new(url, Duration::from_secs(5)).unwrap();
        notifier.notify(&notice()).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_webhook_error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/hook")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let notifier =
            WebhookNotifier::new(format!("{}/hook", server.url()), Duration::from_secs(5)).unwrap();
        let err = notifier.notify(&notice()).await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
