//! Release notification dispatch
//!
//! The engine only decides *that* a notification is due; delivery
//! mechanics live behind the [`Notifier`] trait. The bundled
//! [`WebhookNotifier`] POSTs release events to a configured URL.

use crate::config::NotificationConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// A memory-released event handed to the notification collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseNotice {
    pub memory_id: Uuid,
    pub owner_id: String,
    /// Shared-with viewers plus the owner's trusted contacts
    pub recipients: Vec<String>,
    pub reason: String,
    pub released_at: DateTime<Utc>,
}

impl ReleaseNotice {
    pub fn released(
        memory_id: Uuid,
        owner_id: &str,
        recipients: Vec<String>,
        released_at: DateTime<Utc>,
    ) -> Self {
        Self {
            memory_id,
            owner_id: owner_id.to_string(),
            recipients,
            reason: "released".to_string(),
            released_at,
        }
    }
}

/// Notification dispatch seam
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: &ReleaseNotice) -> Result<()>;
}

/// POSTs each notice as JSON to a webhook endpoint
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client, url })
    }

    /// Build from config; None when no webhook URL is configured
    pub fn from_config(config: &NotificationConfig) -> Result<Option<Self>> {
        match &config.webhook_url {
            Some(url) => Ok(Some(Self::new(url.clone(), config.timeout_secs)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notice: &ReleaseNotice) -> Result<()> {
        let response = self.client.post(&self.url).json(notice).send().await?;
        if !response.status().is_success() {
            return Err(Error::Notify(format!(
                "webhook returned {}",
                response.status()
            )));
        }
        tracing::debug!(
            memory_id = %notice.memory_id,
            recipients = notice.recipients.len(),
            "Delivered release notice"
        );
        Ok(())
    }
}

/// Logs notices without delivering anywhere; the default when no
/// webhook is configured
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notice: &ReleaseNotice) -> Result<()> {
        tracing::info!(
            memory_id = %notice.memory_id,
            owner_id = %notice.owner_id,
            recipients = notice.recipients.len(),
            reason = %notice.reason,
            "Memory released"
        );
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_notice_wire_shape() {
        let at = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        let notice = ReleaseNotice::released(
            Uuid::new_v4(),
            "owner-1",
            vec!["friend-1".to_string()],
            at,
        );
        let json = serde_json::to_value(&notice).unwrap();
        assert_eq!(json["reason"], "released");
        assert_eq!(json["ownerId"], "owner-1");
        assert_eq!(json["recipients"][0], "friend-1");
    }

    #[tokio::test]
    async fn test_capturing_notifier() {
        let notifier = testing::CapturingNotifier::default();
        let notice = ReleaseNotice::released(Uuid::new_v4(), "o", vec![], Utc::now());
        notifier.notify(&notice).await.unwrap();
        assert_eq!(notifier.notices.lock().unwrap().len(), 1);

        notifier.fail.store(true, std::sync::atomic::Ordering::SeqCst);
        assert!(notifier.notify(&notice).await.is_err());
    }
}
