use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

use super::credentials::{self, BearerCredential};
use super::envelope::{self, LegacyEnvelope, LegacyOutcome, V1Envelope};
use super::{ProviderError, PushProvider, SendReceipt};
use crate::config::{FcmConfig, ProviderCredential};
use crate::models::Notification;
use crate::services::metrics::record_provider_call;

pub struct FcmProvider {
    config: FcmConfig,
    client: Client,
}

impl FcmProvider {
    pub fn new(config: FcmConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProviderError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn legacy_url(&self) -> String {
        format!("{}/fcm/send", self.config.api_base_url)
    }

    fn v1_url(&self, project_id: &str) -> String {
        format!(
            "{}/v1/projects/{}/messages:send",
            self.config.api_base_url, project_id
        )
    }

    /// POST `envelope` and hand back the status and raw body.
    async fn post<T: Serialize>(
        &self,
        endpoint: &'static str,
        url: &str,
        bearer: &BearerCredential,
        envelope: &T,
    ) -> Result<(StatusCode, String), ProviderError> {
        let response = self
            .client
            .post(url)
            .header(header::AUTHORIZATION, bearer.authorization())
            .json(envelope)
            .send()
            .await
            .map_err(|e| {
                record_provider_call(endpoint, "error");
                ProviderError::Transport(format!("Failed to connect to FCM: {}", e))
            })?;

        let status = response.status();
        record_provider_call(endpoint, status.as_str());

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(format!("Failed to read FCM response: {}", e)))?;

        Ok((status, body))
    }

    async fn send_v1(
        &self,
        project_id: &str,
        bearer: &BearerCredential,
        notification: &Notification,
        topic: String,
    ) -> Result<SendReceipt, ProviderError> {
        let message = V1Envelope::compose(
            notification,
            topic,
            self.config.payload,
            &self.config.delivery,
        );

        let (status, body) = self
            .post("v1", &self.v1_url(project_id), bearer, &message)
            .await?;

        if !status.is_success() {
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                details: envelope::error_details(&body),
            });
        }

        let message_id = envelope::parse_v1_success(&body).map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse FCM response: {}", e))
        })?;

        Ok(SendReceipt { message_id })
    }

    async fn send_legacy(
        &self,
        bearer: &BearerCredential,
        notification: &Notification,
        topic: String,
    ) -> Result<SendReceipt, ProviderError> {
        let message = LegacyEnvelope::compose(
            notification,
            topic,
            self.config.payload,
            &self.config.delivery,
        );

        let (status, body) = self
            .post("legacy", &self.legacy_url(), bearer, &message)
            .await?;

        if !status.is_success() {
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                details: envelope::error_details(&body),
            });
        }

        match envelope::parse_legacy_success(&body) {
            Ok(LegacyOutcome::Sent(message_id)) => Ok(SendReceipt { message_id }),
            Ok(LegacyOutcome::Failed(details)) => Err(ProviderError::Rejected {
                status: status.as_u16(),
                details,
            }),
            Err(e) => Err(ProviderError::InvalidResponse(format!(
                "Failed to parse FCM response: {}",
                e
            ))),
        }
    }
}

#[async_trait]
impl PushProvider for FcmProvider {
    async fn send(&self, notification: &Notification) -> Result<SendReceipt, ProviderError> {
        let credential = self
            .config
            .credential
            .as_ref()
            .map_err(|_| ProviderError::NotConfigured)?;

        let bearer =
            credentials::resolve(&self.client, credential, &self.config.token_uri).await?;

        let topic = envelope::resolve_topic(
            self.config.target,
            &self.config.default_topic,
            notification,
        );

        let receipt = match credential {
            ProviderCredential::ServerKey(_) => {
                self.send_legacy(&bearer, notification, topic.clone()).await?
            }
            ProviderCredential::ServiceAccount(account) => {
                self.send_v1(&account.project_id, &bearer, notification, topic.clone())
                    .await?
            }
        };

        tracing::info!(
            topic = %topic,
            mode = %self.config.mode,
            message_id = ?receipt.message_id,
            "Push notification sent via FCM"
        );

        Ok(receipt)
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }
}

/// Logs notifications instead of delivering them (`FCM_DRY_RUN`).
pub struct MockPushProvider {
    configured: bool,
    send_count: AtomicU64,
    last_sent: Mutex<Option<Notification>>,
}

impl MockPushProvider {
    pub fn new(configured: bool) -> Self {
        Self {
            configured,
            send_count: AtomicU64::new(0),
            last_sent: Mutex::new(None),
        }
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }

    pub async fn last_sent(&self) -> Option<Notification> {
        self.last_sent.lock().await.clone()
    }
}

#[async_trait]
impl PushProvider for MockPushProvider {
    async fn send(&self, notification: &Notification) -> Result<SendReceipt, ProviderError> {
        if !self.configured {
            return Err(ProviderError::NotConfigured);
        }

        let count = self.send_count.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_sent.lock().await = Some(notification.clone());

        tracing::info!(
            title = %notification.title,
            category = ?notification.category,
            "[DRY RUN] Push notification would be sent"
        );

        Ok(SendReceipt {
            message_id: Some(format!("dry-run-{}", count)),
        })
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}
