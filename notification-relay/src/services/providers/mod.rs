pub mod credentials;
pub mod envelope;
pub mod push;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Notification;

pub use credentials::BearerCredential;
pub use push::{FcmProvider, MockPushProvider};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider credentials are not configured")]
    NotConfigured,

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Connection error: {0}")]
    Transport(String),

    #[error("Provider rejected the message with status {status}: {details}")]
    Rejected { status: u16, details: String },

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured => "not_configured",
            ProviderError::Credential(_) => "credential",
            ProviderError::Transport(_) => "transport",
            ProviderError::Rejected { .. } => "rejected",
            ProviderError::InvalidResponse(_) => "invalid_response",
        }
    }
}

/// What the provider handed back for an accepted message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendReceipt {
    pub message_id: Option<String>,
}

#[async_trait]
pub trait PushProvider: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<SendReceipt, ProviderError>;
    fn is_configured(&self) -> bool;
}
