use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_TITLE: &str = "New Update";
pub const DEFAULT_BODY: &str = "Check the app for details";

const MAX_TOPIC_LEN: usize = 900;
const TOPIC_PREFIX: &str = "/topics/";

/// Inbound relay request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl NotificationRequest {
    /// Parse a raw body. An empty body is read as `{}`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("At least title or body is required")]
    MissingContent,

    #[error("Invalid category: '{0}' is not a valid topic name")]
    InvalidCategory(String),
}

/// A request that passed validation, with defaults filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub category: Option<String>,
}

impl TryFrom<NotificationRequest> for Notification {
    type Error = ValidationError;

    fn try_from(request: NotificationRequest) -> Result<Self, Self::Error> {
        let title = non_empty(request.title);
        let body = non_empty(request.body);

        if title.is_none() && body.is_none() {
            return Err(ValidationError::MissingContent);
        }

        let category = non_empty(request.category.map(|c| c.trim().to_string()))
            .map(|c| match c.strip_prefix(TOPIC_PREFIX) {
                Some(stripped) => stripped.to_string(),
                None => c,
            });

        if let Some(category) = category.as_deref() {
            if !is_valid_topic(category) {
                return Err(ValidationError::InvalidCategory(category.to_string()));
            }
        }

        Ok(Notification {
            title: title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            body: body.unwrap_or_else(|| DEFAULT_BODY.to_string()),
            category,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// FCM topic names: `[a-zA-Z0-9-_.~%]{1,900}`.
pub fn is_valid_topic(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_TOPIC_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~' | '%'))
}

/// Body of a successful relay response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RelayResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RelayResult {
    pub fn sent(message_id: Option<String>) -> Self {
        Self {
            success: true,
            message_id,
            error: None,
        }
    }
}
