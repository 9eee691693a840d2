//! FCM wire payloads (legacy and v1) and provider response parsing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{DeliveryOptions, PayloadMode, TargetStrategy};
use crate::models::Notification;

pub const CLICK_ACTION: &str = "FLUTTER_NOTIFICATION_CLICK";
pub const UNKNOWN_PROVIDER_ERROR: &str = "Unknown FCM error";

const HIGH_PRIORITY: &str = "high";
const APNS_IMMEDIATE_PRIORITY: &str = "10";

/// Topic a notification is delivered to under `strategy`.
pub fn resolve_topic(
    strategy: TargetStrategy,
    default_topic: &str,
    notification: &Notification,
) -> String {
    match (strategy, notification.category.as_deref()) {
        (TargetStrategy::Category, Some(category)) => category.to_string(),
        _ => default_topic.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DisplayBlock {
    pub title: String,
    pub body: String,
}

fn data_block(notification: &Notification, payload: PayloadMode) -> BTreeMap<String, String> {
    let mut data = BTreeMap::new();
    data.insert("click_action".to_string(), CLICK_ACTION.to_string());

    if let Some(category) = &notification.category {
        data.insert("category".to_string(), category.clone());
    }

    if payload == PayloadMode::DataOnly {
        data.insert("title".to_string(), notification.title.clone());
        data.insert("body".to_string(), notification.body.clone());
    }

    data
}

#[derive(Debug, Serialize)]
pub struct V1Envelope {
    pub message: V1Message,
}

#[derive(Debug, Serialize)]
pub struct V1Message {
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<DisplayBlock>,
    pub data: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android: Option<AndroidConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apns: Option<ApnsConfig>,
}

#[derive(Debug, Serialize)]
pub struct AndroidConfig {
    pub priority: &'static str,
    /// Duration string, e.g. `"3600s"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<AndroidNotification>,
}

#[derive(Debug, Serialize)]
pub struct AndroidNotification {
    pub channel_id: String,
}

#[derive(Debug, Serialize)]
pub struct ApnsConfig {
    pub headers: BTreeMap<String, String>,
}

impl V1Envelope {
    pub fn compose(
        notification: &Notification,
        topic: String,
        payload: PayloadMode,
        delivery: &DeliveryOptions,
    ) -> Self {
        let display = (payload == PayloadMode::Notification).then(|| DisplayBlock {
            title: notification.title.clone(),
            body: notification.body.clone(),
        });

        let (android, apns) = if delivery.high_priority {
            let android = AndroidConfig {
                priority: HIGH_PRIORITY,
                ttl: delivery.ttl_seconds.map(|secs| format!("{}s", secs)),
                notification: delivery
                    .android_channel_id
                    .clone()
                    .map(|channel_id| AndroidNotification { channel_id }),
            };
            let apns = ApnsConfig {
                headers: BTreeMap::from([(
                    "apns-priority".to_string(),
                    APNS_IMMEDIATE_PRIORITY.to_string(),
                )]),
            };
            (Some(android), Some(apns))
        } else {
            (None, None)
        };

        V1Envelope {
            message: V1Message {
                topic,
                notification: display,
                data: data_block(notification, payload),
                android,
                apns,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct V1SendResponse {
    name: Option<String>,
}

/// Message name from a successful v1 send.
pub fn parse_v1_success(body: &str) -> Result<Option<String>, serde_json::Error> {
    serde_json::from_str::<V1SendResponse>(body).map(|r| r.name)
}

#[derive(Debug, Serialize)]
pub struct LegacyEnvelope {
    /// `/topics/<topic>`
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<LegacyNotification>,
    pub data: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_live: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct LegacyNotification {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android_channel_id: Option<String>,
}

impl LegacyEnvelope {
    pub fn compose(
        notification: &Notification,
        topic: String,
        payload: PayloadMode,
        delivery: &DeliveryOptions,
    ) -> Self {
        let hints = delivery.high_priority;

        let display = (payload == PayloadMode::Notification).then(|| LegacyNotification {
            title: notification.title.clone(),
            body: notification.body.clone(),
            android_channel_id: if hints {
                delivery.android_channel_id.clone()
            } else {
                None
            },
        });

        LegacyEnvelope {
            to: format!("/topics/{}", topic),
            notification: display,
            data: data_block(notification, payload),
            priority: hints.then_some(HIGH_PRIORITY),
            time_to_live: if hints { delivery.ttl_seconds } else { None },
        }
    }
}

#[derive(Debug, Deserialize)]
struct LegacySendResponse {
    #[serde(default)]
    message_id: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    results: Vec<LegacySendResult>,
}

#[derive(Debug, Deserialize)]
struct LegacySendResult {
    #[serde(default)]
    message_id: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Outcome of a 2xx legacy send. Legacy FCM reports some failures
/// (rate limits, bad registrations) inside a 200 body.
#[derive(Debug, PartialEq, Eq)]
pub enum LegacyOutcome {
    Sent(Option<String>),
    Failed(String),
}

pub fn parse_legacy_success(body: &str) -> Result<LegacyOutcome, serde_json::Error> {
    let response: LegacySendResponse = serde_json::from_str(body)?;

    let first = response.results.into_iter().next();
    let error = response
        .error
        .or_else(|| first.as_ref().and_then(|r| r.error.clone()));
    if let Some(error) = error {
        return Ok(LegacyOutcome::Failed(error));
    }

    let message_id = response
        .message_id
        .or_else(|| first.and_then(|r| r.message_id))
        .and_then(|id| match id {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

    Ok(LegacyOutcome::Sent(message_id))
}

/// Human-readable reason from a provider error body.
///
/// Understands the v1 shape (`{"error": {"message": ...}}`) and the legacy
/// shapes (`{"error": "..."}`, `{"results": [{"error": "..."}]}`).
pub fn error_details(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return UNKNOWN_PROVIDER_ERROR.to_string();
    };

    let from_error = match value.get("error") {
        Some(serde_json::Value::Object(error)) => error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string),
        Some(serde_json::Value::String(error)) => Some(error.clone()),
        _ => None,
    };

    from_error
        .or_else(|| {
            value
                .pointer("/results/0/error")
                .and_then(|e| e.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| UNKNOWN_PROVIDER_ERROR.to_string())
}
