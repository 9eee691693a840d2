use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{Method, StatusCode},
    Json,
};
use service_core::error::AppError;

use crate::models::{Notification, NotificationRequest, RelayResult};
use crate::services::{record_notification, ProviderError};
use crate::startup::AppState;

pub const METHOD_NOT_ALLOWED_MESSAGE: &str = "Method not allowed. Use POST.";
pub const PAYLOAD_TOO_LARGE_MESSAGE: &str = "Request body too large";

/// Relay one notification to FCM.
///
/// The body is read raw: an empty body means `{}`, and malformed JSON is an
/// internal error rather than an extractor rejection. Body read failures
/// (including the size limit) are answered with a JSON error too.
#[tracing::instrument(skip(state, body), fields(mode = %state.config.fcm.mode))]
pub async fn send_notification(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<RelayResult>, AppError> {
    let mode = state.config.fcm.mode.as_str();
    let expose = state.config.expose_error_details;

    let body = body.map_err(|rejection| {
        tracing::warn!(
            status = %rejection.status(),
            error = %rejection.body_text(),
            "Failed to read notification request body"
        );
        record_notification(mode, "unreadable");
        body_rejection(rejection.status())
    })?;

    let request = NotificationRequest::from_bytes(&body).map_err(|e| {
        tracing::warn!(error = %e, "Malformed notification request body");
        record_notification(mode, "malformed");
        AppError::internal(
            anyhow::Error::new(e).context("Failed to parse request body"),
            expose,
        )
    })?;

    let notification = Notification::try_from(request).map_err(|e| {
        tracing::warn!(error = %e, "Rejected notification request");
        record_notification(mode, "invalid");
        AppError::BadRequest(e.to_string())
    })?;

    match state.provider.send(&notification).await {
        Ok(receipt) => {
            record_notification(mode, "sent");
            Ok(Json(RelayResult::sent(receipt.message_id)))
        }
        Err(e) => {
            record_notification(mode, e.kind());
            Err(provider_failure(e, expose))
        }
    }
}

/// Any method other than POST (OPTIONS never gets here, the CORS layer
/// answers it).
pub async fn method_not_allowed(method: Method) -> AppError {
    tracing::warn!(method = %method, "Rejected relay request method");
    AppError::MethodNotAllowed(METHOD_NOT_ALLOWED_MESSAGE.to_string())
}

fn body_rejection(status: StatusCode) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(PAYLOAD_TOO_LARGE_MESSAGE.to_string())
    } else {
        AppError::BadRequest("Failed to read request body".to_string())
    }
}

fn provider_failure(err: ProviderError, expose: bool) -> AppError {
    match err {
        ProviderError::NotConfigured => {
            tracing::error!("FCM credentials are missing; check the server environment");
            AppError::ConfigError(anyhow::Error::new(err))
        }
        ProviderError::Rejected { status, details } => {
            tracing::error!(status, details = %details, "FCM rejected the notification");
            AppError::UpstreamError(details)
        }
        other => {
            tracing::error!(error = %other, kind = other.kind(), "Push notification failed");
            AppError::internal(anyhow::Error::new(other), expose)
        }
    }
}
