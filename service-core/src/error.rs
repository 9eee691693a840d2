use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),

    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    /// Internal error whose cause is echoed back to the caller.
    /// Only constructed when diagnostics are switched on.
    #[error("Internal server error: {0:#}")]
    DiagnosticError(anyhow::Error),
}

impl AppError {
    /// Wrap an unexpected failure, exposing its cause only when `expose` is set.
    pub fn internal(err: anyhow::Error, expose: bool) -> Self {
        if expose {
            AppError::DiagnosticError(err)
        } else {
            AppError::InternalError(err)
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::ConfigError(_)
            | AppError::UpstreamError(_)
            | AppError::InternalError(_)
            | AppError::DiagnosticError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Configuration and internal failures never describe their cause
        // unless diagnostics were requested.
        let body = match self {
            AppError::BadRequest(msg)
            | AppError::MethodNotAllowed(msg)
            | AppError::PayloadTooLarge(msg) => ErrorResponse {
                error: msg,
                details: None,
                message: None,
            },
            AppError::ConfigError(_) => ErrorResponse {
                error: "Server configuration error".to_string(),
                details: None,
                message: None,
            },
            AppError::UpstreamError(details) => ErrorResponse {
                error: "Failed to send notification".to_string(),
                details: Some(details),
                message: None,
            },
            AppError::InternalError(_) => ErrorResponse {
                error: "Internal server error".to_string(),
                details: None,
                message: None,
            },
            AppError::DiagnosticError(err) => ErrorResponse {
                error: "Internal server error".to_string(),
                details: None,
                message: Some(format!("{:#}", err)),
            },
        };

        (status, Json(body)).into_response()
    }
}
