//! Application startup and lifecycle management.
//!
//! One HTTP server: the relay endpoint plus health and metrics, behind the
//! request-id, tracing, metrics and CORS layers.

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware, request_span};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::config::RelayConfig;
use crate::handlers::{health_check, method_not_allowed, metrics_endpoint, send_notification};
use crate::services::{FcmProvider, MockPushProvider, PushProvider};

pub const RELAY_PATH: &str = "/send-notification";

const ALLOWED_METHODS: &str = "POST, OPTIONS, GET";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization, X-Requested-With";
const X_REQUESTED_WITH: HeaderName = HeaderName::from_static("x-requested-with");

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub provider: Arc<dyn PushProvider>,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Result<Self, AppError> {
        let provider: Arc<dyn PushProvider> = if config.fcm.dry_run {
            tracing::info!("FCM dry run enabled, using mock push provider");
            // Dry runs still refuse to send when credentials are missing.
            Arc::new(MockPushProvider::new(config.fcm.is_configured()))
        } else {
            let provider = FcmProvider::new(config.fcm.clone()).map_err(|e| {
                tracing::error!("Failed to initialize FCM provider: {}", e);
                AppError::InternalError(anyhow::Error::new(e))
            })?;
            tracing::info!(mode = %config.fcm.mode, "FCM push provider initialized");
            Arc::new(provider)
        };

        Ok(Self {
            config: Arc::new(config),
            provider,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            RELAY_PATH,
            post(send_notification).fallback(method_not_allowed),
        )
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(request_span::<Body>))
        .layer(from_fn(request_id_middleware))
        // The CORS layer only lists methods and headers on preflights.
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        ))
        // Outermost: every OPTIONS request is answered here with 200.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::POST, Method::OPTIONS, Method::GET])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, X_REQUESTED_WITH]),
        )
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: RelayConfig) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let state = AppState::new(config)?;

        // Port 0 binds a random port for tests.
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port, "Notification relay listening");

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until SIGINT or SIGTERM.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Service shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
