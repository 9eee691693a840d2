use notification_relay::config::RelayConfig;
use notification_relay::services::init_metrics;
use notification_relay::startup::Application;
use service_core::error::AppError;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = RelayConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    if let Err(e) = init_metrics() {
        tracing::warn!("Failed to initialize metrics: {}", e);
    }

    // Only variable names are logged, never values.
    if let Err(missing) = &config.fcm.credential {
        tracing::warn!(
            mode = %config.fcm.mode,
            "FCM credentials not configured ({}); sends will fail until they are set",
            missing
        );
    }

    let service_span = tracing::info_span!(
        "service",
        service = %config.service_name,
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.environment,
    );
    let _guard = service_span.enter();

    let app = Application::build(config).await?;
    app.run_until_stopped().await?;

    Ok(())
}
