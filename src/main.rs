use std::{sync::Arc, time::Duration};

use participant_gateway::{
    config::AppConfig,
    error::AppError,
    handlers,
    state::AppState,
    telemetry::{install_prometheus_recorder, ConsolePlugin, MetricsRegistry, PrometheusExporter},
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Configuration first: it decides the log format.
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    init_tracing(config.telemetry.json_logs);

    if let Err(e) = run(config).await {
        error!("Gateway stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    debug!(
        "Configuration loaded: port={}, host={}, api={}",
        config.port, config.host, config.gateway.base_url
    );

    let metrics_registry = Arc::new(MetricsRegistry::new(config.telemetry.debug_mode));
    if config.telemetry.debug_mode {
        debug!("Registering Console plugin for metrics");
        metrics_registry
            .register_exporter(Box::new(ConsolePlugin::new()))
            .await;
    }
    let prometheus = if config.telemetry.prometheus_enabled {
        let handle = install_prometheus_recorder()?;
        metrics_registry
            .register_exporter(Box::new(PrometheusExporter::new("participant_gateway".to_string())))
            .await;
        info!("Prometheus metrics served at /metrics");
        Some(handle)
    } else {
        None
    };

    let mut state = AppState::from_config(&config, metrics_registry)?;
    if let Some(handle) = prometheus {
        state = state.with_prometheus(handle);
    }
    debug!(
        "API gateway ready: base_url={}, credential_policy={:?}",
        state.gateway.base_url(),
        state.gateway.credential_policy()
    );

    debug!("Setting up CORS layer with 1-hour max age");
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    let app = handlers::router(state).layer(cors);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!(
        "Participant gateway listening on {}:{}, forwarding to {}",
        config.host, config.port, config.gateway.base_url
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

async fn shutdown_signal() {
    info!("Registering shutdown signal handler");
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for CTRL+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            debug!("CTRL+C signal received");
        },
        _ = terminate => {
            debug!("Terminate signal received");
        },
    }
    info!("Shutdown signal received, starting graceful shutdown");
}
