use marketplace_auth::{
    build_router,
    config::MarketplaceConfig,
    db,
    services::{
        metrics::init_metrics, Database, EmailNotifier, FederationService, KeycloakClient,
        LogNotifier, Notifier, Store,
    },
    AppState,
};
use service_core::error::AppError;
use service_core::observability::init_tracing;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Fail fast on bad configuration
    let config = MarketplaceConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    )?;
    init_metrics()?;

    tracing::info!(
        service = %config.service_name,
        environment = ?config.environment,
        origin = %config.origin,
        "Starting marketplace auth service"
    );

    let pool = db::create_pool(&config.database).await?;
    db::run_migrations(&pool).await?;
    let store: Arc<dyn Store> = Arc::new(Database::new(pool));

    let notifier: Arc<dyn Notifier> = if config.smtp.enabled {
        Arc::new(EmailNotifier::new(&config.smtp, config.origin())?)
    } else {
        tracing::info!("SMTP disabled, account notifications will only be logged");
        Arc::new(LogNotifier)
    };

    let keycloak = KeycloakClient::new(&config.keycloak, config.origin())?;
    let federation = FederationService::new(keycloak, store.clone(), notifier);

    let addr = config.common.bind_address()?;
    let app = build_router(AppState {
        config,
        store,
        federation,
    });

    tracing::info!(address = %addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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
