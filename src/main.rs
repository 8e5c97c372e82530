use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shortly::api::{self, ApiContext};
use shortly::auth::session::SessionManager;
use shortly::auth::tokens::TokenService;
use shortly::config::Config;
use shortly::redirect;
use shortly::shortcode::RandomCodeGenerator;
use shortly::storage;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("shortly=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    info!("Loaded configuration ({:?} environment)", config.environment);

    let storage = storage::connect(&config.database).await?;
    info!("Initializing database...");
    storage.init().await?;
    info!("Database initialized successfully");

    let tokens = Arc::new(TokenService::new(&config.auth));
    let sessions = Arc::new(SessionManager::new(Arc::clone(&storage), tokens));

    let api_router = api::create_api_router(ApiContext {
        storage: Arc::clone(&storage),
        sessions,
        codes: Arc::new(RandomCodeGenerator::new(config.links.short_code_length)),
        environment: config.environment,
        cors: config.cors.clone(),
    });
    let redirect_router = redirect::create_redirect_router(
        Arc::clone(&storage),
        config.analytics.clone(),
        config.links.redirect_status,
    );

    let api_addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("API server listening on http://{}", api_addr);

    let redirect_addr = format!(
        "{}:{}",
        config.redirect_server.host, config.redirect_server.port
    );
    let redirect_listener = tokio::net::TcpListener::bind(&redirect_addr).await?;
    info!("Redirect server listening on http://{}", redirect_addr);
    info!(
        "Redirects use status {}, short codes are {} characters",
        config.links.redirect_status.status_code().as_u16(),
        config.links.short_code_length
    );

    tokio::try_join!(
        async {
            axum::serve(api_listener, api_router)
                .with_graceful_shutdown(shutdown_signal())
                .await
        },
        async {
            axum::serve(
                redirect_listener,
                redirect_router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(shutdown_signal())
            .await
        },
    )?;

    info!("Servers stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
