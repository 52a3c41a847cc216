use anyhow::Context;
use std::{net::SocketAddr, sync::Arc};
use todo_api::{config::Config, db, routes, state::AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 0. Load configuration
    // Reads .env first (dotenvy, silently skipped if missing), then the environment.
    // A missing JWT_SECRET or DATABASE_URL stops us right here.
    let config = Config::from_env().context("failed to load configuration")?;

    // 1. Initialize Sentry (if configured)
    // This guard must be kept in scope for Sentry to work.
    let _guard = sentry::init((
        std::env::var("SENTRY_DSN").ok(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            // Emails are PII. Keep them out of Sentry.
            send_default_pii: false,
            traces_sample_rate: 1.0,
            ..Default::default()
        },
    ));

    // 2. Install rustls crypto provider
    // Needs to happen before any TLS connection is made (database, Sentry).
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    // 3. Initialize logging
    // Respects RUST_LOG. Defaults to debug for us and tower_http.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todo_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    tracing::info!(env = ?config.env, "starting todo-api");

    // 4. Connect to database
    // Creates the tables if this is a fresh database.
    let db = db::connect(&config.database)
        .await
        .context("failed to init storage")?;
    tracing::info!("connected to postgres");

    // 5. Build the app state
    let store = Arc::new(db::PgStore::new(db.clone()));
    let address = config.http.address;
    let state = AppState::new(config, store).context("failed to build token service")?;
    let app = routes::create_routes(state);

    // 6. Start the server
    tracing::info!(%address, "listening");
    let listener = tokio::net::TcpListener::bind(address).await?;
    // Connect info gives the rate limiter the peer address to key on.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // In-flight requests are done by now. Let the pool say goodbye properly.
    db.close().await;
    tracing::info!("server stopped");

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix (what Docker and k8s send).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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

    tracing::info!("shutdown signal received, stopping server");
}
