use std::net::SocketAddr;

use axum::http::{HeaderValue, Method, header};
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use oktavian::{api, config, store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("OKTAVIAN_LOG").unwrap_or_else(|_| "info".into()))
        .with(fmt::layer().json())
        .init();

    let cfg = config::Config::load();
    if cfg.uses_dev_jwt_secret() {
        tracing::warn!("OKTAVIAN_JWT_SECRET not set, signing tokens with the development key");
    }
    if cfg.registration_secret.is_none() {
        tracing::warn!("OKTAVIAN_REGISTRATION_SECRET not set, registration and password resets are disabled");
    }

    // Connect to Postgres and run migrations
    let pool = store::pool::connect(&cfg.database_url).await?;
    store::pool::migrate(&pool).await?;

    // Connect to Valkey
    let valkey = store::valkey::connect(&cfg.valkey_url).await?;

    // Seed the Admin role and admin user on first run
    store::bootstrap::run(&pool, &cfg.admin_email, cfg.admin_password.as_deref()).await?;

    let addr: SocketAddr = cfg.listen.parse()?;
    let cors = cors_layer(&cfg.cors_origins);
    let state = store::AppState::new(pool, valkey, cfg)?;

    let app = axum::Router::new()
        .route("/healthz", axum::routing::get(|| async { "ok" }))
        .merge(api::router(&state))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    tracing::info!(%addr, "starting oktavian");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("oktavian stopped");
    Ok(())
}

/// CORS for the browser frontend. No configured origins means same-origin only.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
