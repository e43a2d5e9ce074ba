//! ProudShop admin API server.
//!
//! Serves the settings store, mail, AI and chat endpoints under `/api/v1`.
//!
//! # Architecture
//!
//! - Axum web framework
//! - `PostgreSQL` for settings, admins and chat history
//! - SMTP via lettre, `OpenAI` via reqwest
//!
//! Migrations are not run here; use `ps-cli migrate`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use axum::ServiceExt;
use axum::extract::Request;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use proudshop_admin::config::AdminConfig;
use proudshop_admin::crypto::SettingsCipher;
use proudshop_admin::db;
use proudshop_admin::settings::ProcessEnv;
use proudshop_admin::state::AppState;

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &AdminConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            // Settings values and customer emails must not leave the box.
            send_default_pii: false,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        tracing::Level::TRACE => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "proudshop_admin=info,tower_http=debug".into());

    // JSON for log shippers, text for local development
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment (needed for Sentry init)
    let config = AdminConfig::from_env()?;

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    let cipher = SettingsCipher::from_env(&ProcessEnv)?;

    let addr = config.socket_addr();
    let app = proudshop_admin::app(AppState::new(config, pool, cipher));

    tracing::info!("admin listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
