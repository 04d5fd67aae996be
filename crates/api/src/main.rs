//! API server entry point.

use std::sync::Arc;
use std::time::Duration;

use api::Stores;
use api::config::{Config, LogFormat};
use store::PostgresStore;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use workflow::otp::SWEEP_INTERVAL;
use workflow::{ChatChannel, InMemoryOtpStore, TelegramChannel};

const CHAT_TIMEOUT: Duration = Duration::from_secs(10);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn open_stores(config: &Config) -> Stores {
    let Some(url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set, using in-memory stores");
        return Stores::in_memory();
    };

    let store = PostgresStore::connect(url, config.database_max_connections)
        .await
        .expect("failed to connect to database");
    if config.run_migrations {
        store
            .run_migrations()
            .await
            .expect("failed to run migrations");
        tracing::info!("database migrations applied");
    }
    Stores::postgres(store)
}

fn chat_channel(config: &Config) -> Option<Arc<dyn ChatChannel>> {
    let Some(token) = config.telegram_bot_token.as_deref() else {
        tracing::warn!("TELEGRAM_BOT_TOKEN not set, order notifications and login codes disabled");
        return None;
    };
    let channel = TelegramChannel::new(&config.telegram_api_url, token, CHAT_TIMEOUT)
        .expect("failed to build Telegram client");
    Some(Arc::new(channel))
}

#[tokio::main]
async fn main() {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env();
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Open stores and outbound channels
    let stores = open_stores(&config).await;
    let chat = chat_channel(&config);
    if config.auth_secret.is_none() {
        tracing::warn!("AUTH_SECRET not set, back-office routes will reject every request");
    }

    // 4. Start the login code sweeper
    let codes = InMemoryOtpStore::default();
    let sweeper = codes.spawn_sweeper(SWEEP_INTERVAL);

    // 5. Build the application
    let addr = config.addr();
    let state = api::create_state(config, stores, chat, Arc::new(codes));
    let app = api::create_app(state, metrics_handle);

    // 6. Start server
    tracing::info!(%addr, "starting API server");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    sweeper.abort();
    tracing::info!("server shut down gracefully");
}
