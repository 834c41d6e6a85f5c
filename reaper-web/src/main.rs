//! reaper-web - Reaper's List HTTP service
//!
//! Serves the subscription tracker UI and JSON API from a single binary
//! backed by a local SQLite database.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use reaper_common::config::{default_config_path, AppConfig, CliOverrides};
use reaper_common::db::{init_database, products, sessions};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reaper_web::{build_router, AppState};

/// Command-line arguments for reaper-web
#[derive(Parser, Debug)]
#[command(name = "reaper-web")]
#[command(about = "Reaper's List: track the SaaS subscriptions draining your wallet")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(long = "config", env = "REAPER_CONFIG")]
    config_file: Option<PathBuf>,

    /// Folder holding reaper.db
    #[arg(long, env = "REAPER_DATA_FOLDER")]
    data_folder: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "REAPER_BIND")]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "REAPER_PORT")]
    port: Option<u16>,

    /// Mark session cookies Secure (serve behind HTTPS)
    #[arg(long, env = "REAPER_SECURE_COOKIES")]
    secure_cookies: bool,

    /// Load catalog products from a TOML file and exit
    #[arg(long, value_name = "FILE")]
    seed_catalog: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            config_file: self.config_file.clone(),
            data_folder: self.data_folder.clone(),
            bind: self.bind.clone(),
            port: self.port,
            secure_cookies: self.secure_cookies.then_some(true),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cli = args.overrides();

    // Config first: it carries the default log level
    let config = AppConfig::resolve(&cli).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Reaper's List (reaper-web) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match cli.config_file.clone().or_else(default_config_path) {
        Some(path) if path.exists() => info!("Config file: {}", path.display()),
        Some(path) => warn!("Config file not found: {} (using defaults)", path.display()),
        None => warn!("No config directory on this platform (using defaults)"),
    }

    config.ensure_data_folder()?;
    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;
    info!("✓ Database ready");

    if let Some(seed_file) = &args.seed_catalog {
        let count = products::seed_catalog_file(&pool, seed_file)
            .await
            .with_context(|| format!("Failed to seed catalog from {}", seed_file.display()))?;
        info!("Catalog seeded with {} products", count);
        pool.close().await;
        return Ok(());
    }

    let purged = sessions::purge_expired_sessions(&pool).await?;
    if purged > 0 {
        info!("Purged {} expired sessions", purged);
    }

    let state = AppState::from_config(pool, &config).context("Failed to create Stripe client")?;
    if state.payments.is_some() {
        info!("✓ Stripe payments enabled");
    } else {
        warn!("Stripe is not configured; payment endpoints will answer 503");
    }
    if state.webhook_secret.is_none() {
        info!("Stripe webhook secret not set; /api/payment/webhook disabled");
    }

    let app = build_router(state);

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("reaper-web listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
