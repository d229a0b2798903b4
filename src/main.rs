//! Heirloom - Digital legacy vault release and access-control engine
//!
//! Serves the vault API, runs the periodic release sweeper, and offers
//! a one-shot sweep for cron-style invocation.

use anyhow::Result;
use clap::{Parser, Subcommand};
use heirloom::{
    api::build_app,
    clock::SystemClock,
    config::HeirloomConfig,
    notify::{LogNotifier, Notifier, WebhookNotifier},
    release::{handler::ReleaseState, AccessEvaluator, ReleaseSweeper},
    sharing::{ShareLinkService, SharingState},
    vault::{FileVaultStore, VaultState},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "heirloom")]
#[command(version)]
#[command(about = "Digital legacy vault release and access-control engine")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "HEIRLOOM_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the vault API server and periodic sweeper
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run one release sweep and exit
    Sweep,

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("heirloom={},tower_http=debug", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = if let Some(config_path) = &cli.config {
        let content = std::fs::read_to_string(config_path)?;
        toml::from_str(&content)?
    } else {
        HeirloomConfig::default()
    };

    match cli.command {
        Commands::Serve { host, port } => {
            run_server(config, host, port).await?;
        }
        Commands::Sweep => {
            run_sweep(config).await?;
        }
        Commands::Config { default } => {
            let shown = if default {
                HeirloomConfig::default()
            } else {
                config
            };
            println!("{}", toml::to_string_pretty(&shown)?);
        }
    }

    Ok(())
}

struct Engine {
    store: Arc<FileVaultStore>,
    clock: Arc<SystemClock>,
    sweeper: Arc<ReleaseSweeper>,
}

async fn build_engine(config: &HeirloomConfig) -> Result<Engine> {
    let store = Arc::new(FileVaultStore::new(config.storage.data_dir.clone()).await?);
    let clock = Arc::new(SystemClock);

    let notifier: Arc<dyn Notifier> = match WebhookNotifier::from_config(&config.notifications)? {
        Some(webhook) => Arc::new(webhook),
        None => Arc::new(LogNotifier),
    };

    let sweeper = Arc::new(ReleaseSweeper::new(
        store.clone(),
        clock.clone(),
        notifier,
        config.sweeper.clone(),
    ));

    Ok(Engine {
        store,
        clock,
        sweeper,
    })
}

async fn run_server(
    config: HeirloomConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let engine = build_engine(&config).await?;

    let evaluator = Arc::new(AccessEvaluator::new(
        engine.store.clone(),
        engine.clock.clone(),
    ));
    let links = Arc::new(ShareLinkService::new(
        engine.store.clone(),
        engine.clock.clone(),
        config.share_links.clone(),
    ));

    if config.sweeper.enabled {
        engine.sweeper.clone().spawn();
        tracing::info!(
            interval_secs = config.sweeper.interval_secs,
            "Release sweeper started"
        );
    }

    let app = build_app(
        VaultState {
            store: engine.store.clone(),
            evaluator,
            clock: engine.clock.clone(),
        },
        SharingState { links },
        ReleaseState {
            sweeper: engine.sweeper.clone(),
        },
        &config.server.cors_origins,
    );

    let host = host.unwrap_or(config.server.host);
    let port = port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Heirloom API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
        })
        .await?;

    Ok(())
}

async fn run_sweep(config: HeirloomConfig) -> Result<()> {
    let engine = build_engine(&config).await?;
    let report = engine.sweeper.run_once().await?;
    println!(
        "Sweep complete: processed {}, released {}",
        report.processed, report.released
    );
    Ok(())
}
