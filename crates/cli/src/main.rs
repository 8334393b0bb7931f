use anyhow::Context;
use clap::{Parser, Subcommand};
use spindle_core::{
    config::{AppConfig, LoggingConfig},
    EndpointPool,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
use commands::{chain, logs::LogsArgs};

#[derive(Parser)]
#[command(name = "spindle-cli")]
#[command(about = "Query Ethereum JSON-RPC data through a health-aware endpoint pool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(long, env = "SPINDLE_CONFIG", default_value = "config/config.toml")]
    config: String,

    /// Comma-separated endpoint URLs, overriding the config file
    #[arg(long)]
    rpc_urls: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current head block number
    LatestBlock,

    /// Fetch event logs for an inclusive block range
    Logs(LogsArgs),

    /// Fetch a transaction receipt
    Receipt {
        /// Transaction hash (0x-prefixed)
        hash: String,
    },

    /// Print the timestamp of a block
    BlockTime {
        /// Block number
        number: u64,
    },

    /// List configured endpoints and their health
    Endpoints,
}

/// Initializes the logging system based on the configuration.
fn init_logging(logging: &LoggingConfig) {
    let filter = if let Ok(env_filter) = std::env::var("RUST_LOG") {
        if env_filter == "debug" {
            EnvFilter::new("warn,spindle_core=debug,cli=debug")
        } else if env_filter == "trace" {
            EnvFilter::new("warn,spindle_core=trace,cli=trace")
        } else {
            EnvFilter::try_from_env("RUST_LOG")
                .unwrap_or_else(|_| EnvFilter::new("warn,spindle_core=debug,cli=debug"))
        }
    } else {
        let level = logging.level.as_str();
        EnvFilter::try_new(format!("warn,spindle_core={level},cli={level}"))
            .unwrap_or_else(|_| EnvFilter::new("warn,spindle_core=info,cli=info"))
    };

    let registry = tracing_subscriber::registry().with(filter);

    // logs go to stderr so stdout stays machine-readable
    if logging.format.as_str() == "json" {
        let fmt_layer = tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr);
        registry.with(fmt_layer).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).init();
    }
}

/// Cancels `cancel` on Ctrl+C so in-flight retry loops return.
async fn shutdown_signal(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Ctrl+C received, cancelling");
            cancel.cancel();
        }
        Err(e) => tracing::error!(error = %e, "failed to install Ctrl+C handler"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_file(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config))?;
    if let Some(rpc_urls) = cli.rpc_urls {
        config.pool.rpc_urls = rpc_urls;
    }

    init_logging(&config.logging);

    config.validate().map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    let pool = EndpointPool::from_config(&config.pool).context("failed to build endpoint pool")?;
    tracing::info!(endpoints = pool.len(), "endpoint pool ready");

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    let output = match cli.command {
        Commands::LatestBlock => chain::latest_block(&pool, &cancel).await?,
        Commands::Logs(args) => args.run(&pool, config.pool.replicas, &cancel).await?,
        Commands::Receipt { hash } => chain::receipt(&pool, &hash, &cancel).await?,
        Commands::BlockTime { number } => chain::block_time(&pool, number, &cancel).await?,
        Commands::Endpoints => chain::endpoints(&pool),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
