//! Freshwatch CLI
//!
//! Command-line interface for the freshness dashboard:
//! - Watch live classifications
//! - Print statistics and recent history
//! - Look up user roles and follow hosted table changes
//! - Generate a config file

use anyhow::Context;
use clap::{Parser, Subcommand};
use freshwatch::config::generate_default_config;
use freshwatch::{
    BackendClient, ClassificationEvent, Config, DashboardSession, DisplayAggregator, LiveClient, LoggingConfig,
    StatsSource, SupabaseClient, TerminalSink,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "freshwatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Live dashboard for fruit freshness classification")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend REST base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Backend WebSocket URL
    #[arg(long, global = true)]
    pub ws_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Follow live classifications until Ctrl+C
    Watch,

    /// Print the current statistics
    Stats {
        /// Aggregate over the hosted table instead of asking the backend
        #[arg(long)]
        table: bool,
    },

    /// Print recent classifications, newest first
    History {
        /// Number of entries
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Read from the hosted table instead of the backend
        #[arg(long)]
        table: bool,
    },

    /// Look up a user's role
    Role {
        /// User id
        user_id: String,
    },

    /// Print hosted table changes until Ctrl+C
    Changes,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        let content = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, content)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Config written to {}", path.display());
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = cli.api_url {
        config.backend.api_url = url;
    }
    if let Some(url) = cli.ws_url {
        config.backend.ws_url = url;
    }

    init_logging(&config.logging);

    match cli.command {
        Commands::Watch => watch(&config).await,
        Commands::Stats { table } => stats(&config, table).await,
        Commands::History { limit, table } => history(&config, limit, table).await,
        Commands::Role { user_id } => {
            let client = SupabaseClient::new(config.supabase_config())?;
            println!("{}", client.get_user_role(&user_id).await);
            Ok(())
        }
        Commands::Changes => changes(&config).await,
        Commands::Config { .. } => Ok(()),
    }
}

/// Logs go to stderr so they never interleave with dashboard output
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("freshwatch={}", logging.level)));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

fn terminal_session(config: &Config, feed_capacity: usize) -> DashboardSession {
    let display = DisplayAggregator::new(
        config.live.counter_animation_steps,
        config.counter_animation(),
    );
    DashboardSession::new(
        feed_capacity,
        display,
        Box::new(TerminalSink::stdout()),
    )
}

async fn watch(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Freshwatch v{}", env!("CARGO_PKG_VERSION"));

    let source = Arc::new(BackendClient::new(config.backend_config())?);
    let session = terminal_session(config, config.live.feed_capacity);
    let handle = LiveClient::new(config.live_config(), source, session).spawn();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");

    let session = handle.shutdown().await?;
    tracing::info!(feed_entries = session.feed().len(), "Dashboard closed");
    Ok(())
}

async fn stats(config: &Config, table: bool) -> anyhow::Result<()> {
    let snapshot = if table {
        let client = SupabaseClient::new(config.supabase_config())?;
        client.get_statistics().await?.to_snapshot()
    } else {
        let client = BackendClient::new(config.backend_config())?;
        client.fetch_statistics().await?
    };

    terminal_session(config, config.live.feed_capacity).apply_statistics(snapshot);
    Ok(())
}

async fn history(config: &Config, limit: usize, table: bool) -> anyhow::Result<()> {
    let events: Vec<ClassificationEvent> = if table {
        let client = SupabaseClient::new(config.supabase_config())?;
        client
            .get_recent_classifications(limit)
            .await?
            .iter()
            .map(|row| row.to_event())
            .collect()
    } else {
        let client = BackendClient::new(config.backend_config())?;
        client.fetch_history(limit).await?
    };

    if events.is_empty() {
        println!("No classifications yet");
        return Ok(());
    }

    let mut session = terminal_session(config, limit);
    session.load_history(events);
    Ok(())
}

async fn changes(config: &Config) -> anyhow::Result<()> {
    let client = SupabaseClient::new(config.supabase_config())?;
    let subscription = client
        .subscribe_to_classifications(|change| println!("{}", change))
        .await?;

    tokio::signal::ctrl_c().await?;
    subscription.unsubscribe().await;
    Ok(())
}
