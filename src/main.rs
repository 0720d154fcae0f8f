use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use modelwatch::{
    config::AppConfig,
    notification::SlackNotifier,
    persistence::{sqlite::SqliteStateStore, traits::StateStore},
    sources::build_watchers,
    supervisor::Supervisor,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file (defaults to config.yaml).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the watch loop until interrupted.
    Run,
    /// Performs a single sweep over all pairs and exits.
    Once,
    /// Sends a test message to the default Slack webhook.
    Test,
    /// Deletes all stored watch state, so every pair starts fresh.
    ClearState,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber =
        FmtSubscriber::builder().with_env_filter(EnvFilter::from_default_env()).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();
    let config = AppConfig::new(cli.config.as_deref())?;
    tracing::debug!(
        database_url = %config.database_url,
        models = config.models.len(),
        "Configuration loaded."
    );

    match cli.command {
        Commands::Run => run_supervisor(config, false).await?,
        Commands::Once => run_supervisor(config, true).await?,
        Commands::Test => test_notification(config).await?,
        Commands::ClearState => clear_state(config).await?,
    }

    Ok(())
}

fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(Duration::from_secs(30)).build()
}

async fn run_supervisor(
    config: AppConfig,
    once: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!("Initializing state store...");
    let store = Arc::new(SqliteStateStore::new(&config.database_url).await?);
    store.run_migrations().await?;
    tracing::info!("Database migrations completed.");

    let client = http_client()?;
    let watchers = build_watchers(&config, &client);
    tracing::info!(watchers = watchers.len(), "Watchers assembled.");

    let notifier =
        Arc::new(SlackNotifier::new(&config.slack, &config.notifications, client.clone()));

    let supervisor = Supervisor::builder()
        .config(config)
        .store(store)
        .notifier(notifier)
        .watchers(watchers)
        .build()?;

    if once {
        let summary = supervisor.run_once().await;
        tracing::info!(
            pairs = summary.pairs,
            events = summary.events,
            failures = summary.failures,
            "Single sweep complete."
        );
    } else {
        tracing::info!("Supervisor initialized, starting watch loop...");
        supervisor.run().await?;
    }
    Ok(())
}

async fn test_notification(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let notifier = SlackNotifier::new(&config.slack, &config.notifications, http_client()?);
    notifier.test_connection().await?;
    tracing::info!("Test notification delivered.");
    Ok(())
}

async fn clear_state(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStateStore::new(&config.database_url).await?;
    store.run_migrations().await?;
    let keys = store.list_keys().await?;
    store.reset().await?;
    tracing::info!(cleared = keys.len(), "Watch state cleared.");
    store.close().await;
    Ok(())
}
