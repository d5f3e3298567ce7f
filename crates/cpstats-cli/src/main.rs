use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use cpstats_core::{load_handles, AppConfig};
use cpstats_scraper::{ExtractorRegistry, StatsClient};
use cpstats_store::SnapshotStore;
use tracing_subscriber::EnvFilter;

mod record;
mod render;
mod update;

#[derive(Debug, Parser)]
#[command(name = "cpstats")]
#[command(about = "Solved-problem counts across competitive programming sites")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch every configured platform, update the snapshot, print a summary
    Run {
        /// Fetch and print without writing the snapshot or stats file
        #[arg(long)]
        dry_run: bool,
    },
    /// Record a count by hand for one platform
    Record {
        /// Platform name (case-insensitive)
        platform: String,
        /// Solved count to store
        count: u32,
        /// Date the count was observed (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Print the persisted snapshot
    Show,
    /// List known platforms and configured handles
    Platforms,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = cpstats_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run { dry_run } => run_command(&config, dry_run).await,
        Commands::Record {
            platform,
            count,
            date,
        } => record::run_record(&config, &platform, count, date),
        Commands::Show => {
            let snapshot = SnapshotStore::new(&config.snapshot_path).load();
            print!("{}", render::snapshot_table(&snapshot, config.today()));
            Ok(())
        }
        Commands::Platforms => {
            let registry = ExtractorRegistry::builtin(config.max_reasonable_count);
            let handles = if config.handles_path.exists() {
                Some(load_handles(&config.handles_path)?)
            } else {
                None
            };
            print!("{}", render::platforms_table(&registry, handles.as_ref()));
            Ok(())
        }
    }
}

/// Resolve configuration into a platform set, then run one update.
///
/// Every configuration problem surfaces here, before any request is sent.
async fn run_command(config: &AppConfig, dry_run: bool) -> anyhow::Result<()> {
    let handles = load_handles(&config.handles_path)?;
    let registry = ExtractorRegistry::builtin(config.max_reasonable_count);
    let platforms = registry.resolve(&handles.handles)?;
    if platforms.is_empty() {
        anyhow::bail!(
            "no handles configured in {}",
            config.handles_path.display()
        );
    }

    let client = StatsClient::new(
        std::time::Duration::from_secs(config.request_timeout_secs),
        &config.user_agent,
    )?;
    let store = SnapshotStore::new(&config.snapshot_path);

    let report =
        update::run_update(&client, &platforms, &store, config, config.today(), dry_run).await?;

    print!(
        "{}",
        render::run_summary(
            &report,
            std::time::Duration::from_secs(config.slow_fetch_secs),
            config.stagnant_days,
        )
    );
    Ok(())
}
