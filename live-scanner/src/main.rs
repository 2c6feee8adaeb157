use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use live_scanner::config::AppConfig;
use live_scanner::database::repositories::{
    ChannelRepository, SqlxChannelRepository, SqlxHistoryRepository, SqlxStatusRepository,
};
use live_scanner::database::{init_pool, run_migrations};
use live_scanner::domain::Channel;
use live_scanner::logging::init_logging;
use live_scanner::monitor::{
    ChannelChecker, CircuitBreaker, HttpStreamValidator, OutputClassifier, YtDlpDetector,
    YtDlpResolver, YtDlpRunner,
};
use live_scanner::scheduler::Scanner;
use live_scanner::utils::http_client::build_validation_client;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// SQLite database URL
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:live-scanner.db?mode=rwc"
    )]
    database_url: String,

    /// Check every due channel once and exit
    #[arg(long)]
    once: bool,

    /// Print the scanner status as JSON after a single pass
    #[arg(long, requires = "once")]
    status: bool,

    /// Log filter directive (RUST_LOG takes precedence)
    #[arg(long)]
    log_filter: Option<String>,

    /// Register a channel (id, @handle or URL) and exit
    #[arg(long, value_name = "REF")]
    add_channel: Option<String>,

    /// Display name for --add-channel
    #[arg(long, requires = "add_channel")]
    name: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let _logging = init_logging(args.log_filter.as_deref())?;

    let config = AppConfig::from_env_or_default();
    config.validate().context("Invalid configuration")?;

    info!(
        "Starting live-scanner v{} (database: {})",
        env!("CARGO_PKG_VERSION"),
        args.database_url
    );

    let pool = init_pool(&args.database_url)
        .await
        .with_context(|| format!("Failed to open database {}", args.database_url))?;
    run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    let channel_repo = Arc::new(SqlxChannelRepository::new(pool.clone()));

    if let Some(channel_ref) = args.add_channel {
        let name = args.name.unwrap_or_else(|| channel_ref.clone());
        let channel = Channel::new(name, channel_ref);
        channel_repo
            .create_channel(&channel)
            .await
            .context("Failed to register channel")?;
        println!("{}\t{}", channel.id, channel.live_url);
        return Ok(());
    }

    let classifier = Arc::new(OutputClassifier::default());
    let runner = YtDlpRunner::new(config.tool.clone(), classifier);
    let http_client = build_validation_client(&config.validator.user_agent, Duration::from_secs(5));

    let checker = Arc::new(ChannelChecker::new(
        Arc::new(YtDlpDetector::new(runner.clone())),
        Arc::new(YtDlpResolver::new(runner)),
        Arc::new(HttpStreamValidator::new(
            http_client,
            config.validator.clone(),
        )),
        Arc::new(CircuitBreaker::new(config.breaker.clone())),
        Arc::new(SqlxStatusRepository::new(pool.clone())),
        Arc::new(SqlxHistoryRepository::new(pool.clone())),
        config.retry.clone(),
    ));

    let scanner = Scanner::new(channel_repo, checker, config.scheduler.clone());

    if args.once {
        let count = scanner.run_once().await.context("Scan failed")?;
        if args.status {
            println!("{}", serde_json::to_string_pretty(&scanner.status())?);
        } else {
            println!("{count}");
        }
        pool.close().await;
        return Ok(());
    }

    scanner.start().await;

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");

    scanner.stop().await;
    pool.close().await;

    info!("live-scanner stopped");
    Ok(())
}
