//! Sportsbook moneyline arbitrage scanner entry point.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sports_arb::api::{create_router, AppState};
use sports_arb::arbitrage::Opportunity;
use sports_arb::config::Config;
use sports_arb::metrics;
use sports_arb::odds::{OddsApiClient, OddsSource};
use sports_arb::scheduler::{
    RefreshScheduler, RefreshSettings, SnapshotStore, SportFetch, TopOpportunityLogger,
};
use sports_arb::utils::{round_for_display, shutdown_signal};

/// Sportsbook moneyline arbitrage scanner.
#[derive(Parser, Debug)]
#[command(name = "sports-arb")]
#[command(about = "Scan sportsbook moneyline odds for cross-bookmaker arbitrage")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true, env = "VERBOSE")]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the refresh scheduler and HTTP API (default).
    Run {
        /// HTTP server port.
        #[arg(short, long)]
        port: Option<u16>,

        /// Seconds between refresh cycles.
        #[arg(short, long)]
        interval: Option<u64>,

        /// Sort order: time, margin or profit.
        #[arg(short, long)]
        sort: Option<String>,

        /// Minimum profit percent to publish.
        #[arg(long)]
        min_profit: Option<Decimal>,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Run one refresh cycle and print the ranked opportunities.
    Scan {
        /// Sort order: time, margin or profit.
        #[arg(short, long)]
        sort: Option<String>,

        /// Minimum profit percent to print.
        #[arg(long)]
        min_profit: Option<Decimal>,
    },

    /// Fetch raw odds for every configured sport and write them to a file.
    FetchOdds {
        /// Output file.
        #[arg(short, long, default_value = "odds.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("sports_arb=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Handle subcommands
    match args.command {
        Some(Command::CheckConfig) => cmd_check_config().await,
        Some(Command::Scan { sort, min_profit }) => cmd_scan(sort, min_profit).await,
        Some(Command::FetchOdds { output }) => cmd_fetch_odds(output).await,
        Some(Command::Run {
            port,
            interval,
            sort,
            min_profit,
        }) => cmd_run(port, interval, sort, min_profit).await,
        None => cmd_run(None, None, None, None).await,
    }
}

/// Load and validate configuration, logging failures.
fn load_config() -> anyhow::Result<Config> {
    info!("Loading configuration...");
    let config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Err(e) = config.validate() {
        error!("{}", e);
        return Err(e.into());
    }

    Ok(config)
}

/// Apply CLI overrides on top of environment configuration.
fn apply_overrides(
    config: &mut Config,
    interval: Option<u64>,
    sort: Option<String>,
    min_profit: Option<Decimal>,
) -> anyhow::Result<()> {
    if let Some(interval) = interval {
        config.refresh_interval_secs = interval;
    }
    if let Some(sort) = sort {
        config.sort_by = sort;
    }
    if let Some(min_profit) = min_profit {
        config.min_profit_percent = min_profit;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid command line override: {}", e))
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("SPORTS ARB SCANNER - CONFIGURATION CHECK");
    println!("======================================================================");

    // Load configuration
    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    // Validate configuration
    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    // Show configuration summary
    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Odds API: {}", config.odds_api_url);
    println!("  Sports: {}", config.sport_keys().join(", "));
    println!("  Regions: {}", config.regions);
    println!("  Deep Links: {}", if config.include_links { "Enabled" } else { "Disabled" });
    println!("  Refresh Interval: {}s", config.refresh_interval_secs);
    println!("  Fetch Timeout: {}s", config.fetch_timeout_secs);
    println!("  Sort: {}", config.sort_key());
    println!("  Min Profit: {}%", config.min_profit_percent);
    println!("  Port: {}", config.port);
    println!("  Metrics: {}", if config.metrics_enabled { "Enabled" } else { "Disabled" });
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Run one cycle and print the ranked opportunities.
async fn cmd_scan(sort: Option<String>, min_profit: Option<Decimal>) -> anyhow::Result<()> {
    let mut config = load_config()?;
    apply_overrides(&mut config, None, sort, min_profit)?;

    let scheduler = RefreshScheduler::new(
        Arc::new(OddsApiClient::new(&config)),
        Arc::new(SnapshotStore::new()),
        RefreshSettings::from_config(&config),
    );

    let report = scheduler.run_cycle().await?;
    let snapshot = scheduler.store().current();

    println!("======================================================================");
    println!("SPORTS ARB SCANNER - SCAN (sorted by {})", config.sort_key());
    println!("======================================================================");
    println!(
        "Sports: {} ok, {} failed | Events: {} ({} skipped) | {}ms",
        report.sports_ok.len(),
        report.sports_failed.len(),
        report.events_seen,
        report.events_skipped,
        report.elapsed_ms
    );
    for failure in &report.sports_failed {
        println!("  FAILED {}: {}", failure.sport, failure.reason);
    }
    println!("----------------------------------------------------------------------");

    if snapshot.opportunities.is_empty() {
        println!("No arbitrage opportunities found.");
    }
    for (i, opp) in snapshot.opportunities.iter().enumerate() {
        print_opportunity(i + 1, opp);
    }

    println!("======================================================================");

    if report.all_sources_failed {
        return Err(anyhow::anyhow!("All odds sources failed"));
    }
    Ok(())
}

fn print_opportunity(rank: usize, opp: &Opportunity) {
    println!(
        "{:>3}. [{}] {} vs {} @ {}",
        rank, opp.sport, opp.home_team, opp.away_team, opp.start_time
    );
    println!(
        "     {} {} @ {}  |  {} {} @ {}",
        opp.outcome_a.outcome,
        opp.outcome_a.price,
        opp.outcome_a.bookmaker,
        opp.outcome_b.outcome,
        opp.outcome_b.price,
        opp.outcome_b.bookmaker
    );
    println!(
        "     Margin: {}%  Profit: {}%",
        round_for_display(opp.margin_percent),
        round_for_display(opp.profit_percent)
    );
}

/// Fetch raw odds for every configured sport and write them as JSON.
async fn cmd_fetch_odds(output: PathBuf) -> anyhow::Result<()> {
    let config = load_config()?;
    let scheduler = RefreshScheduler::new(
        Arc::new(OddsApiClient::new(&config)),
        Arc::new(SnapshotStore::new()),
        RefreshSettings::from_config(&config),
    );

    let start = Instant::now();
    let mut all_records: Vec<Value> = Vec::new();
    for fetch in scheduler.fetch_all().await {
        match fetch {
            SportFetch::Fetched { sport, records } => {
                info!(sport = %sport, events = records.len(), "Fetched odds");
                all_records.extend(records);
            }
            SportFetch::Failed { sport, error } => {
                warn!(sport = %sport, "Failed to fetch odds: {}", error);
            }
        }
    }

    let json = serde_json::to_string_pretty(&all_records)?;
    tokio::fs::write(&output, json).await?;
    info!(
        events = all_records.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Wrote odds to {}",
        output.display()
    );

    Ok(())
}

/// Run the refresh scheduler and serve the HTTP API until shutdown.
async fn cmd_run(
    port: Option<u16>,
    interval: Option<u64>,
    sort: Option<String>,
    min_profit: Option<Decimal>,
) -> anyhow::Result<()> {
    let mut config = load_config()?;
    apply_overrides(&mut config, interval, sort, min_profit)?;
    let port = port.unwrap_or(config.port);

    info!("Configuration loaded successfully");
    info!("Sports: {}", config.sport_keys().join(", "));
    info!("Refresh interval: {}s", config.refresh_interval_secs);
    info!("Sort: {}", config.sort_key());
    info!("Min profit: {}%", config.min_profit_percent);

    // Initialize metrics
    let prometheus = if config.metrics_enabled {
        let handle = metrics::install_prometheus();
        metrics::init_metrics();
        handle
    } else {
        None
    };

    // Snapshot store and scheduler
    let source: Arc<dyn OddsSource> = Arc::new(OddsApiClient::new(&config));
    let store = Arc::new(SnapshotStore::new());
    store.add_sink(Arc::new(TopOpportunityLogger))?;
    let scheduler = Arc::new(RefreshScheduler::new(
        source,
        store,
        RefreshSettings::from_config(&config),
    ));

    // Create app state
    let app_state = AppState::new(scheduler.clone()).with_prometheus(prometheus);

    // Start HTTP server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(app_state);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut server_shutdown = shutdown_tx.subscribe();

    // Spawn HTTP server
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.wait_for(|stop| *stop).await;
            })
            .await
    });

    let scheduler_handle = tokio::spawn(scheduler.run(shutdown_rx));

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    if let Err(e) = scheduler_handle.await {
        error!("Scheduler task failed: {}", e);
    }
    match server_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("HTTP server error: {}", e),
        Err(e) => error!("HTTP server task failed: {}", e),
    }

    info!("Shutdown complete");
    Ok(())
}
