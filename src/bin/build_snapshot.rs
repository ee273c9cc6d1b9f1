use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use stockbot::application::ml::sequence_windower::SequenceWindower;
use stockbot::application::ml::snapshot_builder::SnapshotBuilder;
use stockbot::config::Config;
use stockbot::domain::market::earnings::EarningsEvents;
use stockbot::domain::market::series::RawSeries;
use stockbot::domain::ml::normalizer::ScalerParams;
use stockbot::domain::ml::snapshot::Snapshot;
use stockbot::domain::ports::{EarningsCalendar, MarketDataService};
use stockbot::infrastructure::earnings_calendar::JsonEarningsCalendar;
use stockbot::infrastructure::mock::{MockMarketDataService, synthetic_bars};
use stockbot::infrastructure::AlpacaDailyBarService;
use stockbot::infrastructure::persistence::{ScalerStore, SnapshotStore};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Build the offline feature snapshot and scaler parameters",
    long_about = None
)]
struct Cli {
    /// Symbol to build (overrides STOCK_SYMBOL)
    #[arg(short, long)]
    symbol: Option<String>,

    /// History start date, YYYY-MM-DD (overrides START_DATE)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last date of the history, YYYY-MM-DD (overrides END_DATE)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Write the scaled training matrix of the configured columns to this CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Use a seeded synthetic price walk instead of the Alpaca API
    #[arg(long)]
    synthetic: bool,

    /// Seed of the synthetic price walk
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    if let Err(e) = run(Cli::parse()).await {
        error!("build_snapshot failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(symbol) = cli.symbol {
        config.feature.stock_symbol = symbol;
    }
    if let Some(start) = cli.start {
        config.feature.start_date = start;
    }
    if let Some(end) = cli.end {
        config.feature.end_date = end;
    }
    let model = config.model_config()?;
    let symbol = model.stock_symbol().to_string();

    let market: Arc<dyn MarketDataService> = if cli.synthetic {
        let days = (model.end_date() - model.start_date()).num_days().max(0) as usize + 1;
        let bars = synthetic_bars(&symbol, model.start_date(), days, cli.seed)
            .into_iter()
            .filter(|c| c.date <= model.end_date())
            .collect();
        Arc::new(MockMarketDataService::new(bars))
    } else {
        if !config.alpaca.has_credentials() {
            warn!("ALPACA_API_KEY / ALPACA_SECRET_KEY not set, requests will likely be rejected");
        }
        Arc::new(AlpacaDailyBarService::new(&config.alpaca, &config.http))
    };

    info!(
        "Fetching daily bars for {} from {} to {}",
        symbol,
        model.start_date(),
        model.end_date()
    );
    let candles = market
        .get_daily_bars(&symbol, model.start_date(), model.end_date())
        .await
        .with_context(|| format!("Failed to fetch daily bars for {}", symbol))?;
    let series = RawSeries::new(symbol.clone(), candles)?;

    let calendar = JsonEarningsCalendar::new(config.data_dir.clone());
    let earnings = if calendar.path_for(&symbol).exists() {
        calendar.earnings_history(&symbol).await?
    } else {
        warn!(
            "No earnings file at {:?}, earnings column will be zero",
            calendar.path_for(&symbol)
        );
        EarningsEvents::empty()
    };

    let builder = SnapshotBuilder::new();
    let matrix = builder.derive(&series, Arc::new(earnings))?;
    let snapshot = Snapshot::from_matrix(symbol.clone(), &matrix)?;
    SnapshotStore::for_symbol(&config.data_dir, &symbol).save(&snapshot)?;

    let selected = matrix.select(model.columns())?;
    let scaler = ScalerParams::fit(&selected, config.feature.degenerate_policy)?;
    for key in model.columns() {
        if scaler.is_passthrough(key.name()) {
            warn!("Column '{}' has zero range and is left unscaled", key);
        }
    }
    ScalerStore::for_symbol(&config.data_dir, &symbol).save(&scaler)?;

    let scaled = scaler.scale_matrix(&selected)?;
    match SequenceWindower::new(model.num_days()).sequences(&scaled) {
        Ok(sequences) => info!(
            "{} training sequences of {} days available",
            sequences.len(),
            model.num_days()
        ),
        Err(e) => warn!("No training sequences: {}", e),
    }

    if let Some(path) = cli.csv {
        let file =
            File::create(&path).with_context(|| format!("Failed to create CSV file {:?}", path))?;
        scaled.write_csv(file)?;
        info!("Wrote {} rows to {:?}", scaled.nrows(), path);
    }

    Ok(())
}
