use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use std::fs::File;
use std::path::PathBuf;
use stockbot::application::bootstrap::build_rolling_cache;
use stockbot::config::Config;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Populate the feature window and optionally roll it forward",
    long_about = None
)]
struct Cli {
    /// Window end date, YYYY-MM-DD (overrides END_DATE)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Number of trading days to advance after population
    #[arg(short, long, default_value_t = 0)]
    advance: usize,

    /// Write the window to this CSV instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    if let Err(e) = run(Cli::parse()).await {
        error!("rolling_window failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(end) = cli.end {
        config.feature.end_date = end;
    }

    let cache = build_rolling_cache(&config)?;
    let mut window = cache.populate().await?;
    info!(
        "Window populated through {} ({})",
        window.cursor(),
        window.last_mode()
    );

    for _ in 0..cli.advance {
        let mode = cache.advance_next(&mut window).await?;
        info!("Advanced to {} ({})", window.cursor(), mode);
    }

    let input = window.to_input();
    info!("Predictor input shape {:?}", input.shape());

    let matrix = window.to_matrix()?;
    match cli.output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("Failed to create CSV file {:?}", path))?;
            matrix.write_csv(file)?;
        }
        None => matrix.write_csv(std::io::stdout().lock())?,
    }
    Ok(())
}
