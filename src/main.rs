//! mactop-report CLI

use std::io::IsTerminal;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use mactop_report::{
    render_dashboard, render_plain, AnalysisEngine, AnalysisError, Companion, CsvSampleStore,
    DateRange, RecordingSession, ReportConfig,
};

#[derive(Parser)]
#[command(name = "mactop-report")]
#[command(about = "Record and analyze mactop hardware usage", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record samples until Ctrl+C
    Record {
        /// mactop metrics port
        #[arg(short, long)]
        port: Option<u16>,

        /// Seconds between samples
        #[arg(short, long)]
        interval: Option<f64>,

        /// Samples buffered before each write
        #[arg(long)]
        batch_size: Option<usize>,

        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Fail instead of starting mactop when it is not running
        #[arg(long)]
        no_launch: bool,
    },

    /// Analyze recorded samples
    Analyze {
        /// First day (YYYY-MM-DD); today when no dates are given
        #[arg(short, long)]
        start_date: Option<NaiveDate>,

        /// Last day (YYYY-MM-DD)
        #[arg(short, long)]
        end_date: Option<NaiveDate>,

        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Metrics to analyze, comma separated
        #[arg(short, long, value_delimiter = ',')]
        metrics: Option<Vec<String>>,

        /// Print the result bundle as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show configuration
    Config {
        /// Write the default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

const EXIT_NO_DATA: i32 = 2;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.clone().unwrap_or_else(ReportConfig::default_path);
    let mut config = ReportConfig::load_or_default(&config_path)?;

    match cli.command {
        Commands::Record {
            port,
            interval,
            batch_size,
            data_dir,
            no_launch,
        } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(interval) = interval {
                config.interval_secs = interval;
            }
            if let Some(batch_size) = batch_size {
                config.batch_size = batch_size;
            }
            if no_launch {
                config.launch_companion = false;
            }
            let data_dir = config.resolve_data_dir(data_dir.as_deref());
            record(&config, data_dir).await?;
        }

        Commands::Analyze {
            start_date,
            end_date,
            data_dir,
            metrics,
            json,
        } => {
            let range = DateRange::resolve(start_date, end_date);
            let data_dir = config.resolve_data_dir(data_dir.as_deref());
            let engine = AnalysisEngine::new(config.analysis(), CsvSampleStore::new(data_dir));

            let bundle = match engine.analyze(Some(range), metrics.as_deref()) {
                Ok(bundle) => bundle,
                Err(AnalysisError::NoData { .. }) => {
                    eprintln!("No data for this range ({})", range);
                    std::process::exit(EXIT_NO_DATA);
                }
                Err(e) => return Err(e.into()),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&bundle)?);
            } else if std::io::stdout().is_terminal() {
                print!("{}", render_dashboard(&bundle));
            } else {
                print!("{}", render_plain(&bundle));
            }
        }

        Commands::Config { init } => {
            if init {
                if config_path.exists() {
                    println!("Config already exists: {}", config_path.display());
                } else {
                    ReportConfig::default().save(&config_path)?;
                    println!("Wrote default config to {}", config_path.display());
                }
            }
            println!("Config file: {}", config_path.display());
            println!("Data dir:    {}", config.resolve_data_dir(None).display());
            println!();
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

async fn record(config: &ReportConfig, data_dir: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let store = CsvSampleStore::open(data_dir)?;
    let mut session = RecordingSession::from_config(config, store)?;

    let mut companion = None;
    if !session.client().is_available().await {
        if !config.launch_companion {
            return Err(format!(
                "mactop is not serving on port {} (start it with `sudo mactop -p {}`)",
                config.port, config.port
            )
            .into());
        }
        info!("mactop not reachable on port {}, launching it", config.port);
        companion = Some(
            Companion::launch(session.client(), config.port, config.companion_refresh_ms).await?,
        );
    }

    println!("Recording... press Ctrl+C to stop");
    let result = session.run().await;

    if let Some(companion) = companion {
        if let Err(e) = companion.terminate().await {
            warn!("{}", e);
        }
    }

    let stats = result?;
    println!(
        "Recorded {} samples ({} rows written, {} failed requests)",
        stats.samples_recorded, stats.rows_written, stats.fetch_failures
    );
    Ok(())
}
