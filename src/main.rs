use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info, warn};

use channel_insight::config::AppConfig;
use channel_insight::export::{export_to_timestamped_dir, ExportFormat};
use channel_insight::forecast::forecast;
use channel_insight::harvest::{CancellationFlag, Progress, ProgressFn};
use channel_insight::logging::{init_logging, OperationTimer};
use channel_insight::metrics::MetricsCollector;
use channel_insight::service::AnalysisService;
use channel_insight::store::ResultStore;
use channel_insight::validation::InputValidator;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Write logs to this file as well (daily rotation)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ProjectKey {
    /// Owning user id
    #[arg(short, long)]
    user: String,

    /// Project id
    #[arg(short, long)]
    project: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a channel or video and store the result
    Analyze {
        #[command(flatten)]
        key: ProjectKey,

        /// Channel URL, @handle, channel id or video URL
        reference: String,

        /// Maximum number of videos to collect
        #[arg(long)]
        max_videos: Option<usize>,

        /// Only collect videos published within this many days
        #[arg(long)]
        lookback_days: Option<i64>,

        /// Videos harvested concurrently
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Forecast trends from the stored history of a project
    Predict {
        #[command(flatten)]
        key: ProjectKey,
    },
    /// Print the current stored result
    Show {
        #[command(flatten)]
        key: ProjectKey,
    },
    /// Summarize every stored result, oldest first
    History {
        #[command(flatten)]
        key: ProjectKey,
    },
    /// Invalidate the current stored result
    Clear {
        #[command(flatten)]
        key: ProjectKey,
    },
    /// Export the current stored result
    Export {
        #[command(flatten)]
        key: ProjectKey,

        /// Output format (json or csv)
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Output directory
        #[arg(short, long, default_value = "./output")]
        output_dir: String,
    },
    /// Write a starter configuration file
    InitConfig {
        /// Destination path
        #[arg(long, default_value = "config/local.yaml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let mut config = AppConfig::load()?;

    // Initialize logging
    let log_file = cli
        .log_file
        .clone()
        .or_else(|| config.logging.file_path.as_ref().map(PathBuf::from));
    let _guard = init_logging(
        Some(config.get_log_level().as_str()),
        log_file.as_deref(),
        config.logging.format == "json",
    )?;
    if let Err(e) = MetricsCollector::init() {
        warn!(error = %e, "Metrics recorder not installed");
    }

    info!("Starting channel-insight");

    let outcome = match cli.command {
        Commands::Analyze {
            key,
            reference,
            max_videos,
            lookback_days,
            concurrency,
        } => {
            if let Some(max_videos) = max_videos {
                InputValidator::validate_max_videos(max_videos)?;
                config.collection.max_videos = max_videos;
            }
            if let Some(days) = lookback_days {
                InputValidator::validate_lookback_days(days)?;
                config.collection.lookback_days = days;
            }
            if let Some(concurrency) = concurrency {
                config.collection.concurrency = concurrency.max(1);
            }
            analyze(&config, &key, &reference).await
        }
        Commands::Predict { key } => predict(&config, &key).await,
        Commands::Show { key } => show(&config, &key).await,
        Commands::History { key } => history(&config, &key).await,
        Commands::Clear { key } => clear(&config, &key).await,
        Commands::Export {
            key,
            format,
            output_dir,
        } => export(&config, &key, &format, Path::new(&output_dir)).await,
        Commands::InitConfig { path } => init_config(&config, &path),
    };

    if let Err(e) = &outcome {
        error!(error = %e, "Command failed");
    }
    outcome
}

/// Print a value as pretty JSON on stdout
#[allow(clippy::print_stdout)]
fn emit<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_store(config: &AppConfig) -> Result<Arc<dyn ResultStore>> {
    AnalysisService::open_store(&config.store.path)
        .with_context(|| format!("Failed to open result store at {}", config.store.path))
}

fn validate_key(key: &ProjectKey) -> Result<()> {
    InputValidator::validate_identifier("user", &key.user)?;
    InputValidator::validate_identifier("project", &key.project)
}

/// Run the full pipeline
async fn analyze(config: &AppConfig, key: &ProjectKey, reference: &str) -> Result<()> {
    let timer = OperationTimer::new("analyze");
    let service = AnalysisService::from_config(config)?;

    let cancel = CancellationFlag::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing current videos");
            on_signal.cancel();
        }
    });

    let callback: ProgressFn = Arc::new(|percent: u8, message: &str| {
        info!(percent, "{}", message);
    });
    let result = service
        .run(&key.user, &key.project, reference, &Progress::new(Some(callback)), &cancel)
        .await?;

    for diagnostic in result.diagnostics.entries() {
        warn!(kind = ?diagnostic.kind, stage = %diagnostic.stage, "{}", diagnostic.message);
    }
    emit(&result)?;
    timer.finish();
    Ok(())
}

async fn predict(config: &AppConfig, key: &ProjectKey) -> Result<()> {
    validate_key(key)?;
    let store = open_store(config)?;
    let history = store.history(&key.user, &key.project).await?;
    info!(points = history.len(), "Forecasting from stored history");
    emit(&forecast(&history))
}

async fn show(config: &AppConfig, key: &ProjectKey) -> Result<()> {
    validate_key(key)?;
    let store = open_store(config)?;
    match store.load(&key.user, &key.project).await? {
        Some(result) => emit(&result),
        None => {
            warn!(user = %key.user, project = %key.project, "No stored result");
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct HistoryEntry {
    created_at: chrono::DateTime<chrono::Utc>,
    reference: String,
    videos: usize,
    total_comments: usize,
    sentiment_score: f64,
    communities: usize,
    partial: bool,
}

async fn history(config: &AppConfig, key: &ProjectKey) -> Result<()> {
    validate_key(key)?;
    let store = open_store(config)?;
    let entries: Vec<HistoryEntry> = store
        .history(&key.user, &key.project)
        .await?
        .into_iter()
        .map(|r| HistoryEntry {
            created_at: r.created_at,
            reference: r.reference,
            videos: r.videos.len(),
            total_comments: r.total_comments,
            sentiment_score: r.sentiment.overall_score,
            communities: r.communities.total_communities,
            partial: r.partial,
        })
        .collect();
    emit(&entries)
}

async fn clear(config: &AppConfig, key: &ProjectKey) -> Result<()> {
    validate_key(key)?;
    let store = open_store(config)?;
    store.clear(&key.user, &key.project).await?;
    info!(user = %key.user, project = %key.project, "Cleared current result");
    Ok(())
}

async fn export(config: &AppConfig, key: &ProjectKey, format: &str, output_dir: &Path) -> Result<()> {
    validate_key(key)?;
    let format: ExportFormat = format.parse()?;
    let store = open_store(config)?;
    let result = store
        .load(&key.user, &key.project)
        .await?
        .with_context(|| format!("No stored result for {}/{}", key.user, key.project))?;

    let timestamp = result.created_at.format("%Y-%m-%d_%H-%M-%S").to_string();
    let files = export_to_timestamped_dir(&result, format, output_dir, &timestamp)?;
    for file in &files {
        info!(path = %file.display(), "Exported");
    }
    Ok(())
}

fn init_config(config: &AppConfig, path: &Path) -> Result<()> {
    if path.exists() {
        return Err(anyhow::anyhow!("{} already exists", path.display()));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, config.to_yaml()?)?;
    info!(path = %path.display(), "Wrote starter configuration");
    Ok(())
}
