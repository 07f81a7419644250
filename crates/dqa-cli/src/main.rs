//! dq-audit CLI
//!
//! The `dqa` command runs data-quality audits and inspects their results.
//!
//! ## Commands
//!
//! - `serve`: audit a dataset for a free-text request
//! - `plan`: print the checks a dataset would get, without running them
//! - `show`: print a persisted session record
//! - `sessions`: list persisted session ids
//! - `events`: print the event log of one session

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, Level};

use dqa_core::metrics::METRICS;
use dqa_core::{
    AuditConfig, AuditError, AuditService, CheckStatus, DatasetHandle, FsSessionStore,
    JsonlEventLog, Metric, Planner, Report, SessionId, SessionStore, StorageConfig, Table,
};

#[derive(Parser)]
#[command(name = "dqa")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Data-quality audit pipeline", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// TOML configuration file
    #[arg(short, long, global = true, env = "DQA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit a dataset on behalf of a free-text request
    Serve {
        /// Request text recorded with the session
        text: String,

        /// JSON table document to audit (default: built-in demo table)
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show the checks that would run for a dataset
    Plan {
        /// JSON table document (default: built-in demo table)
        #[arg(short, long)]
        dataset: Option<PathBuf>,
    },

    /// Print a persisted session record as JSON
    Show {
        /// Session id
        session_id: String,
    },

    /// List persisted session ids
    Sessions,

    /// Print the logged events of one session
    Events {
        /// Session id
        session_id: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    dqa_core::telemetry::init_tracing(cli.json, level);

    let result = match cli.command {
        Commands::Serve {
            text,
            dataset,
            format,
        } => cmd_serve(cli.config.as_deref(), &text, dataset.as_deref(), format)
            .await
            .map(|_| ()),
        Commands::Plan { dataset } => cmd_plan(cli.config.as_deref(), dataset.as_deref()),
        Commands::Show { session_id } => cmd_show(cli.config.as_deref(), &session_id).await,
        Commands::Sessions => cmd_sessions(cli.config.as_deref()).await.map(|_| ()),
        Commands::Events { session_id } => {
            cmd_events(cli.config.as_deref(), &session_id).map(|_| ())
        }
    };

    METRICS.flush();
    result
}

/// Configuration for a command. The built-in demo table is audited with the
/// demo bounds unless a config file says otherwise.
fn load_config(path: Option<&Path>, demo_dataset: bool) -> Result<AuditConfig> {
    if path.is_some() || !demo_dataset {
        return AuditConfig::load(path).context("Failed to load configuration");
    }
    let mut config = AuditConfig::demo();
    config
        .apply_overrides(|var| std::env::var(var).ok())
        .context("Failed to apply environment overrides")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn load_dataset(path: Option<&Path>) -> Result<Arc<dyn DatasetHandle>> {
    match path {
        Some(p) => {
            let table = Table::from_path(p)
                .with_context(|| format!("Failed to load dataset {}", p.display()))?;
            info!(path = %p.display(), rows = table.row_count(), "dataset loaded");
            Ok(Arc::new(table))
        }
        None => Ok(Arc::new(Table::demo())),
    }
}

fn persistent_store(config: &AuditConfig) -> Result<FsSessionStore> {
    match &config.storage {
        StorageConfig::Fs { root } => FsSessionStore::new(root)
            .with_context(|| format!("Failed to open session store at {}", root.display())),
        StorageConfig::Memory => bail!(
            "No persistent session store configured; set DQA_STORE_DIR or [storage] backend = \"fs\""
        ),
    }
}

/// Run one audit session
async fn cmd_serve(
    config_path: Option<&Path>,
    text: &str,
    dataset_path: Option<&Path>,
    format: OutputFormat,
) -> Result<SessionId> {
    let config = load_config(config_path, dataset_path.is_none())?;
    let dataset = load_dataset(dataset_path)?;
    let service =
        AuditService::from_config(&config, dataset).context("Failed to set up audit service")?;

    match service.serve_text_input(text).await {
        Ok(response) => {
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
                OutputFormat::Text => {
                    println!("session {}", response.session_id);
                    print_report(&response.report);
                    println!();
                    println!("{}", response.response);
                }
            }
            Ok(response.session_id)
        }
        Err(AuditError::Persistence {
            session_id,
            report,
            source,
        }) => {
            print_report(&report);
            Err(anyhow::Error::new(source)
                .context(format!("Audit of session {session_id} completed but was not saved")))
        }
        Err(e) => Err(e).context("Audit failed"),
    }
}

/// Print the plan for a dataset
fn cmd_plan(config_path: Option<&Path>, dataset_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path, dataset_path.is_none())?;
    let dataset = load_dataset(dataset_path)?;
    let metadata = dataset.metadata().context("Failed to read dataset schema")?;
    let plan = Planner::new(config.planner)
        .make_plan(&metadata)
        .context("Dataset schema rejected")?;

    println!("plan {} ({} checks)", plan.plan_id, plan.len());
    let digest = plan
        .checks_digest()
        .context("Failed to encode plan checks")?;
    println!("digest {digest}");
    for (i, check) in plan.checks.iter().enumerate() {
        println!(
            "  {:>2}. {:<15} {}",
            i + 1,
            check.name().as_str(),
            check.target_columns.join(", ")
        );
    }
    Ok(())
}

/// Print a stored session
async fn cmd_show(config_path: Option<&Path>, session_id: &str) -> Result<()> {
    let config = load_config(config_path, false)?;
    let store = persistent_store(&config)?;
    let record = store
        .load(&SessionId::from(session_id))
        .await
        .with_context(|| format!("Failed to load session '{session_id}'"))?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

#[derive(Serialize)]
struct SessionRow {
    session_id: SessionId,
    global_score: f64,
    checks: usize,
}

/// List stored sessions with their scores
async fn cmd_sessions(config_path: Option<&Path>) -> Result<Vec<SessionId>> {
    let config = load_config(config_path, false)?;
    let store = persistent_store(&config)?;
    let ids = store.list().await.context("Failed to list sessions")?;

    if ids.is_empty() {
        println!("No sessions found.");
        return Ok(ids);
    }

    for id in &ids {
        match store.load(id).await {
            Ok(record) => {
                let row = SessionRow {
                    session_id: id.clone(),
                    global_score: record.report.global_score,
                    checks: record.report.per_check.len(),
                };
                println!("{}", serde_json::to_string(&row)?);
            }
            Err(e) => eprintln!("{id}: unreadable ({e})"),
        }
    }
    Ok(ids)
}

/// Print the event log of one session
fn cmd_events(config_path: Option<&Path>, session_id: &str) -> Result<usize> {
    let config = load_config(config_path, false)?;
    let Some(path) = config.events_path else {
        bail!("No event log configured; set DQA_EVENTS_PATH or events_path in the config");
    };
    let events = JsonlEventLog::read_session(&path, &SessionId::from(session_id))
        .with_context(|| format!("Failed to read event log {}", path.display()))?;

    if events.is_empty() {
        println!("No events for session '{session_id}'");
    }
    for event in &events {
        let details = event
            .details
            .as_ref()
            .map(|d| format!(" {d}"))
            .unwrap_or_default();
        println!(
            "{} {:<13} {:<15} {}{}",
            event.timestamp.format("%H:%M:%S%.3f"),
            event.component.as_str(),
            event.event_type.as_str(),
            event.message,
            details
        );
    }
    Ok(events.len())
}

fn print_report(report: &Report) {
    for result in &report.per_check {
        let marker = match result.status {
            CheckStatus::Passed => "ok  ",
            CheckStatus::Failed => "FAIL",
            CheckStatus::Error => "ERR ",
        };
        let detail = match (&result.metric, &result.error_message) {
            (_, Some(message)) => message.clone(),
            (Some(Metric::Count(n)), None) => format!("{n}"),
            (Some(Metric::PerColumn(counts)), None) => counts
                .iter()
                .map(|(column, n)| format!("{column}={n}"))
                .collect::<Vec<_>>()
                .join(" "),
            (None, None) => String::new(),
        };
        println!(
            "  [{}] {:<15} {:<20} {}",
            marker,
            result.check.as_str(),
            result.target_columns.join(","),
            detail
        );
    }
    println!(
        "  {} passed, {} failed, {} errored",
        report.summary.passed, report.summary.failed, report.summary.errored
    );
}
