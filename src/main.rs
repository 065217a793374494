mod batch_loader;
mod config;
mod cypher;
mod error;
mod graph_store;
mod model;
mod record_loader;
mod schema;
mod source;

use anyhow::{Context, Result};
use batch_loader::{BatchLoader, LoadReport, BATCH_SIZE};
use clap::Parser;
use config::Config;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

const CONNECT_RETRIES: u32 = 4;

/// Load paper / author / venue metadata from bulk search exports into Neo4j.
#[derive(Debug, Parser)]
#[command(name = "paper-graph-loader", version)]
struct Cli {
    /// JSON or JSON-Lines file, or a directory containing them
    #[arg(required_unless_present = "constraints_only")]
    path: Option<PathBuf>,

    /// Only create the uniqueness constraints, then exit
    #[arg(long)]
    constraints_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    info!("🚀 Paper graph loader starting...");

    // Load configuration
    let config = Config::from_env()?;
    let store = graph_store::connect_with_retry(&config, CONNECT_RETRIES).await?;

    schema::ensure_constraints(&store)
        .await
        .context("Failed to create uniqueness constraints")?;
    info!("✅ Uniqueness constraints in place");

    if cli.constraints_only {
        return Ok(());
    }

    let path = cli.path.context("No input path given")?;
    let files = source::collect_input_files(&path)?;
    let loader = BatchLoader::new(&store, BATCH_SIZE)?;

    let summary = ingest_files(&loader, &files).await;
    info!(
        "👋 Done: {} files ({} unreadable), {} papers loaded, {} failed, {} malformed",
        summary.files, summary.unreadable, summary.succeeded, summary.failed, summary.malformed
    );
    Ok(())
}

#[derive(Debug, Default, PartialEq)]
struct IngestSummary {
    files: usize,
    unreadable: usize,
    succeeded: usize,
    failed: usize,
    malformed: usize,
}

impl IngestSummary {
    fn add(&mut self, report: &LoadReport) {
        self.succeeded += report.succeeded();
        self.failed += report.failed();
        self.malformed += report.malformed();
    }
}

/// Load every file in turn. Unreadable files and failed records are logged
/// and never abort the run.
async fn ingest_files(loader: &BatchLoader<'_>, files: &[PathBuf]) -> IngestSummary {
    let mut summary = IngestSummary::default();

    for file in files {
        summary.files += 1;
        match ingest_file(loader, file).await {
            Ok(report) => summary.add(&report),
            Err(e) => {
                error!("❌ {:?}", e);
                summary.unreadable += 1;
            }
        }
    }

    summary
}

async fn ingest_file(loader: &BatchLoader<'_>, file: &Path) -> Result<LoadReport> {
    let records = source::read_records(file)?;
    info!("📝 Loading {} records from {:?} (batch_size={})", records.len(), file, loader.batch_size());

    let report = loader.load(records).await;
    if report.failed() > 0 {
        let ids: Vec<&str> = report.failed_paper_ids().collect();
        warn!("⚠️  {:?}: {} papers failed: {}", file, ids.len(), ids.join(", "));
    }
    info!(
        "💾 {:?}: {} loaded, {} failed, {} malformed",
        file,
        report.succeeded(),
        report.failed(),
        report.malformed()
    );
    Ok(report)
}
