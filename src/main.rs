//! Main entry point for the watrange CLI application.
//!
//! Loads query results, groups them into per-archive work units, runs the
//! extraction pipeline against the public archive store, and reports what
//! was extracted and which archives failed.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use watrange::{
    Cli, HttpObjectStore, ParquetSink, Pipeline, PipelineConfig, RetryPolicy, query,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let rows = query::read_rows(
        File::open(&cli.query_results)
            .with_context(|| format!("open query results {}", cli.query_results.display()))?,
    )?;
    let targets = cli.filter_targets.then(|| query::target_urls(&rows));
    let groups = query::group_rows(&rows)?;
    if groups.is_empty() {
        eprintln!("No archives referenced by the query results; nothing to do.");
        return Ok(());
    }

    let store = Arc::new(HttpObjectStore::new()?);
    let pipeline = Pipeline::new(
        store.clone(),
        PipelineConfig {
            max_workers: cli.max_workers,
            flush_threshold: cli.flush_threshold,
            use_range_reads: !cli.no_range_reads,
            retry: RetryPolicy {
                max_retries: cli.retries,
                base_backoff: Duration::from_millis(cli.backoff_ms),
            },
        },
    );

    let mut sink = ParquetSink::new(&cli.out_dir)?;
    let summary = pipeline.run(groups, targets, &mut sink).await?;

    // Run summary: extracted counts, network usage, failed archives.
    println!(
        "Extracted {} records in {} batches to {}",
        summary.records,
        summary.batches,
        cli.out_dir.display()
    );
    eprintln!(
        "Total bytes transferred: {}",
        format_size(store.transferred_bytes())
    );
    if !summary.failures.is_empty() {
        eprintln!("{} archives failed:", summary.failures.len());
        for failure in &summary.failures {
            eprintln!("  {}: {}", failure.location, failure.error);
        }
    }

    Ok(())
}

/// Format a byte size into a human-readable string.
///
/// Automatically selects the appropriate unit (bytes, KB, MB, GB)
/// based on the size magnitude.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
