//! Concurrent extraction across archive groups with chunked flushing.
//!
//! One extraction task per archive runs in a bounded pool; completions are
//! consumed one at a time by the control loop, which owns the accumulation
//! buffer outright. Workers return their results instead of writing into
//! shared state, so no locking is needed around aggregation. The buffer is
//! drained to the sink in batches of exactly the flush threshold, plus one
//! final partial batch.

use std::collections::HashSet;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream;
use tracing::{info, warn};

use crate::error::Error;
use crate::io::ObjectStore;
use crate::retry::RetryPolicy;
use crate::sink::RecordSink;
use crate::warc::{ArchiveExtractor, ArchiveGroup, ExtractedRecord};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum archives processed concurrently.
    pub max_workers: usize,
    /// Records per flushed batch.
    pub flush_threshold: usize,
    /// Attempt range reads before falling back to full scans.
    pub use_range_reads: bool,
    /// Retry policy for opening archive streams.
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_workers: 8,
            flush_threshold: 2000,
            use_range_reads: true,
            retry: RetryPolicy::default(),
        }
    }
}

/// An archive that could not be read at all. Recorded, not fatal.
#[derive(Debug)]
pub struct ArchiveFailure {
    pub location: String,
    pub error: String,
}

/// What a run produced.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub records: usize,
    pub batches: usize,
    pub failures: Vec<ArchiveFailure>,
}

pub struct Pipeline<S> {
    extractor: Arc<ArchiveExtractor<S>>,
    max_workers: usize,
    flush_threshold: usize,
}

impl<S: ObjectStore + 'static> Pipeline<S> {
    pub fn new(store: Arc<S>, config: PipelineConfig) -> Self {
        Self {
            extractor: Arc::new(ArchiveExtractor::new(
                store,
                config.retry,
                config.use_range_reads,
            )),
            max_workers: config.max_workers.max(1),
            flush_threshold: config.flush_threshold.max(1),
        }
    }

    /// Extract all groups, flushing batches to `sink` as they fill up.
    ///
    /// Archives fail independently; a failed archive contributes zero
    /// records and one entry in the summary's failure list. Only validation
    /// and sink errors abort the run.
    pub async fn run<K: RecordSink>(
        &self,
        groups: Vec<ArchiveGroup>,
        targets: Option<HashSet<String>>,
        sink: &mut K,
    ) -> Result<RunSummary, Error> {
        let targets = targets.map(Arc::new);
        let mut summary = RunSummary::default();
        let mut buffer: Vec<ExtractedRecord> = Vec::new();

        info!("extracting from {} archives", groups.len());

        let mut completions = stream::iter(groups.into_iter().map(|group| {
            let extractor = Arc::clone(&self.extractor);
            let targets = targets.clone();
            async move {
                let result = extractor.extract(&group, targets.as_deref()).await;
                (group.location, result)
            }
        }))
        .buffer_unordered(self.max_workers);

        while let Some((location, result)) = completions.next().await {
            match result {
                Ok(records) => {
                    summary.records += records.len();
                    buffer.extend(records);
                    while buffer.len() >= self.flush_threshold {
                        let batch: Vec<_> = buffer.drain(..self.flush_threshold).collect();
                        sink.write_batch(&batch).map_err(Error::Sink)?;
                        summary.batches += 1;
                    }
                }
                Err(e) => {
                    warn!("archive {location} failed: {e:#}");
                    summary.failures.push(ArchiveFailure {
                        location,
                        error: format!("{e:#}"),
                    });
                }
            }
        }

        if !buffer.is_empty() {
            sink.write_batch(&buffer).map_err(Error::Sink)?;
            summary.batches += 1;
        }
        sink.finish().map_err(Error::Sink)?;

        info!(
            "run complete: {} records in {} batches, {} archives failed",
            summary.records,
            summary.batches,
            summary.failures.len()
        );
        Ok(summary)
    }
}
