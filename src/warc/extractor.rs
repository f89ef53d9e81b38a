//! Per-archive extraction: range-read strategy with full-scan fallback.
//!
//! For one archive group the extractor either fetches each requested byte
//! range individually or scans the whole archive sequentially. Range reads
//! are cheap but fragile: the offsets come from an external index and a
//! fetch can land inside a compressed block. The first failed fetch or
//! undecodable blob abandons the strategy for the archive and discards any
//! range results already collected, because one bad read means the archive's
//! compression framing cannot be trusted at any offset.

use std::collections::HashSet;
use std::io::Read;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use super::parser::{self, ParseOutcome};
use super::reader::WarcReader;
use super::record::{ArchiveGroup, ExtractedRecord};
use crate::error::Error;
use crate::io::ObjectStore;
use crate::retry::RetryPolicy;

pub struct ArchiveExtractor<S> {
    store: Arc<S>,
    retry: RetryPolicy,
    use_range_reads: bool,
}

impl<S: ObjectStore + 'static> ArchiveExtractor<S> {
    pub fn new(store: Arc<S>, retry: RetryPolicy, use_range_reads: bool) -> Self {
        Self {
            store,
            retry,
            use_range_reads,
        }
    }

    /// Extract the requested records from one archive.
    ///
    /// Entries are visited in ascending offset order. The result may cover
    /// fewer entries than requested; that is not an error. An `Err` means
    /// the archive could not be read at all (after retries) and should be
    /// recorded as a per-archive failure by the caller.
    pub async fn extract(
        &self,
        group: &ArchiveGroup,
        targets: Option<&HashSet<String>>,
    ) -> Result<Vec<ExtractedRecord>> {
        if group.entries.is_empty() {
            return Ok(Vec::new());
        }

        if self.use_range_reads {
            debug!(
                "attempting range reads for {} with {} offsets",
                group.location,
                group.entries.len()
            );
            if let Some(records) = self.try_range_reads(group).await {
                return Ok(records);
            }
            info!("range reads abandoned for {}, scanning whole archive", group.location);
        }

        self.full_scan(group, targets).await
    }

    /// Attempt the range-read strategy for every entry of the group.
    ///
    /// `None` means the strategy was abandoned: a fetch failed, returned no
    /// data, or produced bytes that do not decode as a record. All partial
    /// results are discarded with it; the caller must fall back to a full
    /// scan so the archive's records come from one strategy only.
    async fn try_range_reads(&self, group: &ArchiveGroup) -> Option<Vec<ExtractedRecord>> {
        let mut records = Vec::new();
        for entry in &group.entries {
            let end = entry.offset + entry.length.saturating_sub(1);
            let data = match self
                .store
                .fetch_range(&group.location, entry.offset, end)
                .await
            {
                Ok(data) if !data.is_empty() => data,
                Ok(_) => {
                    debug!(
                        "range read returned no data for {} offset {}",
                        group.location, entry.offset
                    );
                    return None;
                }
                Err(e) => {
                    debug!(
                        "range read failed for {} offset {}: {e}",
                        group.location, entry.offset
                    );
                    return None;
                }
            };

            match parser::parse_range_bytes(&data, &entry.url, &group.location) {
                ParseOutcome::Record(record) => records.push(record),
                ParseOutcome::Skip => {}
                ParseOutcome::Failure => {
                    debug!(
                        "range read for {} offset {} did not contain a parsable record",
                        group.location, entry.offset
                    );
                    return None;
                }
            }
        }
        Some(records)
    }

    /// Open the archive as a decompressed stream and scan it front to back.
    ///
    /// The open is wrapped in the retry policy; the scan itself runs on a
    /// blocking thread since decompression and record framing are
    /// synchronous.
    async fn full_scan(
        &self,
        group: &ArchiveGroup,
        targets: Option<&HashSet<String>>,
    ) -> Result<Vec<ExtractedRecord>> {
        let location = group.location.clone();
        let stream = self
            .retry
            .run(&format!("open {location}"), || {
                self.store.open_stream(&group.location)
            })
            .await
            .map_err(|source| Error::StreamOpen {
                location: location.clone(),
                source,
            })?;

        // Early exit is only sound when a finite target set bounds how many
        // matches the scan can produce.
        let limit = targets.map(|_| group.entries.len());
        let targets = targets.cloned();
        let records =
            tokio::task::spawn_blocking(move || scan_stream(stream, &location, targets, limit))
                .await??;
        Ok(records)
    }
}

/// Scan a compressed WARC stream, keeping metadata records that pass the
/// envelope checks and, when given, match the target URL set.
///
/// Damage encountered mid-stream (a broken gzip member, lost record
/// framing) ends the scan but keeps everything collected up to that point:
/// a partial result still answers part of the request, and only a complete
/// inability to read the archive is worth failing it for.
fn scan_stream(
    input: Box<dyn Read + Send>,
    location: &str,
    targets: Option<HashSet<String>>,
    limit: Option<usize>,
) -> Result<Vec<ExtractedRecord>> {
    let mut reader = WarcReader::new(input);
    let mut records = Vec::new();

    loop {
        let record = match reader.next_record() {
            Ok(Some(record)) => record,
            Ok(None) => break,
            Err(e) => {
                warn!(
                    "scan of {location} stopped early, keeping {} records: {e:#}",
                    records.len()
                );
                break;
            }
        };
        if record.warc_type() != Some("metadata") {
            continue;
        }
        if let Some(set) = &targets {
            match record.target_uri() {
                Some(uri) if set.contains(uri) => {}
                _ => continue,
            }
        }

        let doc: serde_json::Value = match serde_json::from_slice(&record.body) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("skipping undecodable record in {location}: {e}");
                continue;
            }
        };
        if let ParseOutcome::Record(extracted) =
            parser::record_from_envelope(&doc, record.target_uri(), location)
        {
            records.push(extracted);
        }

        if let Some(limit) = limit
            && records.len() >= limit
        {
            break;
        }
    }

    debug!("scan of {location} produced {} records", records.len());
    Ok(records)
}
