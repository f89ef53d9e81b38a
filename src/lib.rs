//! # watrange
//!
//! Offset-guided record extraction from remote WAT archives.
//!
//! WAT files are gzip-framed containers of JSON metadata records describing
//! crawled web content, stored as multi-gigabyte shards in object storage.
//! Given a list of (offset, length, url) triples produced by an external
//! index query, this library pulls just the wanted records out of each
//! shard: it tries HTTP Range requests against the indexed offsets first,
//! and falls back to streaming and scanning the whole shard when the
//! compression framing defeats the range reads.
//!
//! ## Features
//!
//! - Targeted byte-range extraction with automatic full-scan fallback
//! - Sequential WARC record scanning over gzip-framed streams
//! - Bounded concurrent extraction across shards with chunked Parquet output
//! - Partial-failure reporting: one bad shard never aborts the run
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use watrange::{HttpObjectStore, MemorySink, Pipeline, PipelineConfig, query};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let rows = query::read_rows(std::fs::File::open("results.csv")?)?;
//!     let groups = query::group_rows(&rows)?;
//!
//!     let store = Arc::new(HttpObjectStore::new()?);
//!     let pipeline = Pipeline::new(store, PipelineConfig::default());
//!
//!     let mut sink = MemorySink::default();
//!     let summary = pipeline.run(groups, None, &mut sink).await?;
//!     println!("extracted {} records", summary.records);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod query;
pub mod retry;
pub mod sink;
pub mod warc;

pub use cli::Cli;
pub use error::Error;
pub use io::{HttpObjectStore, LocalObjectStore, ObjectStore};
pub use pipeline::{ArchiveFailure, Pipeline, PipelineConfig, RunSummary};
pub use retry::RetryPolicy;
pub use sink::{MemorySink, ParquetSink, RecordSink};
pub use warc::{ArchiveExtractor, ArchiveGroup, ExtractedRecord, OffsetEntry};
