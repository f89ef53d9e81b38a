//! WAT archive reading and extraction.
//!
//! A WAT file is a gzip-framed WARC container whose metadata records carry
//! JSON envelopes describing crawled pages. This module turns an archive
//! plus a list of requested byte offsets into extracted records:
//!
//! - [`record`]: the data model (offset entries, archive groups, extracted
//!   records) and the WAT envelope constants
//! - [`parser`]: decoding candidate bytes into records
//! - [`reader`]: sequential WARC record framing over a compressed stream
//! - [`extractor`]: per-archive strategy selection between targeted range
//!   reads and a full sequential scan, with retry on open
//!
//! Range reads avoid transferring multi-gigabyte shards but only work when
//! the archive's gzip members line up with the indexed offsets; the
//! extractor falls back to scanning the whole archive the moment a range
//! read misbehaves.

mod extractor;
mod parser;
mod reader;
mod record;

pub use extractor::ArchiveExtractor;
pub use parser::{ParseOutcome, parse_range_bytes, record_from_envelope};
pub use reader::{WarcReader, WarcRecord};
pub use record::{ArchiveGroup, ExtractedRecord, OffsetEntry, RESPONSE_CONTENT_TYPE};
