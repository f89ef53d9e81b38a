use thiserror::Error;

/// Errors surfaced by the library.
///
/// Per-entry failures during range reads (a failed fetch, bytes that do not
/// decode as a record) are not errors at this level: they are absorbed by the
/// extractor's fallback to a full sequential scan. Only input validation and
/// whole-archive failures escape.
#[derive(Debug, Error)]
pub enum Error {
    /// The query results are missing a required column or carry a malformed
    /// value. Fatal: no extraction work is dispatched.
    #[error("invalid query results: {0}")]
    Validation(String),

    /// An archive could not be opened for sequential scanning after
    /// exhausting retries. Recorded per archive, not fatal to the run.
    #[error("failed to open {location}: {source}")]
    StreamOpen {
        location: String,
        #[source]
        source: anyhow::Error,
    },

    /// The output sink rejected a batch. Fatal: records would be lost.
    #[error("sink error: {0}")]
    Sink(#[source] anyhow::Error),
}
