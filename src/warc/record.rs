/// Expected content type for WAT metadata describing an HTTP response.
pub const RESPONSE_CONTENT_TYPE: &str = "application/http; msgtype=response";

/// One requested record position inside an archive.
///
/// Produced by the external query service; consumed read-only. Entries in a
/// group are assumed to cover non-overlapping byte spans of the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetEntry {
    /// Byte position of the record in the archive.
    pub offset: u64,
    /// Length of the record in bytes.
    pub length: u64,
    /// Target URL the record is expected to describe.
    pub url: String,
}

/// All requested entries for one archive, ascending by offset.
#[derive(Debug, Clone)]
pub struct ArchiveGroup {
    /// Remote object location of the archive (`s3://bucket/key`).
    pub location: String,
    pub entries: Vec<OffsetEntry>,
}

/// A record extracted from a WAT archive.
///
/// At least one of `head`/`digest` is present; candidates with neither are
/// dropped before they become records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRecord {
    /// Target URL, when recoverable from the record or the request.
    pub url: Option<String>,
    /// Serialized `HTML-Metadata.Head` block.
    pub head: Option<String>,
    /// Content digest (`Entity-Digest` or `WARC-Payload-Digest`).
    pub digest: Option<String>,
    /// Archive the record came from.
    pub archive: String,
}
