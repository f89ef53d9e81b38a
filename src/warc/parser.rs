//! Parsing of WAT metadata envelopes into extracted records.
//!
//! A WAT record body is a JSON envelope describing one crawled page. Bytes
//! obtained through range reads may be truncated, shifted, or wrapped in
//! compression garbage, so the range entry point first locates a candidate
//! JSON span before decoding. Bytes obtained from a sequential scan are
//! exactly delimited by the stream format and skip the search.

use serde_json::Value;

use super::record::{ExtractedRecord, RESPONSE_CONTENT_TYPE};

/// Result of attempting to turn candidate bytes into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// A valid record.
    Record(ExtractedRecord),
    /// Well-formed input that legitimately yields no record (wrong content
    /// type, or nothing worth keeping). Not an error.
    Skip,
    /// The bytes could not be decoded as a record. For range reads this
    /// invalidates the whole strategy for the archive.
    Failure,
}

/// Parse bytes fetched by a range read.
///
/// Locates the first `{` and last `}` of the lossily-decoded text and
/// requires the bounded span to decode as JSON. Balanced braces alone are
/// not accepted: decode success is the acceptance criterion, so a truncated
/// envelope that happens to close its outer brace still fails here.
pub fn parse_range_bytes(data: &[u8], fallback_url: &str, archive: &str) -> ParseOutcome {
    let text = String::from_utf8_lossy(data);
    let Some(start) = text.find('{') else {
        return ParseOutcome::Failure;
    };
    let Some(end) = text.rfind('}') else {
        return ParseOutcome::Failure;
    };
    if end <= start {
        return ParseOutcome::Failure;
    }

    let Ok(doc) = serde_json::from_str::<Value>(&text[start..=end]) else {
        return ParseOutcome::Failure;
    };
    record_from_envelope(&doc, Some(fallback_url), archive)
}

/// Build a record from an already-delimited envelope document.
///
/// Shared by the range path (after span location) and the sequential scan
/// (record bodies come pre-delimited). The target URL is taken from the
/// envelope's WARC header metadata when present, else from `fallback_url`.
pub fn record_from_envelope(
    doc: &Value,
    fallback_url: Option<&str>,
    archive: &str,
) -> ParseOutcome {
    let envelope = &doc["Envelope"];
    let payload_meta = &envelope["Payload-Metadata"];

    if payload_meta["Actual-Content-Type"].as_str() != Some(RESPONSE_CONTENT_TYPE) {
        return ParseOutcome::Skip;
    }

    let head = match &payload_meta["HTTP-Response-Metadata"]["HTML-Metadata"]["Head"] {
        Value::Null => None,
        value => serde_json::to_string(value).ok(),
    };
    let digest = payload_meta["Entity-Digest"]
        .as_str()
        .or_else(|| envelope["WARC-Header-Metadata"]["WARC-Payload-Digest"].as_str())
        .map(str::to_string);

    if head.is_none() && digest.is_none() {
        return ParseOutcome::Skip;
    }

    let url = envelope["WARC-Header-Metadata"]["WARC-Target-URI"]
        .as_str()
        .or(fallback_url)
        .map(str::to_string);

    ParseOutcome::Record(ExtractedRecord {
        url,
        head,
        digest,
        archive: archive.to_string(),
    })
}
