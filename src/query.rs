//! Boundary with the external query service.
//!
//! The query service hands over rows naming, for each wanted record, the
//! target URL, the archive that holds it, and the record's byte offset and
//! length. Everything arrives as strings (query engines export CSV with
//! varchar columns); this module validates, coerces, and groups the rows
//! into per-archive work units before any extraction is dispatched.

use std::collections::{BTreeMap, HashSet};
use std::io::Read;

use serde::Deserialize;

use crate::error::Error;
use crate::warc::{ArchiveGroup, OffsetEntry};

/// One row of query results, as exported by the query service.
#[derive(Debug, Clone, Deserialize)]
pub struct OffsetRow {
    /// Target URL of the wanted record.
    pub url: String,
    /// WARC shard filename; rewritten to the matching WAT location when no
    /// explicit `wat_s3_url` is given.
    #[serde(default)]
    pub warc_filename: Option<String>,
    /// Byte offset of the record, string-coerced.
    pub offset: String,
    /// Byte length of the record, string-coerced.
    pub length: String,
    /// Explicit WAT archive location, overriding `warc_filename`.
    #[serde(default)]
    pub wat_s3_url: Option<String>,
}

/// Read query result rows from CSV. A missing required column or an
/// undeserializable row is a validation error: the run must not start.
pub fn read_rows<R: Read>(input: R) -> Result<Vec<OffsetRow>, Error> {
    let mut reader = csv::Reader::from_reader(input);
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row.map_err(|e| Error::Validation(e.to_string()))?);
    }
    Ok(rows)
}

/// Rewrite a WARC shard location to its WAT counterpart.
///
/// The crawl index points at `warc/` response shards; the metadata lives in
/// sibling `wat/` shards with a `.warc.wat.gz` suffix.
pub fn normalize_wat_location(candidate: &str) -> String {
    if candidate.contains(".warc.wat.gz") {
        return candidate.to_string();
    }
    candidate
        .replace("/warc/", "/wat/")
        .replace(".warc.gz", ".warc.wat.gz")
}

/// Group validated rows into one [`ArchiveGroup`] per archive location,
/// entries ascending by offset.
pub fn group_rows(rows: &[OffsetRow]) -> Result<Vec<ArchiveGroup>, Error> {
    let mut by_location: BTreeMap<String, Vec<OffsetEntry>> = BTreeMap::new();

    for row in rows {
        let location = wat_location(row)?;
        let offset = parse_field("offset", &row.offset)?;
        let length = parse_field("length", &row.length)?;
        if length == 0 {
            return Err(Error::Validation(format!(
                "length must be positive for url {}",
                row.url
            )));
        }
        by_location.entry(location).or_default().push(OffsetEntry {
            offset,
            length,
            url: row.url.clone(),
        });
    }

    Ok(by_location
        .into_iter()
        .map(|(location, mut entries)| {
            entries.sort_by_key(|e| e.offset);
            ArchiveGroup { location, entries }
        })
        .collect())
}

/// The set of target URLs named by the rows, for optional scan filtering.
pub fn target_urls(rows: &[OffsetRow]) -> HashSet<String> {
    rows.iter().map(|r| r.url.clone()).collect()
}

fn wat_location(row: &OffsetRow) -> Result<String, Error> {
    let candidate = match (&row.wat_s3_url, &row.warc_filename) {
        (Some(wat), _) if !wat.is_empty() => wat.clone(),
        (_, Some(warc)) if !warc.is_empty() => normalize_wat_location(warc),
        _ => {
            return Err(Error::Validation(format!(
                "row for url {} names no archive (wat_s3_url or warc_filename required)",
                row.url
            )));
        }
    };
    if !candidate.starts_with("s3://") {
        return Err(Error::Validation(format!(
            "archive location must use the s3:// scheme: {candidate}"
        )));
    }
    Ok(candidate)
}

fn parse_field(name: &str, value: &str) -> Result<u64, Error> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Validation(format!("invalid {name}: {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "url,warc_filename,offset,length,wat_s3_url\n";

    fn rows_from(csv: &str) -> Vec<OffsetRow> {
        read_rows(csv.as_bytes()).unwrap()
    }

    #[test]
    fn groups_by_archive_and_sorts_by_offset() {
        let csv = format!(
            "{HEADER}\
             http://a/,s3://cc/crawl/warc/x.warc.gz,900,10,\n\
             http://b/,s3://cc/crawl/warc/x.warc.gz,100,20,\n\
             http://c/,,50,30,s3://cc/crawl/wat/y.warc.wat.gz\n"
        );
        let groups = group_rows(&rows_from(&csv)).unwrap();
        assert_eq!(groups.len(), 2);

        let x = groups
            .iter()
            .find(|g| g.location == "s3://cc/crawl/wat/x.warc.wat.gz")
            .expect("warc filename rewritten to wat location");
        let offsets: Vec<u64> = x.entries.iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![100, 900]);

        let y = groups
            .iter()
            .find(|g| g.location == "s3://cc/crawl/wat/y.warc.wat.gz")
            .unwrap();
        assert_eq!(y.entries[0].url, "http://c/");
    }

    #[test]
    fn missing_offset_column_is_a_validation_error() {
        let csv = "url,warc_filename,length\nhttp://a/,s3://cc/warc/x.warc.gz,10\n";
        assert!(matches!(
            read_rows(csv.as_bytes()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn malformed_numbers_and_zero_length_are_validation_errors() {
        let bad_offset = format!("{HEADER}http://a/,s3://cc/wat/x.warc.wat.gz,abc,10,\n");
        assert!(matches!(
            group_rows(&rows_from(&bad_offset)),
            Err(Error::Validation(_))
        ));

        let zero_length = format!("{HEADER}http://a/,s3://cc/wat/x.warc.wat.gz,5,0,\n");
        assert!(matches!(
            group_rows(&rows_from(&zero_length)),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn rows_without_an_s3_location_are_rejected() {
        let no_archive = format!("{HEADER}http://a/,,5,10,\n");
        assert!(matches!(
            group_rows(&rows_from(&no_archive)),
            Err(Error::Validation(_))
        ));

        let wrong_scheme = format!("{HEADER}http://a/,https://cc/warc/x.warc.gz,5,10,\n");
        assert!(matches!(
            group_rows(&rows_from(&wrong_scheme)),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn target_urls_collects_the_requested_set() {
        let csv = format!(
            "{HEADER}\
             http://a/,s3://cc/wat/x.warc.wat.gz,1,2,\n\
             http://b/,s3://cc/wat/x.warc.wat.gz,3,4,\n\
             http://a/,s3://cc/wat/y.warc.wat.gz,5,6,\n"
        );
        let targets = target_urls(&rows_from(&csv));
        assert_eq!(targets.len(), 2);
        assert!(targets.contains("http://a/"));
    }
}
