//! Sequential reader for gzip-framed WARC streams.
//!
//! WAT archives are a sequence of gzip members, each holding one WARC
//! record: a version line, header fields, a blank line, then a body of
//! exactly `Content-Length` bytes. [`flate2::read::MultiGzDecoder`] splices
//! the members into one decompressed stream, so the reader only deals with
//! the record framing.

use std::io::{BufRead, BufReader, Read};

use anyhow::{Context, Result, bail};
use flate2::read::MultiGzDecoder;

/// One WARC record: parsed header fields and the raw body.
#[derive(Debug, Clone)]
pub struct WarcRecord {
    headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl WarcRecord {
    /// Look up a header field, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn warc_type(&self) -> Option<&str> {
        self.header("WARC-Type")
    }

    pub fn target_uri(&self) -> Option<&str> {
        self.header("WARC-Target-URI")
    }
}

/// Iterates WARC records off a compressed stream, front to back.
pub struct WarcReader<R: Read> {
    input: BufReader<MultiGzDecoder<R>>,
}

impl<R: Read> WarcReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input: BufReader::new(MultiGzDecoder::new(input)),
        }
    }

    /// Read the next record, or `None` at end of stream.
    ///
    /// Framing damage (a missing version line, unterminated headers) is an
    /// error: without intact framing there is no next record boundary to
    /// resume from.
    pub fn next_record(&mut self) -> Result<Option<WarcRecord>> {
        // Skip the blank lines separating records.
        let version = loop {
            let Some(line) = self.read_line()? else {
                return Ok(None);
            };
            if !line.is_empty() {
                break line;
            }
        };
        if !version.starts_with("WARC/") {
            bail!("expected WARC version line, got {version:?}");
        }

        let mut headers = Vec::new();
        loop {
            let Some(line) = self.read_line()? else {
                bail!("truncated record header block");
            };
            if line.is_empty() {
                break;
            }
            let Some((name, value)) = line.split_once(':') else {
                bail!("malformed header line: {line:?}");
            };
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }

        let length: usize = headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case("Content-Length"))
            .map(|(_, v)| v.as_str())
            .context("record has no Content-Length")?
            .parse()
            .context("invalid Content-Length")?;

        let mut body = vec![0u8; length];
        self.input
            .read_exact(&mut body)
            .context("truncated record body")?;

        Ok(Some(WarcRecord { headers, body }))
    }

    /// Read one CRLF-terminated line, trimmed. `None` at end of stream.
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}
