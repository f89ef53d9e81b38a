mod http;
mod local;

pub use http::HttpObjectStore;
pub use local::LocalObjectStore;

use std::io::Read;

use anyhow::{Result, bail};
use async_trait::async_trait;
use bytes::Bytes;

/// Trait for reading objects out of an archive store.
///
/// Two access paths, matching the two extraction strategies: narrow
/// inclusive byte ranges for offset-guided reads, and a full object stream
/// for sequential scanning. A store that cannot serve a range for a location
/// must fail the call rather than return other bytes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the inclusive byte range `[start, end]` of an object.
    async fn fetch_range(&self, location: &str, start: u64, end: u64) -> Result<Bytes>;

    /// Open the whole object as a raw (still compressed) byte stream.
    ///
    /// The returned reader may block while more bytes arrive; consume it
    /// from a blocking context, not directly on an async worker.
    async fn open_stream(&self, location: &str) -> Result<Box<dyn Read + Send>>;
}

/// A `bucket/key` pair parsed from an `s3://` object location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    pub bucket: String,
    pub key: String,
}

impl S3Location {
    pub fn parse(location: &str) -> Result<Self> {
        let Some(rest) = location.strip_prefix("s3://") else {
            bail!("not an s3:// location: {location}");
        };
        let Some((bucket, key)) = rest.split_once('/') else {
            bail!("s3 location has no key: {location}");
        };
        if bucket.is_empty() || key.is_empty() {
            bail!("s3 location has empty bucket or key: {location}");
        }
        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    /// Public HTTPS endpoint for the object, used for anonymous reads.
    pub fn https_url(&self) -> String {
        format!("https://{}.s3.amazonaws.com/{}", self.bucket, self.key)
    }
}
