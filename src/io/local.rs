use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::{ObjectStore, S3Location};
use anyhow::{Result, bail};
use async_trait::async_trait;
use bytes::Bytes;

/// Object store over a local directory tree.
///
/// `s3://bucket/key` locations resolve to `<root>/<bucket>/<key>`; bare
/// relative paths resolve directly under the root. Useful for extraction
/// from mirrored archive shards and for exercising the pipeline offline.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, location: &str) -> Result<PathBuf> {
        if let Ok(loc) = S3Location::parse(location) {
            return Ok(self.root.join(loc.bucket).join(loc.key));
        }
        if location.contains("://") {
            bail!("unsupported location scheme: {location}");
        }
        Ok(self.root.join(location))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn fetch_range(&self, location: &str, start: u64, end: u64) -> Result<Bytes> {
        let path = self.resolve(location)?;
        let file = File::open(&path)?;
        let size = file.metadata()?.len();
        if start >= size || end < start {
            bail!("range {start}-{end} not satisfiable for {location} ({size} bytes)");
        }
        let len = (end.min(size - 1) - start + 1) as usize;
        let mut buf = vec![0u8; len];

        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            file.read_exact_at(&mut buf, start)?;
        }

        #[cfg(not(unix))]
        {
            use std::io::{Seek, SeekFrom};
            let mut file = file;
            file.seek(SeekFrom::Start(start))?;
            file.read_exact(&mut buf)?;
        }

        Ok(Bytes::from(buf))
    }

    async fn open_stream(&self, location: &str) -> Result<Box<dyn Read + Send>> {
        let path = self.resolve(location)?;
        Ok(Box::new(File::open(&path)?))
    }
}
