//! Output sink boundary.
//!
//! The pipeline hands over batches of extracted records; what a sink does
//! with them (file naming, append semantics, remote upload) is its own
//! business, not the extraction core's.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use tracing::info;

use crate::warc::ExtractedRecord;

/// Accepts batches of extracted records.
pub trait RecordSink {
    fn write_batch(&mut self, batch: &[ExtractedRecord]) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Columnar sink writing one Parquet file per batch under an output
/// directory, named `extracted_<run>_<total>.parquet` where `<total>` is the
/// running record count after the batch.
pub struct ParquetSink {
    out_dir: PathBuf,
    schema: SchemaRef,
    run_id: u64,
    total: usize,
}

impl ParquetSink {
    pub fn new(out_dir: impl AsRef<Path>) -> Result<Self> {
        let out_dir = out_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&out_dir)
            .with_context(|| format!("create output dir {}", out_dir.display()))?;
        let run_id = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Ok(Self {
            out_dir,
            schema: Self::schema(),
            run_id,
            total: 0,
        })
    }

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("url", DataType::Utf8, true),
            Field::new("head", DataType::Utf8, true),
            Field::new("digest", DataType::Utf8, true),
            Field::new("archive", DataType::Utf8, false),
        ]))
    }
}

impl RecordSink for ParquetSink {
    fn write_batch(&mut self, batch: &[ExtractedRecord]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.total += batch.len();
        let path = self
            .out_dir
            .join(format!("extracted_{}_{}.parquet", self.run_id, self.total));

        let url: ArrayRef = Arc::new(StringArray::from(
            batch.iter().map(|r| r.url.as_deref()).collect::<Vec<_>>(),
        ));
        let head: ArrayRef = Arc::new(StringArray::from(
            batch.iter().map(|r| r.head.as_deref()).collect::<Vec<_>>(),
        ));
        let digest: ArrayRef = Arc::new(StringArray::from(
            batch.iter().map(|r| r.digest.as_deref()).collect::<Vec<_>>(),
        ));
        let archive: ArrayRef = Arc::new(StringArray::from(
            batch.iter().map(|r| r.archive.as_str()).collect::<Vec<_>>(),
        ));
        let columns = vec![url, head, digest, archive];
        let record_batch = RecordBatch::try_new(self.schema.clone(), columns)?;

        let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
        let mut writer = ArrowWriter::try_new(file, self.schema.clone(), None)?;
        writer.write(&record_batch)?;
        writer.close()?;

        info!("wrote {} records to {}", batch.len(), path.display());
        Ok(())
    }
}

/// Sink that keeps batches in memory. Test support.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub batches: Vec<Vec<ExtractedRecord>>,
}

impl RecordSink for MemorySink {
    fn write_batch(&mut self, batch: &[ExtractedRecord]) -> Result<()> {
        self.batches.push(batch.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    fn record(url: &str, digest: Option<&str>) -> ExtractedRecord {
        ExtractedRecord {
            url: Some(url.to_string()),
            head: None,
            digest: digest.map(str::to_string),
            archive: "s3://cc/wat/x.warc.wat.gz".to_string(),
        }
    }

    #[test]
    fn writes_one_readable_file_per_batch() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ParquetSink::new(dir.path()).unwrap();

        sink.write_batch(&[record("http://a/", Some("sha1:A")), record("http://b/", None)])
            .unwrap();
        sink.write_batch(&[record("http://c/", Some("sha1:C"))]).unwrap();
        sink.write_batch(&[]).unwrap(); // empty batches write nothing

        let mut files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        files.sort();
        assert_eq!(files.len(), 2);

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&files[0]).unwrap())
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<RecordBatch> = reader.map(|b| b.unwrap()).collect();
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 2);

        let urls = batches[0]
            .column_by_name("url")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(urls.value(0), "http://a/");
        let digests = batches[0]
            .column_by_name("digest")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert!(digests.is_null(1));
    }
}
