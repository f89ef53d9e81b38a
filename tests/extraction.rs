//! End-to-end extraction against a local archive mirror.
//!
//! Builds a real gzip-framed WAT shard on disk, points the pipeline at it
//! through the local object store, and drives everything from a query
//! results CSV. Range reads are left enabled on purpose: the indexed
//! offsets land inside gzip members, so the range strategy fails to decode
//! and the pipeline must fall back to a full sequential scan.

use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use flate2::Compression;
use flate2::write::GzEncoder;
use watrange::{LocalObjectStore, MemorySink, Pipeline, PipelineConfig, RetryPolicy, query};

const WAT_KEY: &str = "crawl-data/seg/wat/shard.warc.wat.gz";

fn wat_record(url: &str, digest: &str) -> Vec<u8> {
    let body = serde_json::json!({
        "Envelope": {
            "Payload-Metadata": {
                "Actual-Content-Type": "application/http; msgtype=response",
                "Entity-Digest": digest,
                "HTTP-Response-Metadata": {
                    "HTML-Metadata": { "Head": { "Title": url } }
                },
            },
            "WARC-Header-Metadata": { "WARC-Target-URI": url },
        }
    })
    .to_string();
    let header = format!(
        "WARC/1.0\r\nWARC-Type: metadata\r\nWARC-Target-URI: {url}\r\nContent-Length: {}\r\n\r\n",
        body.len()
    );
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(header.as_bytes()).unwrap();
    enc.write_all(body.as_bytes()).unwrap();
    enc.write_all(b"\r\n\r\n").unwrap();
    enc.finish().unwrap()
}

#[tokio::test]
async fn csv_to_records_with_range_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let shard_path = dir.path().join("commoncrawl").join(WAT_KEY);
    std::fs::create_dir_all(shard_path.parent().unwrap()).unwrap();

    let urls = ["http://a.example/", "http://b.example/", "http://c.example/"];
    let mut shard = Vec::new();
    for (i, url) in urls.iter().enumerate() {
        shard.extend(wat_record(url, &format!("sha1:REC-{i}")));
    }
    std::fs::write(&shard_path, &shard).unwrap();

    // offsets point into the compressed shard; the ranges fetch fine but do
    // not decode, forcing the full-scan fallback
    let csv = format!(
        "url,warc_filename,offset,length,wat_s3_url\n\
         http://a.example/,,0,40,s3://commoncrawl/{WAT_KEY}\n\
         http://b.example/,,40,40,s3://commoncrawl/{WAT_KEY}\n\
         http://c.example/,,80,40,s3://commoncrawl/{WAT_KEY}\n"
    );
    let rows = query::read_rows(csv.as_bytes()).unwrap();
    let groups = query::group_rows(&rows).unwrap();
    assert_eq!(groups.len(), 1);

    let store = Arc::new(LocalObjectStore::new(dir.path()));
    let pipeline = Pipeline::new(
        store,
        PipelineConfig {
            max_workers: 2,
            flush_threshold: 2,
            use_range_reads: true,
            retry: RetryPolicy {
                max_retries: 1,
                base_backoff: Duration::from_millis(0),
            },
        },
    );

    let mut sink = MemorySink::default();
    let summary = pipeline.run(groups, None, &mut sink).await.unwrap();

    assert_eq!(summary.records, 3);
    assert!(summary.failures.is_empty());
    // 3 records at a threshold of 2: two batches
    assert_eq!(summary.batches, 2);

    let extracted: Vec<_> = sink.batches.iter().flatten().collect();
    let got: HashSet<_> = extracted.iter().filter_map(|r| r.url.as_deref()).collect();
    assert_eq!(got, urls.iter().copied().collect());
    assert!(extracted.iter().all(|r| r.head.is_some() && r.digest.is_some()));
}

#[tokio::test]
async fn filtered_run_restricts_to_requested_targets() {
    let dir = tempfile::tempdir().unwrap();
    let shard_path = dir.path().join("commoncrawl").join(WAT_KEY);
    std::fs::create_dir_all(shard_path.parent().unwrap()).unwrap();

    let mut shard = Vec::new();
    for url in ["http://keep.example/", "http://drop.example/"] {
        shard.extend(wat_record(url, "sha1:X"));
    }
    std::fs::write(&shard_path, &shard).unwrap();

    let csv = format!(
        "url,warc_filename,offset,length,wat_s3_url\n\
         http://keep.example/,,0,40,s3://commoncrawl/{WAT_KEY}\n"
    );
    let rows = query::read_rows(csv.as_bytes()).unwrap();
    let targets = query::target_urls(&rows);
    let groups = query::group_rows(&rows).unwrap();

    let store = Arc::new(LocalObjectStore::new(dir.path()));
    let pipeline = Pipeline::new(
        store,
        PipelineConfig {
            max_workers: 1,
            flush_threshold: 10,
            use_range_reads: false,
            retry: RetryPolicy {
                max_retries: 0,
                base_backoff: Duration::from_millis(0),
            },
        },
    );

    let mut sink = MemorySink::default();
    let summary = pipeline.run(groups, Some(targets), &mut sink).await.unwrap();

    assert_eq!(summary.records, 1);
    let record = &sink.batches[0][0];
    assert_eq!(record.url.as_deref(), Some("http://keep.example/"));
}
