use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "watrange")]
#[command(version)]
#[command(about = "Offset-guided record extraction from remote WAT archives", long_about = None)]
#[command(after_help = "Examples:\n  \
  watrange results.csv                        extract records listed in results.csv\n  \
  watrange results.csv -d ./out --max-workers 16\n  \
  watrange results.csv --no-range-reads       always stream archives sequentially")]
pub struct Cli {
    /// Query results CSV (url, warc_filename, offset, length[, wat_s3_url])
    #[arg(value_name = "RESULTS")]
    pub query_results: PathBuf,

    /// Output directory for extracted parquet batches
    #[arg(short = 'd', long = "out-dir", value_name = "DIR", default_value = "./outputs")]
    pub out_dir: PathBuf,

    /// Maximum archives processed concurrently
    #[arg(long, value_name = "N", default_value_t = 8)]
    pub max_workers: usize,

    /// Records per flushed output batch
    #[arg(long, value_name = "N", default_value_t = 2000)]
    pub flush_threshold: usize,

    /// Disable Range requests; always stream archives sequentially
    #[arg(long)]
    pub no_range_reads: bool,

    /// Restrict full scans to the URLs named in the query results
    #[arg(long)]
    pub filter_targets: bool,

    /// Retries after a failed archive open
    #[arg(long, value_name = "N", default_value_t = 2)]
    pub retries: u32,

    /// Base backoff between open retries, in milliseconds (doubles each try)
    #[arg(long, value_name = "MS", default_value_t = 2000)]
    pub backoff_ms: u64,
}
