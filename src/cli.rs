use std::path::PathBuf;

use clap::Parser;

/// A DNS query load generator: drives a name server with queries read from
/// a file (or stdin), at a bounded in-flight concurrency, and reports
/// aggregate throughput and loss statistics.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Input data file of query lines. Defaults to stdin.
    #[arg(short = 'd', long = "data-file", value_name = "PATH")]
    pub data_file: Option<PathBuf>,

    /// Server to query. [default: localhost]
    #[arg(short = 's', long = "server")]
    pub server: Option<String>,

    /// Server UDP port. [default: 53]
    #[arg(short = 'p', long = "port")]
    pub port: Option<u32>,

    /// Maximum number of outstanding queries. [default: 20]
    #[arg(short = 'q', long = "max-queries")]
    pub max_queries: Option<u64>,

    /// Per-query timeout, in seconds. [default: 5]
    #[arg(short = 't', long = "timeout")]
    pub timeout: Option<u64>,

    /// Ignore in-stream `#` directives entirely.
    #[arg(short = 'n', long = "no-directives")]
    pub no_directives: bool,

    /// Overall run time limit, in seconds.
    #[arg(short = 'l', long = "time-limit", value_name = "SECONDS")]
    pub time_limit: Option<u64>,

    /// Single pass through the input (implied when --time-limit is absent).
    #[arg(short = '1', long = "run-once")]
    pub run_once: bool,

    /// Socket send/receive buffer size, in kilobytes.
    #[arg(short = 'b', long = "buffer-size", default_value_t = 32)]
    pub buffer_size: u32,

    /// Raise logging to debug, surfacing stray responses and rejected
    /// directives that would otherwise stay silent.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}
