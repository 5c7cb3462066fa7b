use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Args;
use crate::error::{LoadGenError, Result};

/// The tunable configuration surface of a run. Built once from the parsed
/// CLI arguments; in-stream directives (§4.F) mutate the fields flagged
/// `*_from_cli` only when the run is past setup, or when the command line
/// never set that field to begin with.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub data_file: Option<PathBuf>,
    pub server_host: String,
    pub port: u16,
    pub max_queries: usize,
    pub timeout: Duration,
    pub ignore_directives: bool,
    pub time_limit: Option<Duration>,
    pub run_once: bool,
    pub socket_buffer_kb: u32,
    pub verbose: bool,

    pub server_from_cli: bool,
    pub port_from_cli: bool,
    pub max_queries_from_cli: bool,
    pub timeout_from_cli: bool,
}

const DEFAULT_SERVER: &str = "localhost";
const DEFAULT_PORT: u32 = 53;
const DEFAULT_MAX_QUERIES: u64 = 20;
const DEFAULT_TIMEOUT: u64 = 5;

impl RunConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        let port = args.port.unwrap_or(DEFAULT_PORT);
        let max_queries = args.max_queries.unwrap_or(DEFAULT_MAX_QUERIES);
        let timeout = args.timeout.unwrap_or(DEFAULT_TIMEOUT);

        if port == 0 || port >= 65535 {
            return Err(LoadGenError::InvalidPort(port));
        }
        if max_queries == 0 {
            return Err(LoadGenError::InvalidMaxQueries(max_queries));
        }
        if timeout == 0 {
            return Err(LoadGenError::InvalidTimeout(timeout));
        }

        // "if neither -l nor -1 is given, run_once is forced to true" (§4.E policy).
        let run_once = args.run_once || args.time_limit.is_none();

        Ok(Self {
            data_file: args.data_file.clone(),
            server_host: args.server.clone().unwrap_or_else(|| DEFAULT_SERVER.to_string()),
            port: port as u16,
            max_queries: max_queries as usize,
            timeout: Duration::from_secs(timeout),
            ignore_directives: args.no_directives,
            time_limit: args.time_limit.map(Duration::from_secs),
            run_once,
            socket_buffer_kb: args.buffer_size,
            verbose: args.verbose,

            server_from_cli: args.server.is_some(),
            port_from_cli: args.port.is_some(),
            max_queries_from_cli: args.max_queries.is_some(),
            timeout_from_cli: args.timeout.is_some(),
        })
    }

    pub async fn resolve_server(&self) -> Result<SocketAddr> {
        resolve(&self.server_host, self.port).await
    }
}

/// Resolves a hostname/port pair. The only DNS lookup this tool performs
/// for itself, not on behalf of the workload it is generating (§1 scope).
pub async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    use std::sync::Arc;
    let lookup = format!("{host}:{port}");
    let mut addrs = tokio::net::lookup_host(&lookup)
        .await
        .map_err(|e| LoadGenError::ServerResolution {
            host: host.to_string(),
            source: Arc::new(e),
        })?;
    addrs
        .next()
        .ok_or_else(|| LoadGenError::ServerUnresolved(host.to_string()))
}
