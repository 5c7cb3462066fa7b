use std::sync::Arc;
use thiserror::Error;

/// Fatal setup-time errors. Anything reaching the run loop is reported
/// through `tracing` instead, per the non-aborting design of the engine.
#[derive(Debug, Clone, Error)]
pub enum LoadGenError {
    #[error("failed to resolve server {host}: {source}")]
    ServerResolution {
        host: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("server '{0}' did not resolve to any address")]
    ServerUnresolved(String),

    #[error("failed to open data file {path}: {source}")]
    DataFileOpen {
        path: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("failed to bind UDP socket: {0}")]
    SocketBind(Arc<std::io::Error>),

    #[error("failed to configure socket buffers: {0}")]
    SocketBuffer(Arc<std::io::Error>),

    #[error("invalid port {0}: must be a non-zero value less than 65535")]
    InvalidPort(u32),

    #[error("invalid max-queries value {0}: must be greater than zero")]
    InvalidMaxQueries(u64),

    #[error("invalid timeout value {0}: must be greater than zero")]
    InvalidTimeout(u64),
}

impl From<std::io::Error> for LoadGenError {
    fn from(err: std::io::Error) -> Self {
        LoadGenError::SocketBind(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, LoadGenError>;
