//! Error types surfaced by the server crate.
//!
//! Only binding crosses the facade as a failure; per-connection I/O
//! errors are logged inside their own tasks and never returned.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be created or bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("server already started")]
    AlreadyStarted,

    /// `start` after `stop`; a stopped server cannot be restarted.
    #[error("server has been stopped")]
    Closed,

    /// The configuration handed to `EchoServer::new` is unusable.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("queue_capacity must be at least 1")]
    ZeroQueueCapacity,

    #[error("max_line_len must be at least 1")]
    ZeroMaxLineLen,
}
