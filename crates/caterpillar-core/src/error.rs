//! Error types for caterpillar-core

use std::net::SocketAddr;
use thiserror::Error;

/// Result type alias for caterpillar operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building routes or running the responder
#[derive(Debug, Error)]
pub enum Error {
    /// Listening socket could not be created, bound or put into listen mode
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Hostname/port pair does not form a socket address
    #[error("invalid listen address: {0}")]
    InvalidAddress(String),

    /// Same (method, path) registered twice
    #[error("route already registered: {method} {path}")]
    DuplicateRoute { method: String, path: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
