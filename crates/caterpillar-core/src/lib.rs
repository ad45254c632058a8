//! caterpillar-core: fixed-response HTTP responder
//!
//! Owns the pieces the `caterpillar` binary wires together:
//! - `Method` / `Response` / `StatusCode` value types
//! - `RouteTable` mapping (method, path) to a pre-built response
//! - the drive route (`GET /test` -> `400 Caterpillar drive offline.`)
//! - the hyper/tokio accept loop with connection draining

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod error;
pub mod handlers;
pub mod method;
pub mod response;
pub mod routes;
pub mod server;

// Re-exports
pub use error::{Error, Result};
pub use method::Method;
pub use response::{Response, ResponseBuilder, StatusCode};
pub use routes::{RouteTable, StaticRoute};
pub use server::{create_listener, ConnectionTracker, Server, ServerConfig, ServerState};
