//! Route handlers
//!
//! Every handler here is static: it contributes pre-built routes to a
//! `RouteTable` instead of running per request.

pub mod drive;

pub use drive::{offline_route, routes, OFFLINE_MESSAGE, TEST_PATH};
