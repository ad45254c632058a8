//! Drive status route
//!
//! `GET /test` always reports the drive as offline with a 400.

use crate::response::TEXT_PLAIN;
use crate::{Method, Result, RouteTable, StaticRoute, StatusCode};
use bytes::Bytes;

/// Path of the only registered route
pub const TEST_PATH: &str = "/test";

/// Body returned for `GET /test`
pub const OFFLINE_MESSAGE: &str = "Caterpillar drive offline.";

/// `GET /test` -> `400 Caterpillar drive offline.`
pub fn offline_route() -> StaticRoute {
    StaticRoute {
        method: Method::Get,
        path: TEST_PATH.to_string(),
        status: StatusCode::BAD_REQUEST,
        content_type: TEXT_PLAIN.to_string(),
        body: Bytes::from_static(OFFLINE_MESSAGE.as_bytes()),
    }
}

/// The complete route table served by the binary
pub fn routes() -> Result<RouteTable> {
    let mut table = RouteTable::new();
    table.insert(offline_route())?;
    Ok(table)
}
