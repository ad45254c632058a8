//! HTTP Response types

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http_body_util::Full;
use smallvec::SmallVec;

/// Content type used for every plain-text body this server emits
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// HTTP Status Code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const NOT_FOUND: StatusCode = StatusCode(404);

    /// Get the numeric code
    pub fn as_u16(&self) -> u16 {
        self.0
    }
}

/// HTTP Response
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    /// Response headers (stack-allocated for small header counts)
    pub headers: SmallVec<[(String, String); 4]>,
    pub body: Bytes,
}

impl Response {
    /// Create an empty response with the given status
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: SmallVec::new(),
            body: Bytes::new(),
        }
    }

    /// Plain-text response with an explicit status
    pub fn text(status: StatusCode, body: impl Into<Bytes>) -> Self {
        ResponseBuilder::new(status)
            .header("content-type", TEXT_PLAIN)
            .body(body)
            .build()
    }

    /// Create a 404 Not Found response
    pub fn not_found() -> Self {
        Self::text(StatusCode::NOT_FOUND, "Not Found")
    }

    /// Convert into a hyper response.
    ///
    /// `content-length` is left to hyper, which derives it from the
    /// exact size of the `Full` body. Headers that are not valid HTTP
    /// tokens are dropped with a warning.
    pub fn into_hyper(self) -> hyper::Response<Full<Bytes>> {
        let mut res = hyper::Response::new(Full::new(self.body));
        *res.status_mut() = http::StatusCode::from_u16(self.status.0)
            .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);

        let headers = res.headers_mut();
        for (name, value) in self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => tracing::warn!(header = %name, "dropping invalid response header"),
            }
        }

        res
    }
}

/// Builder for constructing responses
pub struct ResponseBuilder {
    response: Response,
}

impl ResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            response: Response::new(status),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.response.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.response.body = body.into();
        self
    }

    pub fn build(self) -> Response {
        self.response
    }
}
