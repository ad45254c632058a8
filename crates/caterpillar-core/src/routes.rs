//! Static route table
//!
//! Every route maps to a response that is fully built at registration
//! time, so dispatch is a single hash lookup and handlers never run.
//!
//! ## Matching
//! - Paths compare case-insensitively
//! - One trailing slash is ignored (`/test/` matches `/test`)
//! - `HEAD` falls back to the `GET` route for the same path
//! - `OPTIONS` without its own route answers `200` with an `Allow` list

use crate::{Error, Method, Response, ResponseBuilder, Result, StatusCode};
use crate::response::TEXT_PLAIN;
use bytes::Bytes;
use std::collections::HashMap;

/// A route whose response never changes
#[derive(Debug, Clone)]
pub struct StaticRoute {
    pub method: Method,
    pub path: String,
    pub status: StatusCode,
    pub content_type: String,
    pub body: Bytes,
}

impl StaticRoute {
    /// Build the response served for this route
    pub fn to_response(&self) -> Response {
        ResponseBuilder::new(self.status)
            .header("content-type", self.content_type.as_str())
            .body(self.body.clone())
            .build()
    }
}

/// Immutable-after-startup map from (method, path) to a pre-built response
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: HashMap<(Method, String), Response>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route. Registering the same method and path twice fails.
    pub fn insert(&mut self, route: StaticRoute) -> Result<()> {
        let key = (route.method, normalize_path(&route.path));
        if self.routes.contains_key(&key) {
            return Err(Error::DuplicateRoute {
                method: route.method.to_string(),
                path: route.path,
            });
        }
        self.routes.insert(key, route.to_response());
        Ok(())
    }

    /// Find the registered response for a request path (query string already stripped)
    pub fn find(&self, method: Method, path: &str) -> Option<&Response> {
        let path = normalize_path(path);
        self.routes
            .get(&(method, path.clone()))
            .or_else(|| match method {
                Method::Head => self.routes.get(&(Method::Get, path)),
                _ => None,
            })
    }

    /// Response for a request: a registered route, or the generated
    /// `OPTIONS` reply for a known path. `None` means 404.
    pub fn resolve(&self, method: Method, path: &str) -> Option<Response> {
        match self.find(method, path) {
            Some(res) => Some(res.clone()),
            None if method == Method::Options => self.allow(path).map(|allow| {
                ResponseBuilder::new(StatusCode::OK)
                    .header("allow", allow.as_str())
                    .header("content-type", TEXT_PLAIN)
                    .body(allow)
                    .build()
            }),
            None => None,
        }
    }

    /// Comma-separated methods registered for `path`, `HEAD` implied by `GET`
    pub fn allow(&self, path: &str) -> Option<String> {
        let path = normalize_path(path);
        let mut methods: Vec<Method> = self
            .routes
            .keys()
            .filter(|(_, p)| *p == path)
            .map(|(m, _)| *m)
            .collect();
        if methods.is_empty() {
            return None;
        }
        if methods.contains(&Method::Get) && !methods.contains(&Method::Head) {
            methods.push(Method::Head);
        }
        methods.sort_by_key(|m| m.as_str());

        let names: Vec<&str> = methods.iter().map(Method::as_str).collect();
        Some(names.join(","))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = match path.strip_suffix('/') {
        Some(rest) if !rest.is_empty() => rest,
        _ => path,
    };
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(method: Method, path: &str, status: u16, body: &'static str) -> StaticRoute {
        StaticRoute {
            method,
            path: path.to_string(),
            status: StatusCode(status),
            content_type: "text/plain".to_string(),
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    fn header<'a>(res: &'a Response, name: &str) -> Option<&'a str> {
        res.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_exact_match() {
        let mut table = RouteTable::new();
        table.insert(route(Method::Get, "/status", 200, "up")).unwrap();

        let res = table.find(Method::Get, "/status").unwrap();
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body, "up");
        assert_eq!(header(res, "content-type"), Some("text/plain"));
        assert!(table.find(Method::Get, "/other").is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_method_is_part_of_key() {
        let mut table = RouteTable::new();
        table.insert(route(Method::Get, "/status", 200, "up")).unwrap();

        assert!(table.find(Method::Post, "/status").is_none());
        assert!(table.find(Method::Delete, "/status").is_none());
    }

    #[test]
    fn test_head_fallback() {
        let mut table = RouteTable::new();
        table.insert(route(Method::Get, "/status", 200, "up")).unwrap();

        let res = table.find(Method::Head, "/status").unwrap();
        assert_eq!(res.status, StatusCode::OK);
    }

    #[test]
    fn test_explicit_head_wins() {
        let mut table = RouteTable::new();
        table.insert(route(Method::Get, "/status", 200, "up")).unwrap();
        table.insert(route(Method::Head, "/status", 400, "")).unwrap();

        assert_eq!(
            table.find(Method::Head, "/status").unwrap().status,
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_trailing_slash_and_case() {
        let mut table = RouteTable::new();
        table.insert(route(Method::Get, "/Status", 200, "up")).unwrap();

        assert!(table.find(Method::Get, "/status").is_some());
        assert!(table.find(Method::Get, "/STATUS/").is_some());
        assert!(table.find(Method::Get, "/status//").is_none());
        assert!(table.find(Method::Get, "/status/x").is_none());
    }

    #[test]
    fn test_root_path() {
        let mut table = RouteTable::new();
        table.insert(route(Method::Get, "/", 200, "root")).unwrap();

        assert!(table.find(Method::Get, "/").is_some());
        assert!(table.find(Method::Get, "").is_some());
    }

    #[test]
    fn test_duplicate_route() {
        let mut table = RouteTable::new();
        table.insert(route(Method::Get, "/status", 200, "up")).unwrap();

        let err = table
            .insert(route(Method::Get, "/status/", 404, "again"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateRoute { .. }));
        assert_eq!(err.to_string(), "route already registered: GET /status/");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_allow_list() {
        let mut table = RouteTable::new();
        table.insert(route(Method::Get, "/status", 200, "up")).unwrap();
        table.insert(route(Method::Post, "/status", 200, "set")).unwrap();
        table.insert(route(Method::Put, "/other", 200, "put")).unwrap();

        assert_eq!(table.allow("/STATUS/").as_deref(), Some("GET,HEAD,POST"));
        assert_eq!(table.allow("/other").as_deref(), Some("PUT"));
        assert_eq!(table.allow("/missing"), None);
    }

    #[test]
    fn test_resolve_options() {
        let mut table = RouteTable::new();
        table.insert(route(Method::Get, "/status", 200, "up")).unwrap();

        let res = table.resolve(Method::Options, "/status").unwrap();
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(header(&res, "allow"), Some("GET,HEAD"));
        assert_eq!(res.body, "GET,HEAD");

        assert!(table.resolve(Method::Options, "/missing").is_none());
        assert!(table.resolve(Method::Post, "/status").is_none());
        assert_eq!(table.resolve(Method::Get, "/status").unwrap().body, "up");
    }

    #[test]
    fn test_registered_options_wins() {
        let mut table = RouteTable::new();
        table.insert(route(Method::Get, "/status", 200, "up")).unwrap();
        table.insert(route(Method::Options, "/status", 400, "custom")).unwrap();

        let res = table.resolve(Method::Options, "/status").unwrap();
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body, "custom");
    }

    #[test]
    fn test_empty_table() {
        let table = RouteTable::new();
        assert!(table.is_empty());
        assert!(table.find(Method::Get, "/").is_none());
    }
}
