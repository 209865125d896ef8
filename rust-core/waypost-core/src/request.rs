//! # HTTP Request
//!
//! Request wrapper handed to middlewares and controllers.
//!
//! Holds the parsed method, path, query string and headers, the collected
//! body, the decoded body (filled by the body-parsing middlewares), the path
//! parameters of the matched route and a per-request `locals` map that
//! middlewares use to pass data down the chain.

use crate::error::{Error, Result};
use http_body_util::BodyExt;
use hyper::body::Bytes;
use hyper::{HeaderMap, Method};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::net::SocketAddr;

/// HTTP request as seen by the pipeline
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Request path (without query string)
    pub path: String,
    query_string: Option<String>,
    query_params: HashMap<String, String>,
    params: HashMap<String, String>,
    headers: HeaderMap,
    body: Option<Bytes>,
    /// Body decoded by `JsonBodyParser`
    pub json: Option<Value>,
    /// Body decoded by `UrlEncodedParser`
    pub form: Option<HashMap<String, String>>,
    /// Per-request scratch space shared down the chain
    pub locals: Map<String, Value>,
    /// Peer address, when the request came off a socket
    pub remote_addr: Option<SocketAddr>,
}

impl Request {
    /// Create a request manually (tests, in-process dispatch)
    ///
    /// `path` may carry a query string.
    pub fn new(
        method: Method,
        path: impl Into<String>,
        headers_map: HashMap<String, String>,
        body: Option<Bytes>,
    ) -> Self {
        let path = path.into();
        let (path, query_string) = match path.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (path, None),
        };

        let mut headers = HeaderMap::new();
        for (k, v) in headers_map {
            if let (Ok(n), Ok(v)) = (
                hyper::header::HeaderName::from_bytes(k.as_bytes()),
                hyper::header::HeaderValue::from_str(&v),
            ) {
                headers.insert(n, v);
            }
        }

        Self::from_parts(method, path, query_string, headers, body)
    }

    /// Shorthand for a body-less request
    pub fn empty(method: Method, path: impl Into<String>) -> Self {
        Self::new(method, path, HashMap::new(), None)
    }

    fn from_parts(
        method: Method,
        path: String,
        query_string: Option<String>,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> Self {
        let query_params = parse_query_string(query_string.as_deref());
        Self {
            method,
            path,
            query_string,
            query_params,
            params: HashMap::new(),
            headers,
            body,
            json: None,
            form: None,
            locals: Map::new(),
            remote_addr: None,
        }
    }

    /// Create from a hyper request, collecting the body up to `max_body_size`
    ///
    /// # Errors
    ///
    /// Returns `Error::PayloadTooLarge` if the declared or actual body size
    /// exceeds the limit, `Error::Http` if the body stream fails.
    pub async fn from_hyper_with_limit(
        req: hyper::Request<hyper::body::Incoming>,
        max_body_size: usize,
    ) -> Result<Self> {
        let (parts, body) = req.into_parts();

        if let Some(content_len) = parts
            .headers
            .get(hyper::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok())
        {
            if content_len > max_body_size {
                return Err(Error::PayloadTooLarge {
                    limit: max_body_size,
                    actual: content_len,
                });
            }
        }

        let bytes = body.collect().await?.to_bytes();
        if bytes.len() > max_body_size {
            return Err(Error::PayloadTooLarge {
                limit: max_body_size,
                actual: bytes.len(),
            });
        }

        Ok(Self::from_parts(
            parts.method,
            parts.uri.path().to_string(),
            parts.uri.query().map(String::from),
            parts.headers,
            (!bytes.is_empty()).then_some(bytes),
        ))
    }

    /// Get a header value by name (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Set or override a header
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let (Ok(n), Ok(v)) = (
            hyper::header::HeaderName::from_bytes(name.as_bytes()),
            hyper::header::HeaderValue::from_str(value),
        ) {
            self.headers.insert(n, v);
        }
    }

    /// Raw header map
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Media type of the body, without parameters, lower-cased
    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        self.header("content-type").map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }

    /// Path parameter captured by the matched route
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// All path parameters
    #[must_use]
    pub const fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    /// Query parameter by name
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    /// Get query parameters as a `HashMap`
    #[must_use]
    pub const fn query_map(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    /// Get raw query string
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }

    /// Get the request body as bytes
    #[must_use]
    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.body.as_ref().map(AsRef::as_ref)
    }

    /// Get the request body as string (UTF-8)
    #[must_use]
    pub fn body_str(&self) -> Option<&str> {
        self.body_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }
}

/// Parse a query string or urlencoded body into a map
///
/// Handles URL decoding and duplicate keys (last value wins).
pub(crate) fn parse_query_string(query: Option<&str>) -> HashMap<String, String> {
    query
        .map(|q| {
            q.split('&')
                .filter(|pair| !pair.is_empty())
                .map(|pair| {
                    let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                    (url_decode(key), url_decode(value))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Percent-decoding with `+` as space
fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 2;
                    }
                    None => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_string_simple() {
        let result = parse_query_string(Some("page=1&limit=10"));
        assert_eq!(result.get("page"), Some(&"1".to_string()));
        assert_eq!(result.get("limit"), Some(&"10".to_string()));
    }

    #[test]
    fn test_parse_query_string_empty() {
        assert!(parse_query_string(None).is_empty());
        assert!(parse_query_string(Some("")).is_empty());
    }

    #[test]
    fn test_parse_query_string_url_encoded() {
        let result = parse_query_string(Some("name=John+Doe&city=New%20York"));
        assert_eq!(result.get("name"), Some(&"John Doe".to_string()));
        assert_eq!(result.get("city"), Some(&"New York".to_string()));
    }

    #[test]
    fn test_url_decode() {
        assert_eq!(url_decode("hello+world"), "hello world");
        assert_eq!(url_decode("100%25"), "100%");
        assert_eq!(url_decode("caf%C3%A9"), "café");
        assert_eq!(url_decode("50%"), "50%");
        assert_eq!(url_decode("%zz"), "%zz");
    }

    #[test]
    fn test_new_splits_query() {
        let req = Request::empty(Method::GET, "/search?q=rust");
        assert_eq!(req.path, "/search");
        assert_eq!(req.query("q"), Some("rust"));
        assert_eq!(req.query_string(), Some("q=rust"));
    }

    #[test]
    fn test_content_type_strips_parameters() {
        let mut req = Request::empty(Method::POST, "/");
        req.set_header("Content-Type", "Application/JSON; charset=utf-8");
        assert_eq!(req.content_type().as_deref(), Some("application/json"));
    }
}
