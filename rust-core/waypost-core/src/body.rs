//! # Body Parsers
//!
//! Default middlewares that decode the collected request body. They only
//! fill `Request::json` / `Request::form` when the content type matches and
//! never touch the raw body, so controllers can still read it.

use crate::context::SharedContext;
use crate::error::Result;
use crate::json::parse_json_bytes;
use crate::middleware::{Middleware, Next};
use crate::request::{parse_query_string, Request};
use crate::response::Response;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

fn is_json(content_type: &str) -> bool {
    content_type == "application/json"
        || (content_type.starts_with("application/") && content_type.ends_with("+json"))
}

/// Decodes `application/json` (and `+json`) bodies into `Request::json`
///
/// A malformed body fails the request with `Error::InvalidJson`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonBodyParser;

impl JsonBodyParser {
    /// Create the parser
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for JsonBodyParser {
    fn handle<'a>(
        &'a self,
        _shared: &'a SharedContext,
        req: &'a mut Request,
        _res: &'a mut Response,
    ) -> BoxFuture<'a, Result<Next>> {
        async move {
            if req.content_type().as_deref().is_some_and(is_json) {
                if let Some(mut bytes) = req.body_bytes().map(<[u8]>::to_vec) {
                    let value: Value = parse_json_bytes(&mut bytes)?;
                    req.json = Some(value);
                }
            }
            Ok(Next::Continue)
        }
        .boxed()
    }

    fn name(&self) -> &str {
        "JsonBodyParser"
    }
}

/// Decodes `application/x-www-form-urlencoded` bodies into `Request::form`
#[derive(Debug, Default, Clone, Copy)]
pub struct UrlEncodedParser;

impl UrlEncodedParser {
    /// Create the parser
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for UrlEncodedParser {
    fn handle<'a>(
        &'a self,
        _shared: &'a SharedContext,
        req: &'a mut Request,
        _res: &'a mut Response,
    ) -> BoxFuture<'a, Result<Next>> {
        async move {
            if req.content_type().as_deref() == Some("application/x-www-form-urlencoded") {
                let form = parse_query_string(req.body_str());
                req.form = Some(form);
            }
            Ok(Next::Continue)
        }
        .boxed()
    }

    fn name(&self) -> &str {
        "UrlEncodedParser"
    }
}
