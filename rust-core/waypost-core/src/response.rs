//! # HTTP Response
//!
//! Mutable response handed to middlewares and controllers. Nothing reaches
//! the wire until the pipeline finishes, so a request always produces
//! exactly one hyper response.

use crate::error::{Error, Result};
use crate::json::to_json;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::StatusCode;
use serde::Serialize;
use std::collections::HashMap;

/// HTTP response under construction
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: Bytes,
    /// Content type
    pub content_type: String,
    /// Response headers (other than `Content-Type`)
    pub headers: HashMap<String, String>,
    sent: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 200,
            body: Bytes::new(),
            content_type: "text/plain; charset=utf-8".to_string(),
            headers: HashMap::new(),
            sent: false,
        }
    }
}

impl Response {
    /// Create an empty 200 response
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a finished response in one go
    ///
    /// Used by the framework for error, not-found and static responses.
    #[must_use]
    pub fn with_body(status: u16, content_type: &str, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
            content_type: content_type.to_string(),
            headers: HashMap::new(),
            sent: true,
        }
    }

    /// Set status code
    pub fn status(&mut self, status: u16) -> &mut Self {
        self.status = status;
        self
    }

    /// Write a text body
    ///
    /// # Errors
    ///
    /// Returns `Error::ResponseAlreadySent` if a body was already written.
    pub fn send(&mut self, body: impl Into<String>) -> Result<()> {
        self.write(Bytes::from(body.into()))
    }

    /// Serialize `value` as the JSON body
    ///
    /// # Errors
    ///
    /// Returns `Error::ResponseAlreadySent` if a body was already written,
    /// `Error::Json` if `value` fails to serialize.
    pub fn json<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let body = to_json(value)?;
        self.write(Bytes::from(body))?;
        self.content_type = "application/json".to_string();
        Ok(())
    }

    /// Write a raw body with an explicit content type
    ///
    /// # Errors
    ///
    /// Returns `Error::ResponseAlreadySent` if a body was already written.
    pub fn send_bytes(&mut self, body: impl Into<Bytes>, content_type: &str) -> Result<()> {
        self.write(body.into())?;
        self.content_type = content_type.to_string();
        Ok(())
    }

    fn write(&mut self, body: Bytes) -> Result<()> {
        if self.sent {
            return Err(Error::ResponseAlreadySent);
        }
        self.body = body;
        self.sent = true;
        Ok(())
    }

    /// Whether a body has been written
    #[must_use]
    pub const fn is_sent(&self) -> bool {
        self.sent
    }

    /// Set or override a header
    pub fn set_header(&mut self, key: &str, value: &str) {
        if key.eq_ignore_ascii_case("content-type") {
            self.content_type = value.to_string();
        } else {
            self.headers.insert(key.to_ascii_lowercase(), value.to_string());
        }
    }

    /// Get a header (case-insensitive)
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        if key.eq_ignore_ascii_case("content-type") {
            return Some(&self.content_type);
        }
        self.headers
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Body as UTF-8 text, if it is valid UTF-8
    #[must_use]
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Convert to hyper Response
    pub(crate) fn into_hyper(self) -> hyper::Response<Full<Bytes>> {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut builder = hyper::Response::builder()
            .status(status)
            .header("Content-Type", &self.content_type);
        for (k, v) in &self.headers {
            builder = builder.header(k.as_str(), v.as_str());
        }

        builder
            .body(Full::new(self.body))
            .unwrap_or_else(|_| {
                let mut fallback = hyper::Response::new(Full::new(Bytes::from_static(
                    b"Internal Server Error",
                )));
                *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                fallback
            })
    }
}
