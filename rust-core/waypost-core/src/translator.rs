//! # Error Translator
//!
//! Terminal stage of every request. A successful pipeline passes its response
//! through untouched; any failure is logged and replaced by a 500 JSON body:
//!
//! ```json
//! {"code": 500, "message": "<failure message>"}
//! ```
//!
//! The pipeline owns a single `Response` value per request, so whatever
//! happens here, exactly one response leaves the server.

use crate::error::{Error, Result};
use crate::json::to_json;
use crate::response::Response;
use serde::{Deserialize, Serialize};
use tracing::error;

const JSON: &str = "application/json";

/// Body of framework-generated error responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// HTTP status code, repeated in the body
    pub code: u16,
    /// Human readable message
    pub message: String,
}

impl ErrorBody {
    fn into_response(self) -> Response {
        let status = self.code;
        let body = to_json(&self).unwrap_or_else(|_| {
            format!(r#"{{"code":{status},"message":"Internal Server Error"}}"#)
        });
        Response::with_body(status, JSON, body)
    }
}

/// Converts failures into HTTP responses
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorTranslator;

impl ErrorTranslator {
    /// Render `err` as the 500 JSON response
    #[must_use]
    pub fn translate(err: &Error) -> Response {
        error!(error = %err, "Request failed");
        ErrorBody {
            code: 500,
            message: err.to_string(),
        }
        .into_response()
    }

    /// Pass `response` through on success, replace it on failure
    #[must_use]
    pub fn finish(result: Result<()>, response: Response) -> Response {
        match result {
            Ok(()) => response,
            Err(err) => Self::translate(&err),
        }
    }

    /// 404 for requests no route or static directory answered
    #[must_use]
    pub fn not_found(method: &str, path: &str) -> Response {
        let err = Error::RouteNotFound {
            method: method.to_string(),
            path: path.to_string(),
        };
        ErrorBody {
            code: 404,
            message: err.to_string(),
        }
        .into_response()
    }
}
