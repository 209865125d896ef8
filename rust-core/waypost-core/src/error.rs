//! # Error Handling
//!
//! Centralized error types for Waypost core.
//! Uses `thiserror` for ergonomic error definitions.
//!
//! Errors fall into two groups:
//!
//! - **Startup** errors (`MissingMiddleware`, `BindError`, config errors)
//!   abort `Server::start`. `InvalidRoutePattern` is only logged, and the
//!   offending route is left out.
//! - **Request** errors (everything a controller or middleware returns) are
//!   forwarded to the error translator and rendered as a 500 response whose
//!   `message` is this type's `Display` output.

use thiserror::Error;

/// Result type alias for Waypost operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the Waypost runtime
#[derive(Error, Debug)]
pub enum Error {
    /// Server failed to bind to the specified address
    #[error("Failed to bind server to {address}: {source}")]
    BindError {
        /// The address we tried to bind to
        address: String,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// No compiled route matched the request
    #[error("Cannot {method} {path}")]
    RouteNotFound {
        /// Request method
        method: String,
        /// The path that wasn't matched
        path: String,
    },

    /// Invalid route pattern provided
    #[error("Invalid route pattern: {pattern}: {reason}")]
    InvalidRoutePattern {
        /// The invalid pattern
        pattern: String,
        /// Reason for invalidity
        reason: String,
    },

    /// A route referenced a middleware key that is not registered
    #[error("Middleware '{key}' is not registered (route {route})")]
    MissingMiddleware {
        /// The unresolved middleware key
        key: String,
        /// Route description, e.g. `GET /users`
        route: String,
    },

    /// The route's controller key did not resolve at compile time
    #[error("Invalid / Not Found Controller: {key}")]
    ControllerNotFound {
        /// The configured controller key
        key: String,
    },

    /// Failure raised by a controller, middleware or helper
    #[error("{message}")]
    Handler {
        /// Message echoed back in the error response
        message: String,
    },

    /// A controller or middleware panicked
    #[error("{message}")]
    Panic {
        /// Panic payload, when it was a string
        message: String,
    },

    /// Malformed JSON input
    #[error("Invalid JSON: {reason}")]
    InvalidJson {
        /// Parser message
        reason: String,
    },

    /// `AppConfig::set` was called with a key the model does not know
    #[error("Unknown configuration key: {key}")]
    UnknownConfigKey {
        /// The rejected key
        key: String,
    },

    /// `AppConfig::set` was given a value of the wrong shape for the key
    #[error("Configuration key '{key}' expects {expected}")]
    ConfigValueMismatch {
        /// The key being set
        key: String,
        /// Description of the expected value
        expected: &'static str,
    },

    /// A response body was written twice
    #[error("Response already sent")]
    ResponseAlreadySent,

    /// Request payload too large
    #[error("Payload too large: limit={limit} bytes, received={actual} bytes")]
    PayloadTooLarge {
        /// Max allowed size
        limit: usize,
        /// Actual size
        actual: usize,
    },

    /// HTTP protocol error
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a request-time failure carrying `message`
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
        }
    }
}
