//! # Response Compression
//!
//! gzip for response bodies, applied after the pipeline has produced the
//! final response.

use crate::error::Result;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use flate2::write::GzEncoder;
use flate2::Compression;
use hyper::body::Bytes;
use hyper::Method;
use std::io::Write;
use tracing::debug;

/// Compression configuration
#[derive(Debug, Clone)]
pub struct CompressionConfig {
    /// Enable compression
    pub enabled: bool,
    /// Minimum body size in bytes to trigger compression
    pub threshold: usize,
    /// Compression level (0-9)
    pub level: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 1024,
            level: 6,
        }
    }
}

impl CompressionConfig {
    /// Create a configuration, capping `level` at 9
    #[must_use]
    pub fn new(enabled: bool, threshold: usize, level: u32) -> Self {
        Self {
            enabled,
            threshold,
            level: level.min(9),
        }
    }

    /// Never compress
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            threshold: usize::MAX,
            level: 0,
        }
    }
}

/// Compress data using gzip
///
/// # Errors
///
/// Returns `Error::Io` if the encoder fails.
pub fn compress(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decide whether to compress based on config and body size
#[must_use]
pub const fn should_compress(config: &CompressionConfig, size: usize) -> bool {
    config.enabled && size >= config.threshold
}

fn accepts_gzip(req: &Request) -> bool {
    req.header("accept-encoding").is_some_and(|v| {
        v.split(',')
            .map(|enc| enc.split(';').next().unwrap_or_default().trim())
            .any(|enc| enc.eq_ignore_ascii_case("gzip") || enc == "*")
    })
}

/// gzip-encodes large response bodies for clients that accept it
#[derive(Debug, Clone, Default)]
pub struct CompressionMiddleware {
    config: CompressionConfig,
}

impl CompressionMiddleware {
    /// Middleware with the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Middleware with an explicit configuration
    #[must_use]
    pub const fn with_config(config: CompressionConfig) -> Self {
        Self { config }
    }
}

impl Middleware for CompressionMiddleware {
    fn after_response(&self, req: &Request, res: &mut Response) {
        if req.method == Method::HEAD
            || matches!(res.status, 204 | 304)
            || res.header("content-encoding").is_some()
            || !should_compress(&self.config, res.body.len())
            || !accepts_gzip(req)
        {
            return;
        }

        match compress(&res.body, self.config.level) {
            Ok(compressed) if compressed.len() < res.body.len() => {
                res.body = Bytes::from(compressed);
                res.set_header("Content-Encoding", "gzip");
                res.set_header("Vary", "Accept-Encoding");
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Compression skipped"),
        }
    }

    fn name(&self) -> &str {
        "CompressionMiddleware"
    }
}
