//! # JSON Module
//!
//! JSON parsing with simd-json, serialization with serde_json.
//! Used for request bodies, the settings document and declarative route files.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Parse a JSON string to a typed value using simd-json
///
/// # Errors
///
/// Returns `Error::InvalidJson` if parsing fails
pub fn parse_json<T: DeserializeOwned>(json_str: &str) -> Result<T> {
    let mut bytes = json_str.as_bytes().to_vec();
    parse_json_bytes(&mut bytes)
}

/// Parse JSON bytes in place using simd-json
///
/// simd-json mutates its input buffer, hence `&mut`.
///
/// # Errors
///
/// Returns `Error::InvalidJson` if parsing fails
pub fn parse_json_bytes<T: DeserializeOwned>(bytes: &mut [u8]) -> Result<T> {
    simd_json::from_slice(bytes).map_err(|e| Error::InvalidJson {
        reason: e.to_string(),
    })
}

/// Serialize a value to a JSON string
///
/// # Errors
///
/// Returns `Error::Json` if the value cannot be serialized
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}
