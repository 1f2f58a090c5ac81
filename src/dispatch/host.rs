//! The host-language callback capability.
//!
//! The engine depends on a single-method capability: given `(method, path,
//! params)`, produce a response envelope. Any host environment that can
//! satisfy this synchronous contract works; the FFI-backed implementation
//! below marshals the exchange as JSON C strings.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::routing::pattern::ParamMap;

/// Failure while producing a response through the host.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallbackError {
    #[error("no host callback registered")]
    Unregistered,

    #[error("request payload could not be encoded: {0}")]
    Encoding(String),

    #[error("host callback returned a null response")]
    NullResponse,

    #[error("host callback response was not valid UTF-8")]
    InvalidUtf8,

    #[error("host callback response was not a valid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("host callback task failed: {0}")]
    TaskFailed(String),
}

/// Response envelope returned by the host handler.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct HostResponse {
    /// HTTP status; a host signalling absence returns 404 here.
    #[serde(default = "default_status")]
    pub status: u16,

    pub body: String,

    #[serde(default = "default_content_type")]
    pub content_type: String,
}

fn default_status() -> u16 {
    200
}

fn default_content_type() -> String {
    "application/json".to_string()
}

/// Request payload handed to the host.
#[derive(Debug, Serialize)]
struct HostRequest<'a> {
    method: &'a str,
    path: &'a str,
    params: &'a ParamMap,
}

/// Single-method capability the dispatcher depends on.
pub trait HostCallback: Send + Sync {
    fn invoke(&self, method: &str, path: &str, params: &ParamMap)
        -> Result<HostResponse, CallbackError>;
}

/// Raw callback signature crossing the FFI boundary: JSON request in, JSON
/// envelope out.
pub type RawHostCallback = extern "C" fn(*const c_char) -> *mut c_char;

/// [`HostCallback`] backed by a raw function pointer from the host runtime.
///
/// The engine copies the response bytes out of the returned buffer before
/// returning control; the host retains ownership of that buffer.
pub struct FfiHostCallback {
    raw: RawHostCallback,
}

impl FfiHostCallback {
    pub fn new(raw: RawHostCallback) -> Self {
        Self { raw }
    }
}

impl HostCallback for FfiHostCallback {
    fn invoke(
        &self,
        method: &str,
        path: &str,
        params: &ParamMap,
    ) -> Result<HostResponse, CallbackError> {
        let request = HostRequest {
            method,
            path,
            params,
        };
        let payload =
            serde_json::to_string(&request).map_err(|e| CallbackError::Encoding(e.to_string()))?;
        let c_payload =
            CString::new(payload).map_err(|e| CallbackError::Encoding(e.to_string()))?;

        let response_ptr = (self.raw)(c_payload.as_ptr());
        if response_ptr.is_null() {
            return Err(CallbackError::NullResponse);
        }

        // Copy out immediately; the buffer belongs to the host.
        let text = unsafe { CStr::from_ptr(response_ptr) }
            .to_str()
            .map_err(|_| CallbackError::InvalidUtf8)?
            .to_owned();

        serde_json::from_str(&text).map_err(|e| CallbackError::InvalidEnvelope(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_defaults_apply() {
        let envelope: HostResponse = serde_json::from_str(r#"{"body": "hi"}"#).unwrap();
        assert_eq!(envelope.status, 200);
        assert_eq!(envelope.content_type, "application/json");

        let envelope: HostResponse =
            serde_json::from_str(r#"{"status": 404, "body": "{}", "content_type": "text/plain"}"#)
                .unwrap();
        assert_eq!(envelope.status, 404);
        assert_eq!(envelope.content_type, "text/plain");
    }

    #[test]
    fn envelope_requires_body() {
        assert!(serde_json::from_str::<HostResponse>(r#"{"status": 200}"#).is_err());
    }
}
