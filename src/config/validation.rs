//! Semantic validation of route descriptors.
//!
//! Serde guarantees the descriptor is syntactically well-formed; this module
//! checks the invariants that tie the fields together: method tokens, and the
//! tier/ttl/body coherence rules. Pattern structure (placeholder names,
//! segment shape) is validated when the pattern is compiled in
//! `routing::pattern`.

use thiserror::Error;

use crate::config::schema::{RouteSpec, Tier};

/// Descriptor-level validation failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("method must be a non-empty HTTP token")]
    InvalidMethod,

    #[error("cached routes require ttl_ms > 0")]
    MissingTtl,

    #[error("static routes require a pre-computed body")]
    MissingBody,
}

/// Normalize an HTTP method token to uppercase, rejecting empty or
/// non-token input.
pub fn normalize_method(method: &str) -> Result<String, SpecError> {
    if method.is_empty() || !method.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(SpecError::InvalidMethod);
    }
    Ok(method.to_ascii_uppercase())
}

/// Check the cross-field invariants of a route descriptor.
pub fn validate_spec(spec: &RouteSpec) -> Result<(), SpecError> {
    normalize_method(&spec.method)?;
    match spec.tier {
        Tier::Static => {
            if spec.body.is_none() {
                return Err(SpecError::MissingBody);
            }
        }
        Tier::Cached => {
            if spec.ttl_ms.map_or(true, |ttl| ttl == 0) {
                return Err(SpecError::MissingTtl);
            }
        }
        Tier::Dynamic => {}
    }
    Ok(())
}
