//! Route and listener configuration.
//!
//! # Data Flow
//! ```text
//! Registration (FFI):
//!     JSON catalog / per-route descriptor
//!     → schema.rs (serde parse)
//!     → validation.rs (semantic checks)
//!     → routing::table (compiled, atomic install)
//! ```
//!
//! # Design Decisions
//! - Serde handles syntax; validation.rs handles semantics
//! - Descriptors are rejected whole on the first invalid entry
//!   (the Route Table is never left half-updated)
//! - Listener settings carry a development/production mode switch

pub mod schema;
pub mod validation;
