//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (cold path):
//!     RouteSpec
//!     → pattern.rs (compile: literal/param segments, structural key)
//!     → table.rs (validate, install atomically)
//!
//! Request (hot path):
//!     (method, path)
//!     → table.rs static map (exact match, O(1))
//!     → table.rs dynamic snapshot → pattern.rs match (registration order)
//! ```
//!
//! # Design Decisions
//! - Patterns compiled once at registration, never at request time
//! - No regex: fixed-arity segment walk, deterministic and allocation-light
//! - First full match wins, in registration order
//! - Static lookups never touch the matcher

pub mod pattern;
pub mod table;
