//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! (method, path)
//!     → dispatcher.rs tier machine:
//!         1. static map hit    → stored body, 200
//!         2. pattern match     → cached tier: unexpired entry replays,
//!                                miss → host.rs callback → cache put
//!                              → dynamic tier: host.rs callback
//!         3. no match          → structured 404
//! ```
//!
//! # Design Decisions
//! - No engine lock is held while the host callback runs; route snapshots
//!   are cloned out before matching
//! - Callback failures become sanitized 500s; full detail is logged
//!   server-side only, and nothing unwinds past the dispatcher

pub mod dispatcher;
pub mod host;
