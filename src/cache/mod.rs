//! Response caching subsystem.
//!
//! # Design Decisions
//! - Fully concurrent map (DashMap): reads never block writes to other keys
//! - TTL measured from insertion; expired entries are absent on read and
//!   reclaimed by a periodic sweep
//! - Concurrent misses on one key compute redundantly; last write wins

pub mod response;
