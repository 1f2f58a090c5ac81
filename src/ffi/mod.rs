//! The foreign-function boundary.
//!
//! # Responsibilities
//! - Expose route registration, callback wiring, listener lifecycle and
//!   stats export to the host scripting layer
//! - Validate every pointer, length and encoding before dereferencing
//! - Contain panics: no unwind ever crosses the boundary
//!
//! # Design Decisions
//! - All failure is communicated through return values (`false` / null),
//!   with a log line server-side; the process never aborts on bad input
//! - Strings returned to the host (`get_stats`) are reclaimed through
//!   `free_string`; buffers returned *by* the host callback stay owned by
//!   the host and are copied out immediately

pub mod boundary;
