//! HTTP front end.
//!
//! # Responsibilities
//! - Bind the listener and accept connections
//! - Feed every request to the Dispatcher via a catch-all handler
//! - Write results back without blocking other connections
//! - Run the periodic cache sweep alongside the server
//!
//! # Design Decisions
//! - The network loop is a commodity: axum/hyper on tokio, not hand-rolled
//! - Within one connection, HTTP/1.1 serialization preserves request order;
//!   across connections there is no ordering guarantee
//! - Graceful shutdown via the engine's watch channel

pub mod server;
