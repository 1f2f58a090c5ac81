//! Tiered request-routing and caching engine.
//!
//! The engine sits behind a narrow FFI boundary and serves HTTP traffic on
//! behalf of a host scripting layer. Every request is classified into one of
//! three dispatch tiers:
//!
//! - **Static** — pre-computed bodies registered by the host, served from an
//!   exact-match map.
//! - **Cached** — responses produced once via the host callback and replayed
//!   from a TTL-bounded cache.
//! - **Dynamic** — pattern-matched routes that extract path parameters and
//!   call back into the host on every request.
//!
//! # Architecture Overview
//!
//! ```text
//!   host scripting layer
//!        │  add_route / set_routes / set_host_callback / get_stats
//!        ▼
//!   ┌─────────┐      ┌──────────────┐      ┌───────────────┐
//!   │   ffi   │─────▶│   routing    │◀─────│   dispatch    │
//!   │boundary │      │ table + match│      │ tier machine  │
//!   └────┬────┘      └──────────────┘      └───────┬───────┘
//!        │                                         │
//!        │ start_listener                 ┌────────┴────────┐
//!        ▼                                ▼                 ▼
//!   ┌─────────┐                    ┌─────────────┐   ┌─────────────┐
//!   │  http   │───────────────────▶│    cache    │   │ host call-  │
//!   │listener │                    │  TTL store  │   │ back (FFI)  │
//!   └─────────┘                    └─────────────┘   └─────────────┘
//! ```
//!
//! Cross-cutting: `config` (descriptors and validation), `observability`
//! (logging, performance counters), `engine` (process-wide state with
//! explicit init/shutdown).
//!
//! No panic, lock, or unwind crosses the FFI boundary; all failure is
//! communicated through return values and well-formed HTTP responses.

// Core subsystems
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod http;
pub mod routing;

// Cross-cutting concerns
pub mod engine;
pub mod ffi;
pub mod observability;

pub use config::schema::{EngineConfig, ListenerConfig, ListenerMode, RouteSpec, Tier};
pub use dispatch::dispatcher::Dispatcher;
pub use engine::Engine;
pub use http::server::EngineServer;
