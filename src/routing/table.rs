//! The route table: all registered routes, split by dispatch side.
//!
//! Static routes live in an exact-match map and never touch the pattern
//! matcher. Cached and dynamic routes live in a registration-ordered list
//! that the dispatcher walks pattern-by-pattern.
//!
//! # Concurrency
//! Both sides sit behind `RwLock`: request-time lookups are the hot path and
//! share the read lock; registration is cold, takes the write locks briefly,
//! and never overlaps a callback invocation (the dispatcher clones snapshots
//! out before matching).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use thiserror::Error;

use crate::config::schema::{RouteSpec, Tier};
use crate::config::validation::{self, SpecError};
use crate::routing::pattern::{normalize_path, PatternError, RoutePattern};

const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Why a registration was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] PatternError),

    #[error("static route patterns cannot contain placeholders")]
    PlaceholderInStatic,

    #[error("invalid descriptor: {0}")]
    InvalidSpec(#[from] SpecError),
}

/// Pre-computed response payload for a static route.
#[derive(Debug, Clone)]
pub struct StaticBody {
    pub body: String,
    pub content_type: String,
}

/// A cached- or dynamic-tier route awaiting pattern matching.
#[derive(Debug, Clone)]
pub struct DynamicRoute {
    pub method: String,
    pub pattern: RoutePattern,
    pub tier: Tier,
    /// Cache TTL; present exactly when `tier == Tier::Cached`.
    pub ttl: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StaticKey {
    method: String,
    path: String,
}

/// Holds every registered route, keyed by method and pattern.
///
/// At most one route exists per `(method, structural pattern)` pair;
/// re-registration replaces the prior entry in place, keeping its
/// registration-order slot so dynamic tie-break stays stable.
#[derive(Debug, Default)]
pub struct RouteTable {
    statics: RwLock<HashMap<StaticKey, Arc<StaticBody>>>,
    dynamics: RwLock<Vec<Arc<DynamicRoute>>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one route, replacing any prior entry for the same
    /// `(method, pattern)` pair.
    pub fn register(&self, spec: &RouteSpec) -> Result<(), RegistrationError> {
        let compiled = compile_spec(spec)?;

        // Both write locks for the whole mutation: a cross-tier
        // re-registration must never be observable as "route absent".
        let mut statics = self.statics.write().unwrap_or_else(|e| e.into_inner());
        let mut dynamics = self.dynamics.write().unwrap_or_else(|e| e.into_inner());
        install(&mut statics, &mut dynamics, compiled);
        Ok(())
    }

    /// Install a whole catalog, all-or-nothing: every spec is validated and
    /// compiled before the first table mutation, and the previous contents
    /// are discarded entirely.
    pub fn replace_all(&self, specs: &[RouteSpec]) -> Result<(), RegistrationError> {
        let mut compiled = Vec::with_capacity(specs.len());
        for spec in specs {
            compiled.push(compile_spec(spec)?);
        }

        let mut new_statics = HashMap::new();
        let mut new_dynamics = Vec::new();
        for route in compiled {
            install(&mut new_statics, &mut new_dynamics, route);
        }

        let mut statics = self.statics.write().unwrap_or_else(|e| e.into_inner());
        let mut dynamics = self.dynamics.write().unwrap_or_else(|e| e.into_inner());
        *statics = new_statics;
        *dynamics = new_dynamics;
        Ok(())
    }

    /// Exact-match lookup of a static route. O(1) average, never consults
    /// the pattern matcher.
    pub fn lookup_static(&self, method: &str, path: &str) -> Option<Arc<StaticBody>> {
        let key = StaticKey {
            method: method.to_string(),
            path: normalize_path(path).to_string(),
        };
        let statics = self.statics.read().unwrap_or_else(|e| e.into_inner());
        statics.get(&key).cloned()
    }

    /// Registration-order snapshot of the cached/dynamic routes for one
    /// method. Cloned out so no table lock is held while matching or while
    /// the host callback runs.
    pub fn dynamic_snapshot(&self, method: &str) -> Vec<Arc<DynamicRoute>> {
        let dynamics = self.dynamics.read().unwrap_or_else(|e| e.into_inner());
        dynamics
            .iter()
            .filter(|r| r.method == method)
            .cloned()
            .collect()
    }

    pub fn static_len(&self) -> usize {
        self.statics.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn dynamic_len(&self) -> usize {
        self.dynamics.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// A validated, compiled registration ready to install.
struct CompiledRoute {
    method: String,
    pattern: RoutePattern,
    tier: Tier,
    ttl: Option<Duration>,
    payload: Option<StaticBody>,
}

fn compile_spec(spec: &RouteSpec) -> Result<CompiledRoute, RegistrationError> {
    validation::validate_spec(spec)?;
    let method = validation::normalize_method(&spec.method)?;
    let pattern = RoutePattern::compile(&spec.pattern)?;

    let payload = match spec.tier {
        Tier::Static => {
            if pattern.has_params() {
                return Err(RegistrationError::PlaceholderInStatic);
            }
            Some(StaticBody {
                // validate_spec guarantees the body is present
                body: spec.body.clone().unwrap_or_default(),
                content_type: spec
                    .content_type
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            })
        }
        Tier::Cached | Tier::Dynamic => None,
    };

    let ttl = match spec.tier {
        Tier::Cached => spec.ttl_ms.map(Duration::from_millis),
        _ => None,
    };

    Ok(CompiledRoute {
        method,
        pattern,
        tier: spec.tier,
        ttl,
        payload,
    })
}

fn install(
    statics: &mut HashMap<StaticKey, Arc<StaticBody>>,
    dynamics: &mut Vec<Arc<DynamicRoute>>,
    route: CompiledRoute,
) {
    let structural = route.pattern.structural_key();

    match route.tier {
        Tier::Static => {
            // A static pattern has no placeholders, so its structural key is
            // its normalized path; evict any dynamic entry it shadows.
            dynamics.retain(|r| {
                r.method != route.method || r.pattern.structural_key() != structural
            });
            let key = StaticKey {
                method: route.method,
                path: normalize_path(route.pattern.raw()).to_string(),
            };
            if let Some(payload) = route.payload {
                statics.insert(key, Arc::new(payload));
            }
        }
        Tier::Cached | Tier::Dynamic => {
            statics.retain(|k, _| {
                k.method != route.method || normalize_path(&k.path) != structural
            });
            let entry = Arc::new(DynamicRoute {
                method: route.method,
                pattern: route.pattern,
                tier: route.tier,
                ttl: route.ttl,
            });
            let existing = dynamics.iter_mut().find(|r| {
                r.method == entry.method && r.pattern.structural_key() == structural
            });
            match existing {
                // Replacement keeps the original registration-order slot
                Some(slot) => *slot = entry,
                None => dynamics.push(entry),
            }
        }
    }
}
