//! Tier selection and response production.
//!
//! Per-request state machine:
//!
//! 1. **Static check** — exact route-table lookup, no matcher involved.
//! 2. **Dynamic match** — walk the method's cached/dynamic routes in
//!    registration order; the first full pattern match wins.
//! 3. **Produce** — a cached-tier match replays an unexpired entry for
//!    `(method, path)`; on a miss (and for every dynamic-tier match) the
//!    host callback runs, and a cached-tier 200 result populates the cache.
//! 4. **No match** — structured 404.
//!
//! The cache is consulted only after a route matches as cached tier, so a
//! route that was removed or re-registered under another tier can never
//! serve stale cached bytes; its orphaned entries age out via TTL and the
//! background sweep.
//!
//! Callback errors are converted here to sanitized 500s and never propagate
//! further.

use std::sync::{Arc, RwLock};

use serde_json::json;
use tracing::{debug, error};

use crate::cache::response::{CacheKey, ResponseCache};
use crate::config::schema::Tier;
use crate::dispatch::host::{CallbackError, HostCallback, HostResponse};
use crate::observability::metrics::PerfCounters;
use crate::routing::pattern::{normalize_path, ParamMap};
use crate::routing::table::RouteTable;

const ERROR_CONTENT_TYPE: &str = "application/json";

/// The response produced for one request, plus the tier that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub status: u16,
    pub body: String,
    pub content_type: String,
    /// Tier label surfaced in the `x-engine-tier` response header.
    pub tier: &'static str,
}

impl DispatchOutcome {
    fn new(status: u16, body: String, content_type: String, tier: &'static str) -> Self {
        Self {
            status,
            body,
            content_type,
            tier,
        }
    }
}

/// Routes requests through the tier machine.
pub struct Dispatcher {
    table: Arc<RouteTable>,
    cache: Arc<ResponseCache>,
    counters: Arc<PerfCounters>,
    // Cold-path writes (host registers once), hot-path reads.
    callback: RwLock<Option<Arc<dyn HostCallback>>>,
}

impl Dispatcher {
    pub fn new(
        table: Arc<RouteTable>,
        cache: Arc<ResponseCache>,
        counters: Arc<PerfCounters>,
    ) -> Self {
        Self {
            table,
            cache,
            counters,
            callback: RwLock::new(None),
        }
    }

    /// Install or replace the host callback.
    pub fn set_callback(&self, callback: Arc<dyn HostCallback>) {
        let mut slot = self.callback.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(callback);
    }

    fn current_callback(&self) -> Option<Arc<dyn HostCallback>> {
        self.callback
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Produce a response for `(method, path)`.
    pub async fn dispatch(&self, method: &str, path: &str) -> DispatchOutcome {
        let path = normalize_path(path);

        // Tier 1: static
        if let Some(hit) = self.table.lookup_static(method, path) {
            self.counters.record_static_hit();
            return DispatchOutcome::new(200, hit.body.clone(), hit.content_type.clone(), "static");
        }

        // Tiers 2 and 3: registration order, first full match wins
        for route in self.table.dynamic_snapshot(method) {
            let Some(params) = route.pattern.match_path(path) else {
                continue;
            };

            // The cache speaks only for the route that matched; anything a
            // removed or re-tiered route left behind stays unreachable.
            let cache_key = CacheKey::new(method, path);
            if route.tier == Tier::Cached {
                if let Some(entry) = self.cache.get(&cache_key) {
                    self.counters.record_cache_hit();
                    debug!(
                        method,
                        path,
                        remaining_ms = entry.remaining().as_millis() as u64,
                        "cache hit"
                    );
                    return DispatchOutcome::new(
                        200,
                        entry.body.to_string(),
                        entry.content_type,
                        "cached",
                    );
                }
                self.counters.record_cache_miss();
            }
            self.counters.record_dynamic_call();

            match self.invoke_host(method, path, params).await {
                Ok(response) => {
                    if route.tier == Tier::Cached && response.status == 200 {
                        if let Some(ttl) = route.ttl {
                            self.cache.put(
                                cache_key,
                                response.body.clone(),
                                response.content_type.clone(),
                                ttl,
                            );
                        }
                    }
                    let tier = match route.tier {
                        Tier::Cached => "cached",
                        _ => "dynamic",
                    };
                    return DispatchOutcome::new(
                        response.status,
                        response.body,
                        response.content_type,
                        tier,
                    );
                }
                Err(err) => {
                    // Full detail stays server-side; the client gets a
                    // sanitized body.
                    self.counters.record_error();
                    error!(method, path, error = %err, "host callback failed");
                    return DispatchOutcome::new(
                        500,
                        json!({"error": "internal error"}).to_string(),
                        ERROR_CONTENT_TYPE.to_string(),
                        "error",
                    );
                }
            }
        }

        // Tier 4: nothing matched
        DispatchOutcome::new(
            404,
            json!({"error": "not found", "path": path, "method": method}).to_string(),
            ERROR_CONTENT_TYPE.to_string(),
            "none",
        )
    }

    /// Run the host callback on the blocking pool. The callback may block on
    /// the host runtime's scheduler, and no engine lock is held across it.
    async fn invoke_host(
        &self,
        method: &str,
        path: &str,
        params: ParamMap,
    ) -> Result<HostResponse, CallbackError> {
        let callback = self.current_callback().ok_or(CallbackError::Unregistered)?;
        let method = method.to_string();
        let path = path.to_string();

        tokio::task::spawn_blocking(move || callback.invoke(&method, &path, &params))
            .await
            .map_err(|e| CallbackError::TaskFailed(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RouteSpec;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records invocations and replays a scripted result.
    struct MockHost {
        calls: AtomicU64,
        last_params: Mutex<Option<ParamMap>>,
        result: Box<dyn Fn(u64) -> Result<HostResponse, CallbackError> + Send + Sync>,
    }

    impl MockHost {
        fn ok(body: &str) -> Self {
            let body = body.to_string();
            Self::with(move |_| {
                Ok(HostResponse {
                    status: 200,
                    body: body.clone(),
                    content_type: "application/json".to_string(),
                })
            })
        }

        fn with<F>(f: F) -> Self
        where
            F: Fn(u64) -> Result<HostResponse, CallbackError> + Send + Sync + 'static,
        {
            Self {
                calls: AtomicU64::new(0),
                last_params: Mutex::new(None),
                result: Box::new(f),
            }
        }

        fn call_count(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl HostCallback for MockHost {
        fn invoke(
            &self,
            _method: &str,
            _path: &str,
            params: &ParamMap,
        ) -> Result<HostResponse, CallbackError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_params.lock().unwrap() = Some(params.clone());
            (self.result)(n)
        }
    }

    fn make_dispatcher() -> (Dispatcher, Arc<RouteTable>, Arc<PerfCounters>) {
        let table = Arc::new(RouteTable::new());
        let counters = Arc::new(PerfCounters::new());
        let dispatcher = Dispatcher::new(
            table.clone(),
            Arc::new(ResponseCache::new()),
            counters.clone(),
        );
        (dispatcher, table, counters)
    }

    fn register(table: &RouteTable, method: &str, pattern: &str, tier: Tier, ttl_ms: Option<u64>) {
        table
            .register(&RouteSpec {
                method: method.to_string(),
                pattern: pattern.to_string(),
                tier,
                ttl_ms,
                body: (tier == Tier::Static).then(|| r#"{"static":true}"#.to_string()),
                content_type: None,
            })
            .unwrap();
    }

    #[tokio::test]
    async fn static_routes_never_reach_the_host() {
        let (dispatcher, table, counters) = make_dispatcher();
        register(&table, "GET", "/health", Tier::Static, None);
        let host = Arc::new(MockHost::ok("unused"));
        dispatcher.set_callback(host.clone());

        for _ in 0..3 {
            let outcome = dispatcher.dispatch("GET", "/health").await;
            assert_eq!(outcome.status, 200);
            assert_eq!(outcome.body, r#"{"static":true}"#);
            assert_eq!(outcome.tier, "static");
        }

        assert_eq!(host.call_count(), 0);
        assert_eq!(counters.snapshot().static_hits, 3);
    }

    #[tokio::test]
    async fn dynamic_route_passes_extracted_params() {
        let (dispatcher, table, _) = make_dispatcher();
        register(&table, "GET", "/user/{id}", Tier::Dynamic, None);
        let host = Arc::new(MockHost::ok(r#"{"found":true}"#));
        dispatcher.set_callback(host.clone());

        let outcome = dispatcher.dispatch("GET", "/user/7").await;
        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.tier, "dynamic");
        assert_eq!(host.call_count(), 1);

        let params = host.last_params.lock().unwrap().clone().unwrap();
        assert_eq!(params.get("id"), Some("7"));
    }

    #[tokio::test]
    async fn cached_route_replays_within_ttl() {
        let (dispatcher, table, counters) = make_dispatcher();
        register(&table, "GET", "/stats", Tier::Cached, Some(60_000));
        let host = Arc::new(MockHost::with(|n| {
            Ok(HostResponse {
                status: 200,
                body: format!(r#"{{"call":{n}}}"#),
                content_type: "application/json".to_string(),
            })
        }));
        dispatcher.set_callback(host.clone());

        let first = dispatcher.dispatch("GET", "/stats").await;
        let second = dispatcher.dispatch("GET", "/stats").await;

        assert_eq!(first.body, second.body, "second response replayed bytes");
        assert_eq!(second.tier, "cached");
        assert_eq!(host.call_count(), 1);

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.cache_misses, 1);
        assert_eq!(snapshot.cache_hits, 1);
        assert_eq!(snapshot.dynamic_calls, 1);
    }

    #[tokio::test]
    async fn cached_route_recomputes_after_expiry() {
        let (dispatcher, table, _) = make_dispatcher();
        register(&table, "GET", "/stats", Tier::Cached, Some(30));
        let host = Arc::new(MockHost::ok(r#"{"n":1}"#));
        dispatcher.set_callback(host.clone());

        dispatcher.dispatch("GET", "/stats").await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        dispatcher.dispatch("GET", "/stats").await;

        assert_eq!(host.call_count(), 2);
    }

    #[tokio::test]
    async fn removed_route_stops_serving_cached_bytes() {
        let (dispatcher, table, _) = make_dispatcher();
        register(&table, "GET", "/stats", Tier::Cached, Some(60_000));
        let host = Arc::new(MockHost::ok(r#"{"fresh":true}"#));
        dispatcher.set_callback(host.clone());

        dispatcher.dispatch("GET", "/stats").await;
        assert_eq!(dispatcher.dispatch("GET", "/stats").await.tier, "cached");

        // Route withdrawn; the unexpired cache entry must not resurrect it
        table.replace_all(&[]).unwrap();
        let outcome = dispatcher.dispatch("GET", "/stats").await;
        assert_eq!(outcome.status, 404);
        assert_eq!(outcome.tier, "none");
        assert_eq!(host.call_count(), 1);
    }

    #[tokio::test]
    async fn re_tiered_route_ignores_its_old_cache_entry() {
        let (dispatcher, table, _) = make_dispatcher();
        register(&table, "GET", "/stats", Tier::Cached, Some(60_000));
        let host = Arc::new(MockHost::with(|n| {
            Ok(HostResponse {
                status: 200,
                body: format!(r#"{{"call":{n}}}"#),
                content_type: "application/json".to_string(),
            })
        }));
        dispatcher.set_callback(host.clone());

        let cached = dispatcher.dispatch("GET", "/stats").await;

        // Same pattern re-registered as dynamic: every request reaches the
        // host again, whatever the old entry's TTL says
        register(&table, "GET", "/stats", Tier::Dynamic, None);
        let fresh = dispatcher.dispatch("GET", "/stats").await;
        assert_eq!(fresh.tier, "dynamic");
        assert_ne!(fresh.body, cached.body);
        assert_eq!(host.call_count(), 2);
    }

    #[tokio::test]
    async fn concurrent_cold_misses_compute_redundantly_last_write_wins() {
        const REQUESTS: usize = 4;

        let (dispatcher, table, counters) = make_dispatcher();
        register(&table, "GET", "/stats", Tier::Cached, Some(60_000));

        // Hold every callback at a barrier so all misses are in flight
        // before any result is stored
        let barrier = Arc::new(std::sync::Barrier::new(REQUESTS));
        let host = Arc::new(MockHost::with({
            let barrier = barrier.clone();
            move |n| {
                barrier.wait();
                Ok(HostResponse {
                    status: 200,
                    body: format!(r#"{{"call":{n}}}"#),
                    content_type: "application/json".to_string(),
                })
            }
        }));
        dispatcher.set_callback(host.clone());

        let dispatcher = Arc::new(dispatcher);
        let mut handles = Vec::new();
        for _ in 0..REQUESTS {
            let dispatcher = dispatcher.clone();
            handles.push(tokio::spawn(
                async move { dispatcher.dispatch("GET", "/stats").await },
            ));
        }

        let mut bodies = Vec::new();
        for handle in handles {
            let outcome = handle.await.unwrap();
            assert_eq!(outcome.status, 200);
            bodies.push(outcome.body);
        }

        // Every miss invoked the host independently
        bodies.sort();
        bodies.dedup();
        assert_eq!(bodies.len(), REQUESTS);
        assert_eq!(host.call_count(), REQUESTS as u64);
        assert_eq!(counters.snapshot().cache_misses, REQUESTS as u64);

        // Exactly one write survived; it replays without another host call
        let replay = dispatcher.dispatch("GET", "/stats").await;
        assert_eq!(replay.tier, "cached");
        assert!(bodies.contains(&replay.body));
        assert_eq!(host.call_count(), REQUESTS as u64);
    }

    #[tokio::test]
    async fn non_200_results_are_not_cached() {
        let (dispatcher, table, _) = make_dispatcher();
        register(&table, "GET", "/stats", Tier::Cached, Some(60_000));
        let host = Arc::new(MockHost::with(|_| {
            Ok(HostResponse {
                status: 404,
                body: r#"{"missing":true}"#.to_string(),
                content_type: "application/json".to_string(),
            })
        }));
        dispatcher.set_callback(host.clone());

        let first = dispatcher.dispatch("GET", "/stats").await;
        assert_eq!(first.status, 404);
        dispatcher.dispatch("GET", "/stats").await;
        assert_eq!(host.call_count(), 2);
    }

    #[tokio::test]
    async fn tie_break_follows_registration_order() {
        // Parameterized pattern first: it wins for /users/me
        let (dispatcher, table, _) = make_dispatcher();
        register(&table, "GET", "/users/{id}", Tier::Dynamic, None);
        register(&table, "GET", "/users/me", Tier::Dynamic, None);
        let host = Arc::new(MockHost::ok("{}"));
        dispatcher.set_callback(host.clone());

        dispatcher.dispatch("GET", "/users/me").await;
        let params = host.last_params.lock().unwrap().clone().unwrap();
        assert_eq!(params.get("id"), Some("me"));

        // Literal pattern first: no parameter extracted
        let (dispatcher, table, _) = make_dispatcher();
        register(&table, "GET", "/users/me", Tier::Dynamic, None);
        register(&table, "GET", "/users/{id}", Tier::Dynamic, None);
        let host = Arc::new(MockHost::ok("{}"));
        dispatcher.set_callback(host.clone());

        dispatcher.dispatch("GET", "/users/me").await;
        let params = host.last_params.lock().unwrap().clone().unwrap();
        assert!(params.is_empty());
    }

    #[tokio::test]
    async fn unmatched_request_yields_structured_404() {
        let (dispatcher, _, _) = make_dispatcher();
        let outcome = dispatcher.dispatch("GET", "/nowhere").await;
        assert_eq!(outcome.status, 404);
        assert_eq!(outcome.tier, "none");

        let body: serde_json::Value = serde_json::from_str(&outcome.body).unwrap();
        assert_eq!(body["error"], "not found");
        assert_eq!(body["path"], "/nowhere");
        assert_eq!(body["method"], "GET");
    }

    #[tokio::test]
    async fn callback_failure_becomes_sanitized_500() {
        let (dispatcher, table, counters) = make_dispatcher();
        register(&table, "GET", "/user/{id}", Tier::Dynamic, None);
        let host = Arc::new(MockHost::with(|_| {
            Err(CallbackError::InvalidEnvelope("boom".to_string()))
        }));
        dispatcher.set_callback(host);

        let outcome = dispatcher.dispatch("GET", "/user/1").await;
        assert_eq!(outcome.status, 500);
        assert_eq!(outcome.body, r#"{"error":"internal error"}"#);
        assert!(!outcome.body.contains("boom"), "detail must not leak");
        assert_eq!(counters.snapshot().errors, 1);
    }

    #[tokio::test]
    async fn missing_callback_becomes_500_not_panic() {
        let (dispatcher, table, counters) = make_dispatcher();
        register(&table, "GET", "/user/{id}", Tier::Dynamic, None);

        let outcome = dispatcher.dispatch("GET", "/user/1").await;
        assert_eq!(outcome.status, 500);
        assert_eq!(counters.snapshot().errors, 1);
    }
}
