//! Process-wide engine state.
//!
//! The FFI boundary needs somewhere stable to hang the route table, cache,
//! counters and dispatcher between calls. Rather than ambient globals with
//! undefined lifetime, the engine is an explicitly initialized bundle behind
//! a single swappable slot: [`init`] is idempotent, [`shutdown`] tears the
//! slot down (and signals the listener), and every boundary call reads the
//! slot through a lock-free load.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwapOption;
use tokio::sync::watch;

use crate::cache::response::ResponseCache;
use crate::dispatch::dispatcher::Dispatcher;
use crate::observability::metrics::PerfCounters;
use crate::routing::table::RouteTable;

/// Everything the engine owns for the life of the process.
pub struct Engine {
    table: Arc<RouteTable>,
    cache: Arc<ResponseCache>,
    counters: Arc<PerfCounters>,
    dispatcher: Arc<Dispatcher>,
    listener_active: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
}

impl Engine {
    pub fn new() -> Self {
        let table = Arc::new(RouteTable::new());
        let cache = Arc::new(ResponseCache::new());
        let counters = Arc::new(PerfCounters::new());
        let dispatcher = Arc::new(Dispatcher::new(
            table.clone(),
            cache.clone(),
            counters.clone(),
        ));
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            table,
            cache,
            counters,
            dispatcher,
            listener_active: AtomicBool::new(false),
            shutdown_tx,
        }
    }

    pub fn table(&self) -> &Arc<RouteTable> {
        &self.table
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn counters(&self) -> &Arc<PerfCounters> {
        &self.counters
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Claim the single listener slot. Returns `false` if a listener is
    /// already running, so a second `start_listener` fails cleanly instead
    /// of spawning a duplicate.
    pub fn try_claim_listener(&self) -> bool {
        !self.listener_active.swap(true, Ordering::SeqCst)
    }

    /// Release the listener slot after the server exits.
    pub fn release_listener(&self) {
        self.listener_active.store(false, Ordering::SeqCst);
    }

    /// Subscribe to the shutdown signal the listener waits on.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Ask a running listener to stop serving.
    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

static ENGINE: ArcSwapOption<Engine> = ArcSwapOption::const_empty();
// Serializes init/shutdown; reads stay lock-free through the ArcSwap.
static LIFECYCLE: Mutex<()> = Mutex::new(());

/// Initialize the process-wide engine. Idempotent: a second call returns the
/// existing instance.
pub fn init() -> Arc<Engine> {
    let _guard = LIFECYCLE.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(engine) = ENGINE.load_full() {
        return engine;
    }
    let engine = Arc::new(Engine::new());
    ENGINE.store(Some(engine.clone()));
    engine
}

/// The current engine, if initialized.
pub fn current() -> Option<Arc<Engine>> {
    ENGINE.load_full()
}

/// Tear down the process-wide engine: signal the listener and empty the
/// slot so tests (and embedders) can start from scratch. Returns `false`
/// when nothing was initialized.
pub fn shutdown() -> bool {
    let _guard = LIFECYCLE.lock().unwrap_or_else(|e| e.into_inner());
    match ENGINE.swap(None) {
        Some(engine) => {
            engine.trigger_shutdown();
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The slot is process-global; these tests must not interleave.
    static TEST_GUARD: Mutex<()> = Mutex::new(());

    #[test]
    fn init_is_idempotent() {
        let _guard = TEST_GUARD.lock().unwrap_or_else(|e| e.into_inner());
        shutdown();

        let first = init();
        let second = init();
        assert!(Arc::ptr_eq(&first, &second));

        assert!(shutdown());
        assert!(!shutdown(), "second shutdown finds nothing");
        assert!(current().is_none());
    }

    #[test]
    fn listener_slot_is_claimed_once() {
        let _guard = TEST_GUARD.lock().unwrap_or_else(|e| e.into_inner());
        shutdown();

        let engine = init();
        assert!(engine.try_claim_listener());
        assert!(!engine.try_claim_listener());
        engine.release_listener();
        assert!(engine.try_claim_listener());

        shutdown();
    }

    #[test]
    fn shutdown_signal_reaches_subscribers() {
        let _guard = TEST_GUARD.lock().unwrap_or_else(|e| e.into_inner());
        shutdown();

        let engine = init();
        let rx = engine.shutdown_signal();
        assert!(!*rx.borrow());
        engine.trigger_shutdown();
        assert!(*rx.borrow());

        shutdown();
    }
}
