//! `extern "C"` entry points for the host scripting layer.
//!
//! Every function follows the same discipline: validate raw input, convert
//! to owned Rust data, delegate to the engine, and report failure through
//! the return value. [`std::panic::catch_unwind`] wraps each body so that a
//! bug in the engine surfaces as a failure sentinel, never as an unwind
//! across the boundary.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, warn};

use crate::config::schema::{
    parse_catalog, EngineConfig, ListenerConfig, ListenerMode, RouteSpec, Tier,
};
use crate::dispatch::host::{FfiHostCallback, RawHostCallback};
use crate::engine::{self, Engine};
use crate::http::server::EngineServer;
use crate::observability::logging;

/// Run a boundary body, converting any panic into `false`.
fn guarded<F: FnOnce() -> bool>(name: &str, body: F) -> bool {
    catch_unwind(AssertUnwindSafe(body)).unwrap_or_else(|_| {
        error!(function = name, "panic contained at FFI boundary");
        false
    })
}

/// Read a NUL-terminated UTF-8 string. `None` for null pointers or invalid
/// encoding.
fn read_cstr(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    // Safety: non-null and NUL-terminated per the boundary contract; the
    // bytes are copied before returning control.
    let text = unsafe { CStr::from_ptr(ptr) };
    text.to_str().ok().map(str::to_owned)
}

/// Initialize the engine. Idempotent; later calls succeed without effect.
#[no_mangle]
pub extern "C" fn engine_init() -> bool {
    guarded("engine_init", || {
        engine::init();
        true
    })
}

/// Tear the engine down, signalling a running listener to stop. Returns
/// `false` if nothing was initialized.
#[no_mangle]
pub extern "C" fn engine_shutdown() -> bool {
    guarded("engine_shutdown", engine::shutdown)
}

/// Register one route.
///
/// `tier` is one of `"static"`, `"cached"`, `"dynamic"`. `ttl_ms` applies to
/// the cached tier and must be positive there. `body` carries the
/// pre-computed payload for static routes and may be null otherwise.
#[no_mangle]
pub extern "C" fn add_route(
    method: *const c_char,
    pattern: *const c_char,
    tier: *const c_char,
    ttl_ms: u64,
    body: *const c_char,
) -> bool {
    guarded("add_route", || {
        let (Some(method), Some(pattern), Some(tier_name)) =
            (read_cstr(method), read_cstr(pattern), read_cstr(tier))
        else {
            warn!("add_route called with null or non-UTF-8 argument");
            return false;
        };
        let Some(tier) = Tier::from_name(&tier_name) else {
            warn!(tier = %tier_name, "add_route called with unknown tier");
            return false;
        };

        let spec = RouteSpec {
            method,
            pattern,
            tier,
            ttl_ms: (ttl_ms > 0).then_some(ttl_ms),
            body: read_cstr(body),
            content_type: None,
        };

        match engine::init().table().register(&spec) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    method = %spec.method,
                    pattern = %spec.pattern,
                    error = %err,
                    "route registration rejected"
                );
                false
            }
        }
    })
}

/// Install a whole route catalog from a UTF-8 JSON buffer, all-or-nothing.
///
/// Format: `{method: {pattern: {tier, ttl_ms?, body?, content_type?}}}`.
#[no_mangle]
pub extern "C" fn set_routes(data: *const u8, len: usize) -> bool {
    guarded("set_routes", || {
        if data.is_null() || len == 0 {
            warn!("set_routes called with null or empty buffer");
            return false;
        }
        // Safety: non-null with `len` readable bytes per the boundary
        // contract; copied out of host memory before any parsing.
        let bytes = unsafe { std::slice::from_raw_parts(data, len) };
        let Ok(text) = std::str::from_utf8(bytes) else {
            warn!("set_routes buffer is not valid UTF-8");
            return false;
        };

        let specs = match parse_catalog(text) {
            Ok(specs) => specs,
            Err(err) => {
                warn!(error = %err, "set_routes catalog failed to parse");
                return false;
            }
        };

        match engine::init().table().replace_all(&specs) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "set_routes catalog rejected, table unchanged");
                false
            }
        }
    })
}

/// Register the host handler invoked for dynamic and cached-tier misses.
#[no_mangle]
pub extern "C" fn set_host_callback(callback: Option<RawHostCallback>) -> bool {
    guarded("set_host_callback", || {
        let Some(raw) = callback else {
            warn!("set_host_callback called with null function pointer");
            return false;
        };
        engine::init()
            .dispatcher()
            .set_callback(Arc::new(FfiHostCallback::new(raw)));
        true
    })
}

/// Bind and serve. Blocks the calling thread for the life of the listener —
/// the host runs this on a dedicated thread, as with the previous engine
/// generation.
///
/// `address` may be null: development mode binds loopback, production binds
/// all interfaces. A second call while a listener is running returns
/// `false` without spawning anything.
#[no_mangle]
pub extern "C" fn start_listener(address: *const c_char, port: u16, production: bool) -> bool {
    guarded("start_listener", || {
        let mode = if production {
            ListenerMode::Production
        } else {
            ListenerMode::Development
        };
        logging::init(mode);

        let address = if address.is_null() {
            None
        } else {
            match read_cstr(address) {
                Some(addr) => Some(addr),
                None => {
                    warn!("start_listener address is not valid UTF-8");
                    return false;
                }
            }
        };

        let engine = engine::init();
        if !engine.try_claim_listener() {
            warn!("start_listener refused: listener already running");
            return false;
        }

        let config = EngineConfig {
            listener: ListenerConfig {
                address,
                port,
                mode,
            },
            ..Default::default()
        };

        let served = run_listener(&engine, config);
        engine.release_listener();
        served
    })
}

fn run_listener(engine: &Arc<Engine>, config: EngineConfig) -> bool {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %err, "failed to build the listener runtime");
            return false;
        }
    };

    runtime.block_on(async {
        let bind_address = config.listener.bind_address();
        let listener = match TcpListener::bind(&bind_address).await {
            Ok(listener) => listener,
            Err(err) => {
                error!(address = %bind_address, error = %err, "failed to bind listener");
                return false;
            }
        };

        let server = EngineServer::new(
            config,
            engine.dispatcher().clone(),
            engine.cache().clone(),
        );
        match server.run(listener, engine.shutdown_signal()).await {
            Ok(()) => true,
            Err(err) => {
                error!(error = %err, "listener terminated with an error");
                false
            }
        }
    })
}

/// Serialize the current performance snapshot. The returned string must be
/// released with [`free_string`]. Null on failure.
#[no_mangle]
pub extern "C" fn get_stats() -> *mut c_char {
    let result = catch_unwind(|| {
        let snapshot = engine::init().counters().snapshot();
        let json = serde_json::to_string(&snapshot).ok()?;
        CString::new(json).ok()
    });

    match result {
        Ok(Some(stats)) => stats.into_raw(),
        Ok(None) => std::ptr::null_mut(),
        Err(_) => {
            error!(function = "get_stats", "panic contained at FFI boundary");
            std::ptr::null_mut()
        }
    }
}

/// Reclaim a string previously returned by this library. Null is a no-op.
#[no_mangle]
pub extern "C" fn free_string(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    // Safety: only pointers produced by `CString::into_raw` in this library
    // are valid here, per the boundary contract.
    unsafe {
        drop(CString::from_raw(ptr));
    }
}

/// Drop every cached response, expired or not.
#[no_mangle]
pub extern "C" fn clear_cache() -> bool {
    guarded("clear_cache", || {
        engine::init().cache().clear();
        true
    })
}
