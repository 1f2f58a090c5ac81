//! The asynchronous listener in front of the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::cache::response::ResponseCache;
use crate::config::schema::{EngineConfig, ListenerMode};
use crate::dispatch::dispatcher::{DispatchOutcome, Dispatcher};

/// Application state injected into the catch-all handler.
#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
}

/// HTTP server wiring for the engine.
pub struct EngineServer {
    router: Router,
    config: EngineConfig,
    cache: Arc<ResponseCache>,
}

impl EngineServer {
    pub fn new(config: EngineConfig, dispatcher: Arc<Dispatcher>, cache: Arc<ResponseCache>) -> Self {
        let state = AppState { dispatcher };
        let router = Self::build_router(state);
        Self {
            router,
            config,
            cache,
        }
    }

    /// Every path and method lands in the same handler; the dispatcher does
    /// the routing.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(engine_handler)
            .with_state(state)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Serve connections on `listener` until the shutdown signal fires.
    ///
    /// Also runs the periodic sweep of expired cache entries for the life of
    /// the server.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        match self.config.listener.mode {
            ListenerMode::Development => {
                info!(address = %addr, mode = "development", "engine listening");
                info!("visit http://{addr}");
            }
            ListenerMode::Production => {
                info!(address = %addr, "engine listening");
            }
        }

        // Background reclamation of expired cache entries
        let cache = self.cache.clone();
        let mut sweep_shutdown = shutdown.clone();
        let period = Duration::from_secs(self.config.cache.purge_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => cache.purge_expired(),
                    _ = sweep_shutdown.changed() => break,
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await?;

        info!("engine listener stopped");
        Ok(())
    }
}

/// Catch-all handler: classify, dispatch, respond.
async fn engine_handler(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    let outcome = state.dispatcher.dispatch(method.as_str(), uri.path()).await;
    into_response(outcome)
}

fn into_response(outcome: DispatchOutcome) -> Response {
    let status = StatusCode::from_u16(outcome.status).unwrap_or(StatusCode::OK);
    let built = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, outcome.content_type)
        .header("x-engine-tier", outcome.tier)
        .body(Body::from(outcome.body));

    // A host-supplied content type can be an invalid header value; the
    // client still gets a well-formed response rather than a dropped
    // connection.
    built.unwrap_or_else(|_| {
        let mut response = Response::new(Body::from(r#"{"error": "internal error"}"#));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}
