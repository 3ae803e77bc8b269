//! entra-api — HTTP surface of the Entra ID exporter.
//!
//! Scrapes are served from the collectors' caches and never call the
//! directory.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/` | Landing page |
//! | GET | `/metrics` | OpenMetrics exposition |
//! | GET | `/health` | Liveness, always `OK` |
//! | GET | `/debug/env` | Masked authentication environment (debug logging only) |

pub mod debug;
pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::catch_panic::CatchPanicLayer;

use entra_collector::Exporter;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub exporter: Arc<Exporter>,
}

/// Build the exporter router. `/debug/env` is mounted only when
/// `debug_env` is set.
pub fn build_router(exporter: Arc<Exporter>, debug_env: bool) -> Router {
    let state = ApiState { exporter };

    let mut router = Router::new()
        .route("/", get(handlers::index))
        .route("/metrics", get(handlers::metrics))
        .route("/health", get(handlers::health));

    if debug_env {
        router = router.route("/debug/env", get(debug::env));
    }

    router
        .with_state(state)
        .layer(CatchPanicLayer::custom(handlers::panic_response))
}
