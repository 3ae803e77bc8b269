//! Route handlers.

use std::any::Any;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use tracing::error;

use entra_collector::panic_message;

use crate::ApiState;

pub const OPENMETRICS_CONTENT_TYPE: &str =
    "application/openmetrics-text; version=1.0.0; charset=utf-8";

const INDEX_HTML: &str = r#"<html>
<head><title>Entra ID Exporter</title></head>
<body>
<h1>Entra ID Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
<p><a href="/health">Health</a></p>
</body>
</html>
"#;

fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}

/// GET /
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /health
pub async fn health() -> &'static str {
    "OK"
}

/// GET /metrics
pub async fn metrics(State(state): State<ApiState>) -> Response {
    match state.exporter.scrape().await {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            internal_error()
        }
    }
}

/// Turns a handler panic into a generic 500.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    error!(panic = %panic_message(payload.as_ref()), "panic while serving request");
    internal_error()
}
