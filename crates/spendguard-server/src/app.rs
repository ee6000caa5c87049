//! Router and shared application state.

use std::any::Any;
use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use spendguard_core::{BillingSwitch, BudgetReader, ProjectAllowList, SpendReader};

use crate::handler;

/// Shared, immutable per-process state. Built once at startup.
pub struct AppState {
    /// Projects this service may act on.
    pub allowlist: ProjectAllowList,
    /// Trailing-spend source.
    pub spend: Arc<dyn SpendReader>,
    /// Budget-ceiling source.
    pub budget: Arc<dyn BudgetReader>,
    /// Billing actuator.
    pub switch: Arc<dyn BillingSwitch>,
}

/// Build the webhook application.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(handler::handle_notification))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

/// Any uncaught fault becomes a generic 500; the payload stays server-side.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| err.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    tracing::error!(detail = %detail, "request handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}
