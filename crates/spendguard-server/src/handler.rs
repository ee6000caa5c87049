//! The request pipeline: decode, authorize, evaluate, actuate, respond.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use spendguard_core::{
    EnvelopeError, EvaluationOutcome, GuardError, ceiling_met, envelope,
};

use crate::app::AppState;

/// POST `/` — evaluate one budget notification.
pub async fn handle_notification(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Response {
    match run(&state, &body).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => reject(&err),
    }
}

async fn run(state: &AppState, body: &[u8]) -> Result<EvaluationOutcome, GuardError> {
    let notification = envelope::decode(body)?;
    let project = notification.project_id;
    tracing::info!(project_id = %project, "budget notification received");

    // Authorization runs strictly before any data read.
    if !state.allowlist.is_authorized(&project) {
        tracing::warn!(project_id = %project, "project not on the allow-list");
        return Err(GuardError::Unauthorized(project));
    }

    // Independent reads; either failure aborts before the comparison.
    let (current_cost, budget_limit) = tokio::try_join!(
        state.spend.trailing_spend(&project),
        state.budget.budget_limit(),
    )?;
    tracing::info!(
        project_id = %project,
        current_cost,
        budget_limit,
        "trailing spend evaluated"
    );

    if ceiling_met(current_cost, budget_limit) {
        let outcome = state.switch.disable_billing(&project).await;
        Ok(EvaluationOutcome::actuated(
            &project,
            current_cost,
            budget_limit,
            &outcome,
        ))
    } else {
        Ok(EvaluationOutcome::within_limit(
            &project,
            current_cost,
            budget_limit,
        ))
    }
}

/// Map a pipeline error to its terminal response. Upstream detail is
/// logged here and never leaks into the client-visible body.
fn reject(err: &GuardError) -> Response {
    match err {
        GuardError::Malformed(EnvelopeError::MissingProjectId) => {
            tracing::warn!(error = %err, "rejecting notification");
            (StatusCode::BAD_REQUEST, "Bad Request: missing project_id").into_response()
        }
        GuardError::Malformed(detail) => {
            tracing::warn!(error = %detail, "rejecting notification");
            (StatusCode::BAD_REQUEST, "Bad Request").into_response()
        }
        GuardError::Unauthorized(project) => (
            StatusCode::FORBIDDEN,
            format!("Project '{project}' is not authorized."),
        )
            .into_response(),
        GuardError::Read(detail) => {
            tracing::error!(error = %detail, "evaluation aborted");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}
