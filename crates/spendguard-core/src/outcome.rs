//! Evaluation and actuation outcomes.

use serde::{Deserialize, Serialize};

use crate::project::ProjectId;

/// `result` string reported when spend is under the ceiling.
pub const WITHIN_LIMIT_RESULT: &str = "OK: within limit";

/// Whether the ceiling is met or exceeded.
///
/// Non-strict: equality triggers actuation. The ceiling is "do not exceed
/// or meet", not "strictly exceed".
#[must_use]
pub fn ceiling_met(current_cost: f64, budget_limit: f64) -> bool {
    current_cost >= budget_limit
}

/// Classification of a failed billing-disable attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Structured HTTP error from the billing service.
    Http,
    /// Anything else that went wrong during the call.
    Other,
}

/// A captured actuation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuationFailure {
    /// Failure classification.
    pub kind: FailureKind,
    /// Upstream error detail.
    pub detail: String,
}

/// Outcome of attempting to sever billing linkage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingOutcome {
    /// Simulate mode was on; no mutation was attempted.
    Simulated,
    /// The billing-account association was cleared.
    Disabled,
    /// The attempt failed; detail is reported in-band, not escalated.
    Failed(ActuationFailure),
}

impl BillingOutcome {
    /// Shorthand for an HTTP-classified failure.
    #[must_use]
    pub fn http_failure(detail: impl Into<String>) -> Self {
        Self::Failed(ActuationFailure {
            kind: FailureKind::Http,
            detail: detail.into(),
        })
    }

    /// Shorthand for an unclassified failure.
    #[must_use]
    pub fn other_failure(detail: impl Into<String>) -> Self {
        Self::Failed(ActuationFailure {
            kind: FailureKind::Other,
            detail: detail.into(),
        })
    }

    /// Render the wire `result` string for the response payload.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Simulated => "Simulated".to_string(),
            Self::Disabled => "OK".to_string(),
            Self::Failed(failure) => match failure.kind {
                FailureKind::Http => format!("HTTP_ERROR: {}", failure.detail),
                FailureKind::Other => format!("ERROR: {}", failure.detail),
            },
        }
    }
}

/// The 200 response payload: what was evaluated and what happened.
///
/// Transient; returned synchronously and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    /// Project the evaluation ran for.
    pub project_id: String,
    /// Trailing-30-day spend at evaluation time.
    pub current_cost: f64,
    /// Configured fixed ceiling.
    pub budget_limit: f64,
    /// Rendered result string.
    pub result: String,
}

impl EvaluationOutcome {
    /// Outcome for spend under the ceiling; no actuation was attempted.
    #[must_use]
    pub fn within_limit(project: &ProjectId, current_cost: f64, budget_limit: f64) -> Self {
        Self {
            project_id: project.as_str().to_string(),
            current_cost,
            budget_limit,
            result: WITHIN_LIMIT_RESULT.to_string(),
        }
    }

    /// Outcome for a ceiling breach, carrying the actuation result.
    #[must_use]
    pub fn actuated(
        project: &ProjectId,
        current_cost: f64,
        budget_limit: f64,
        outcome: &BillingOutcome,
    ) -> Self {
        Self {
            project_id: project.as_str().to_string(),
            current_cost,
            budget_limit,
            result: outcome.render(),
        }
    }
}
