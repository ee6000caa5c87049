//! Billing actuation: severing a project's billing-account link.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use spendguard_core::{BillingOutcome, BillingSwitch, ProjectId};

use crate::auth::AccessTokenProvider;
use crate::ensure_success;
use crate::error::GcpError;

/// Default Cloud Billing REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://cloudbilling.googleapis.com";

/// Disables billing for a project by clearing its billing-account
/// association. One attempt, no retry; every failure is captured into the
/// returned outcome rather than propagated.
pub struct BillingSwitchClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn AccessTokenProvider>,
    simulate: bool,
}

impl BillingSwitchClient {
    /// Actuator against the real billing service.
    #[must_use]
    pub fn new(http: reqwest::Client, tokens: Arc<dyn AccessTokenProvider>, simulate: bool) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            tokens,
            simulate,
        }
    }

    /// Override the service endpoint (tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn clear_billing_account(&self, project: &ProjectId) -> Result<(), GcpError> {
        let token = self.tokens.access_token().await?;
        let url = format!("{}/v1/projects/{}/billingInfo", self.base_url, project);

        let response = self
            .http
            .put(url)
            .bearer_auth(token)
            .json(&json!({ "billingAccountName": "" }))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl BillingSwitch for BillingSwitchClient {
    async fn disable_billing(&self, project: &ProjectId) -> BillingOutcome {
        // Simulate mode is a hard gate: bail before any network call.
        if self.simulate {
            tracing::info!(
                project_id = %project,
                "simulate mode: would disable billing, no mutation issued"
            );
            return BillingOutcome::Simulated;
        }

        match self.clear_billing_account(project).await {
            Ok(()) => {
                tracing::info!(project_id = %project, "billing disabled");
                BillingOutcome::Disabled
            }
            Err(err @ GcpError::Http { .. }) => {
                tracing::error!(project_id = %project, error = %err, "billing disable rejected");
                BillingOutcome::http_failure(err.to_string())
            }
            Err(err) => {
                tracing::error!(project_id = %project, error = %err, "billing disable failed");
                BillingOutcome::other_failure(err.to_string())
            }
        }
    }
}
