//! Fixed-ceiling lookup against the Billing Budgets API.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use spendguard_core::{BudgetReader, ReadError};

use crate::auth::AccessTokenProvider;
use crate::ensure_success;
use crate::error::GcpError;

/// Default Billing Budgets REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://billingbudgets.googleapis.com";

/// Fetches the fixed spend ceiling configured on one budget resource.
pub struct BudgetApiReader {
    http: reqwest::Client,
    base_url: String,
    billing_account_id: String,
    budget_id: String,
    tokens: Arc<dyn AccessTokenProvider>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Budget {
    #[serde(default)]
    amount: Option<BudgetAmount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BudgetAmount {
    #[serde(default)]
    specified_amount: Option<Money>,
}

/// Proto JSON renders int64 `units` as a string; tolerate a bare number too.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Money {
    #[serde(default)]
    units: Option<serde_json::Value>,
}

impl BudgetApiReader {
    /// Reader for one budget under one billing account.
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        billing_account_id: impl Into<String>,
        budget_id: impl Into<String>,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            billing_account_id: billing_account_id.into(),
            budget_id: budget_id.into(),
            tokens,
        }
    }

    /// Override the service endpoint (tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn fixed_limit(&self) -> Result<f64, GcpError> {
        let token = self.tokens.access_token().await?;
        let url = format!(
            "{}/v1/billingAccounts/{}/budgets/{}",
            self.base_url, self.billing_account_id, self.budget_id
        );

        let response = self.http.get(url).bearer_auth(token).send().await?;
        let response = ensure_success(response).await?;
        let budget: Budget = response
            .json()
            .await
            .map_err(|e| GcpError::MalformedResponse(e.to_string()))?;

        // Only the fixed "specified amount" variant is supported; anything
        // else must fail loudly, never substitute a default ceiling.
        let money = budget
            .amount
            .and_then(|amount| amount.specified_amount)
            .ok_or(GcpError::UnsupportedBudgetAmount)?;

        units_as_f64(money.units.as_ref())
    }
}

/// Whole currency units; sub-unit `nanos` are out of scope. Absent units
/// mean a zero ceiling.
fn units_as_f64(units: Option<&serde_json::Value>) -> Result<f64, GcpError> {
    match units {
        None | Some(serde_json::Value::Null) => Ok(0.0),
        Some(serde_json::Value::String(raw)) => raw.parse::<i64>().map(|v| v as f64).map_err(|_| {
            GcpError::MalformedResponse(format!("budget units is not an integer: '{raw}'"))
        }),
        Some(serde_json::Value::Number(n)) => n.as_i64().map(|v| v as f64).ok_or_else(|| {
            GcpError::MalformedResponse(format!("budget units is not an integer: {n}"))
        }),
        Some(other) => Err(GcpError::MalformedResponse(format!(
            "unexpected budget units: {other}"
        ))),
    }
}

#[async_trait]
impl BudgetReader for BudgetApiReader {
    async fn budget_limit(&self) -> Result<f64, ReadError> {
        self.fixed_limit().await.map_err(ReadError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BUDGET_PATH: &str = "/v1/billingAccounts/012345-6789AB-CDEF01/budgets/budget-1";

    fn reader(server: &MockServer) -> BudgetApiReader {
        BudgetApiReader::new(
            reqwest::Client::new(),
            "012345-6789AB-CDEF01",
            "budget-1",
            Arc::new(crate::auth::StaticTokenProvider::new("test-token")),
        )
        .with_base_url(&server.uri())
    }

    async fn mount_budget(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(BUDGET_PATH))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn reads_fixed_specified_amount() {
        let server = MockServer::start().await;
        mount_budget(
            &server,
            json!({
                "name": BUDGET_PATH.trim_start_matches("/v1/"),
                "amount": {"specifiedAmount": {"currencyCode": "USD", "units": "200", "nanos": 0}},
            }),
        )
        .await;

        let limit = reader(&server).budget_limit().await.expect("limit");
        assert_eq!(limit, 200.0);
    }

    #[tokio::test]
    async fn tolerates_numeric_units() {
        let server = MockServer::start().await;
        mount_budget(
            &server,
            json!({"amount": {"specifiedAmount": {"currencyCode": "USD", "units": 200}}}),
        )
        .await;

        let limit = reader(&server).budget_limit().await.expect("limit");
        assert_eq!(limit, 200.0);
    }

    #[tokio::test]
    async fn absent_units_is_a_zero_ceiling() {
        let server = MockServer::start().await;
        mount_budget(
            &server,
            json!({"amount": {"specifiedAmount": {"currencyCode": "USD"}}}),
        )
        .await;

        let limit = reader(&server).budget_limit().await.expect("limit");
        assert_eq!(limit, 0.0);
    }

    #[tokio::test]
    async fn last_period_amount_is_a_configuration_error() {
        let server = MockServer::start().await;
        mount_budget(&server, json!({"amount": {"lastPeriodAmount": {}}})).await;

        let err = reader(&server).budget_limit().await.expect_err("must fail");
        assert!(matches!(err, ReadError::Configuration(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn missing_amount_is_a_configuration_error() {
        let server = MockServer::start().await;
        mount_budget(&server, json!({"name": "budgets/budget-1"})).await;

        let err = reader(&server).budget_limit().await.expect_err("must fail");
        assert!(matches!(err, ReadError::Configuration(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn fetch_failure_is_a_data_source_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(BUDGET_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_string("budget not found"))
            .mount(&server)
            .await;

        let err = reader(&server).budget_limit().await.expect_err("must fail");
        assert!(matches!(err, ReadError::DataSource(_)), "got {err:?}");
    }
}
