//! Trailing-spend reads against the BigQuery billing export.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use spendguard_core::{ProjectId, ReadError, SpendReader};

use crate::auth::AccessTokenProvider;
use crate::ensure_success;
use crate::error::GcpError;

/// Default BigQuery REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://bigquery.googleapis.com";

/// Reads a project's summed cost over the trailing 30 days.
pub struct BigQuerySpendReader {
    http: reqwest::Client,
    base_url: String,
    bq_project_id: String,
    cost_table: String,
    tokens: Arc<dyn AccessTokenProvider>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest {
    query: String,
    use_legacy_sql: bool,
    parameter_mode: &'static str,
    query_parameters: Vec<QueryParameter>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryParameter {
    name: &'static str,
    parameter_type: ParameterType,
    parameter_value: ParameterValue,
}

#[derive(Debug, Serialize)]
struct ParameterType {
    r#type: &'static str,
}

#[derive(Debug, Serialize)]
struct ParameterValue {
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: Option<bool>,
    #[serde(default)]
    rows: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(default)]
    f: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    #[serde(default)]
    v: Option<serde_json::Value>,
}

impl BigQuerySpendReader {
    /// Reader over the given billing-export table.
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        bq_project_id: impl Into<String>,
        cost_table: impl Into<String>,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            bq_project_id: bq_project_id.into(),
            cost_table: cost_table.into(),
            tokens,
        }
    }

    /// Override the service endpoint (tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// The aggregation query. The window uses the warehouse's own
    /// `CURRENT_TIMESTAMP()`, not this process's clock; the project id goes
    /// through a named parameter, never string interpolation.
    fn query_text(&self) -> String {
        format!(
            "SELECT SUM(cost) AS total_cost \
             FROM `{}` \
             WHERE project.id = @project_id \
             AND usage_start_time >= TIMESTAMP_SUB(CURRENT_TIMESTAMP(), INTERVAL 30 DAY)",
            self.cost_table
        )
    }

    async fn sum_trailing_cost(&self, project: &ProjectId) -> Result<f64, GcpError> {
        let token = self.tokens.access_token().await?;
        let url = format!(
            "{}/bigquery/v2/projects/{}/queries",
            self.base_url, self.bq_project_id
        );
        let request = QueryRequest {
            query: self.query_text(),
            use_legacy_sql: false,
            parameter_mode: "NAMED",
            query_parameters: vec![QueryParameter {
                name: "project_id",
                parameter_type: ParameterType { r#type: "STRING" },
                parameter_value: ParameterValue {
                    value: project.as_str().to_string(),
                },
            }],
        };

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let payload: QueryResponse = response
            .json()
            .await
            .map_err(|e| GcpError::MalformedResponse(e.to_string()))?;

        if payload.job_complete == Some(false) {
            return Err(GcpError::MalformedResponse(
                "query did not complete within the synchronous window".into(),
            ));
        }

        aggregate_value(&payload)
    }
}

/// Single aggregate row expected; an empty result set or a NULL sum is a
/// valid "no recorded spend" state, not an error.
fn aggregate_value(payload: &QueryResponse) -> Result<f64, GcpError> {
    let Some(cell) = payload.rows.first().and_then(|row| row.f.first()) else {
        return Ok(0.0);
    };
    match &cell.v {
        None | Some(serde_json::Value::Null) => Ok(0.0),
        Some(serde_json::Value::String(raw)) => raw.parse().map_err(|_| {
            GcpError::MalformedResponse(format!("aggregate cell is not a number: '{raw}'"))
        }),
        Some(other) => Err(GcpError::MalformedResponse(format!(
            "unexpected aggregate cell: {other}"
        ))),
    }
}

#[async_trait]
impl SpendReader for BigQuerySpendReader {
    async fn trailing_spend(&self, project: &ProjectId) -> Result<f64, ReadError> {
        self.sum_trailing_cost(project).await.map_err(ReadError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const QUERIES_PATH: &str = "/bigquery/v2/projects/billing-admin/queries";

    fn reader(server: &MockServer) -> BigQuerySpendReader {
        BigQuerySpendReader::new(
            reqwest::Client::new(),
            "billing-admin",
            "billing-admin.exports.gcp_billing_export_v1",
            Arc::new(StaticTokenProvider::new("test-token")),
        )
        .with_base_url(&server.uri())
    }

    fn pid(raw: &str) -> ProjectId {
        ProjectId::new(raw).expect("valid id")
    }

    async fn mount_result(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path(QUERIES_PATH))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn sums_trailing_cost() {
        let server = MockServer::start().await;
        mount_result(
            &server,
            json!({"jobComplete": true, "rows": [{"f": [{"v": "250.0"}]}]}),
        )
        .await;

        let spend = reader(&server)
            .trailing_spend(&pid("oriproject"))
            .await
            .expect("spend");
        assert_eq!(spend, 250.0);
    }

    #[tokio::test]
    async fn sends_parameterized_query() {
        let server = MockServer::start().await;
        mount_result(
            &server,
            json!({"jobComplete": true, "rows": [{"f": [{"v": "1.5"}]}]}),
        )
        .await;

        reader(&server)
            .trailing_spend(&pid("oriproject"))
            .await
            .expect("spend");

        let requests = server.received_requests().await.expect("recorded");
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).expect("json");
        assert_eq!(body["useLegacySql"], json!(false));
        assert_eq!(body["parameterMode"], json!("NAMED"));
        assert_eq!(
            body["queryParameters"][0]["parameterValue"]["value"],
            json!("oriproject")
        );
        let query = body["query"].as_str().expect("query text");
        assert!(query.contains("SUM(cost)"));
        assert!(query.contains("@project_id"));
        assert!(query.contains("INTERVAL 30 DAY"));
        assert!(query.contains("`billing-admin.exports.gcp_billing_export_v1`"));
    }

    #[tokio::test]
    async fn empty_result_set_is_zero_spend() {
        let server = MockServer::start().await;
        mount_result(&server, json!({"jobComplete": true, "rows": []})).await;

        let spend = reader(&server)
            .trailing_spend(&pid("idleproject"))
            .await
            .expect("spend");
        assert_eq!(spend, 0.0);
    }

    #[tokio::test]
    async fn null_aggregate_is_zero_spend() {
        let server = MockServer::start().await;
        mount_result(
            &server,
            json!({"jobComplete": true, "rows": [{"f": [{"v": null}]}]}),
        )
        .await;

        let spend = reader(&server)
            .trailing_spend(&pid("idleproject"))
            .await
            .expect("spend");
        assert_eq!(spend, 0.0);
    }

    #[tokio::test]
    async fn incomplete_job_is_a_data_source_error() {
        let server = MockServer::start().await;
        mount_result(&server, json!({"jobComplete": false})).await;

        let err = reader(&server)
            .trailing_spend(&pid("oriproject"))
            .await
            .expect_err("must fail");
        assert!(matches!(err, ReadError::DataSource(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn query_failure_is_a_data_source_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(QUERIES_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid table"))
            .mount(&server)
            .await;

        let err = reader(&server)
            .trailing_spend(&pid("oriproject"))
            .await
            .expect_err("must fail");
        assert!(matches!(err, ReadError::DataSource(_)), "got {err:?}");
    }
}
