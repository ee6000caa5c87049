//! Google Cloud clients for the spendguard pipeline.
//!
//! One thin wrapper per consumed service: BigQuery (trailing spend),
//! Billing Budgets (fixed ceiling), Cloud Billing (billing disable), plus
//! bearer-token acquisition from the instance metadata server. Every
//! wrapper takes a `with_base_url` override so tests can point it at a
//! fake server. No call here is retried; failure is surfaced, not masked.

#![forbid(unsafe_code)]

pub mod auth;
pub mod bigquery;
pub mod billing;
pub mod budgets;
pub mod error;

pub use auth::{AccessTokenProvider, MetadataTokenProvider, StaticTokenProvider};
pub use bigquery::BigQuerySpendReader;
pub use billing::BillingSwitchClient;
pub use budgets::BudgetApiReader;
pub use error::GcpError;

/// Turn a non-2xx response into [`GcpError::Http`] carrying the body.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, GcpError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GcpError::Http {
        status: status.as_u16(),
        body,
    })
}
