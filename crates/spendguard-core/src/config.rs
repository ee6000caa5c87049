//! Process-wide configuration, read once at startup and immutable after.

use std::collections::BTreeSet;

/// Environment variables the service reads at startup.
const BILLING_ACCOUNT_ID: &str = "BILLING_ACCOUNT_ID";
const BUDGET_ID: &str = "BUDGET_ID";
const BQ_TABLE_FULL: &str = "BQ_TABLE_FULL";
const BQ_PROJECT_ID: &str = "BQ_PROJECT_ID";
const DRY_RUN: &str = "DRY_RUN";
const ALLOWED_PROJECTS: &str = "ALLOWED_PROJECTS";
const PORT: &str = "PORT";

/// Configuration load failures. Startup aborts on any of these.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is absent or empty.
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    /// A variable is present but unusable.
    #[error("invalid value for {name}: {reason}")]
    InvalidVar {
        /// Variable name.
        name: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}

/// Immutable service configuration.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Billing account the budget lives under.
    pub billing_account_id: String,
    /// Budget resource id under that account.
    pub budget_id: String,
    /// Fully-qualified billing-export cost table, `project.dataset.table`.
    pub cost_table: String,
    /// Project the warehouse queries are billed to.
    pub bq_project_id: String,
    /// Simulate mode: when true, the billing mutation is never issued.
    pub simulate: bool,
    /// Projects this service may act on.
    pub allowed_projects: BTreeSet<String>,
    /// Listen port for the webhook endpoint.
    pub port: u16,
}

impl GuardConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Tests use this to avoid mutating process-global environment state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let billing_account_id = required(&lookup, BILLING_ACCOUNT_ID)?;
        let budget_id = required(&lookup, BUDGET_ID)?;
        let bq_project_id = required(&lookup, BQ_PROJECT_ID)?;

        let cost_table = required(&lookup, BQ_TABLE_FULL)?;
        validate_table_reference(&cost_table)?;

        let simulate = match lookup(DRY_RUN) {
            None => false,
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::InvalidVar {
                name: DRY_RUN,
                reason: format!("expected true/false, got '{raw}'"),
            })?,
        };

        let allowed_projects: BTreeSet<String> = required(&lookup, ALLOWED_PROJECTS)?
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect();
        if allowed_projects.is_empty() {
            return Err(ConfigError::InvalidVar {
                name: ALLOWED_PROJECTS,
                reason: "no project ids after parsing".into(),
            });
        }

        let port = match lookup(PORT) {
            None => 8080,
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidVar {
                name: PORT,
                reason: format!("expected a port number, got '{raw}'"),
            })?,
        };

        Ok(Self {
            billing_account_id,
            budget_id,
            cost_table,
            bq_project_id,
            simulate,
            allowed_projects,
            port,
        })
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &'static str) -> Result<String, ConfigError> {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingVar(name))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// The table reference is interpolated into query text (query parameters
/// cover only the project id), so it must be exactly `project.dataset.table`
/// with no characters that could escape a backtick-quoted identifier.
fn validate_table_reference(table: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidVar {
        name: BQ_TABLE_FULL,
        reason,
    };

    let segments: Vec<&str> = table.split('.').collect();
    if segments.len() != 3 {
        return Err(invalid(format!(
            "expected project.dataset.table, got '{table}'"
        )));
    }
    for segment in segments {
        if segment.is_empty()
            || !segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(invalid(format!("bad table segment '{segment}'")));
        }
    }
    Ok(())
}
