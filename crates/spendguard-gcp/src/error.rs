//! Client-level errors and their mapping into the core taxonomy.

use spendguard_core::ReadError;

/// Failures talking to a Google Cloud service.
#[derive(Debug, thiserror::Error)]
pub enum GcpError {
    /// Connection-level failure before an HTTP status was obtained.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Structured HTTP error from the service.
    #[error("status {status}: {body}")]
    Http {
        /// Response status code.
        status: u16,
        /// Response body, verbatim.
        body: String,
    },

    /// Response parsed but did not have the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The budget resource does not carry a fixed specified amount.
    #[error("budget does not carry a fixed specified amount")]
    UnsupportedBudgetAmount,

    /// Bearer-token acquisition failed.
    #[error("token acquisition failed: {0}")]
    Token(String),
}

/// Budget-variant problems are configuration errors; everything else is a
/// data-source failure. Both abort the pipeline before any mutation.
impl From<GcpError> for ReadError {
    fn from(err: GcpError) -> Self {
        match err {
            GcpError::UnsupportedBudgetAmount => Self::Configuration(err.to_string()),
            other => Self::DataSource(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_display() {
        let e = GcpError::Http {
            status: 403,
            body: "permission denied".into(),
        };
        assert_eq!(e.to_string(), "status 403: permission denied");
    }

    #[test]
    fn unsupported_budget_amount_maps_to_configuration() {
        let read: ReadError = GcpError::UnsupportedBudgetAmount.into();
        assert!(matches!(read, ReadError::Configuration(_)));
    }

    #[test]
    fn http_error_maps_to_data_source() {
        let read: ReadError = GcpError::Http {
            status: 404,
            body: "not found".into(),
        }
        .into();
        assert!(matches!(read, ReadError::DataSource(_)));
    }

    #[test]
    fn token_error_maps_to_data_source() {
        let read: ReadError = GcpError::Token("metadata server unreachable".into()).into();
        assert!(matches!(read, ReadError::DataSource(_)));
    }
}
