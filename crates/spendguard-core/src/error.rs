//! Error taxonomy for the webhook pipeline.

use crate::project::ProjectId;

/// Failures while decoding the inbound notification envelope.
///
/// All variants are client errors; the handler answers 400. The variants
/// exist so the response body can distinguish a missing `project_id` from
/// every other malformation, and so logs keep the underlying parse detail.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// Body is not a push envelope with a `message.data` field.
    #[error("invalid push envelope: {0}")]
    Envelope(String),

    /// `message.data` is not valid base64.
    #[error("message.data is not valid base64: {0}")]
    Base64(String),

    /// Decoded bytes are not a JSON notification.
    #[error("decoded payload is not valid JSON: {0}")]
    Payload(String),

    /// Notification lacks a non-empty `project_id`.
    #[error("missing or empty project_id")]
    MissingProjectId,
}

/// Failures reading from an external data source.
///
/// Both variants abort evaluation before any mutation is attempted and are
/// surfaced to the caller as a generic internal error; the detail is for
/// server-side logs only.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The warehouse or budget service could not be queried.
    #[error("data source failure: {0}")]
    DataSource(String),

    /// The budget resource is not configured with a fixed specified amount.
    #[error("unsupported budget configuration: {0}")]
    Configuration(String),
}

/// Pipeline-level error union the request handler maps to HTTP statuses.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// Malformed notification (400).
    #[error(transparent)]
    Malformed(#[from] EnvelopeError),

    /// Project is well-formed but not on the allow-list (403).
    #[error("project '{0}' is not authorized")]
    Unauthorized(ProjectId),

    /// Spend or budget retrieval failed (500, detail logged not leaked).
    #[error(transparent)]
    Read(#[from] ReadError),
}
