//! Push-notification envelope decoding.
//!
//! The inbound body is a Pub/Sub-style push envelope: outer JSON carrying a
//! base64 `message.data` field whose decoded bytes are the actual budget
//! notification. Unknown fields at either layer are tolerated and ignored.

use std::collections::HashMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;

use crate::error::EnvelopeError;
use crate::project::ProjectId;

/// Outer push envelope.
#[derive(Debug, Deserialize)]
pub struct PushEnvelope {
    /// The wrapped message.
    pub message: PushMessage,
    /// Subscription that delivered the message, if present.
    #[serde(default)]
    pub subscription: Option<String>,
}

/// The wrapped message inside a push envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    /// Base64-encoded notification payload.
    pub data: String,
    /// Delivery id assigned by the queue, if present.
    #[serde(default)]
    pub message_id: Option<String>,
    /// Publish timestamp, if present.
    #[serde(default)]
    pub publish_time: Option<String>,
    /// Message attributes, if present.
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

/// Decoded budget notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetNotification {
    /// The project the notification is about.
    pub project_id: ProjectId,
}

#[derive(Debug, Deserialize)]
struct NotificationBody {
    #[serde(default)]
    project_id: Option<String>,
}

/// Decode a raw request body into a [`BudgetNotification`].
///
/// Every failure maps to a client-facing 400; variants carry the parse
/// detail for server-side logs.
pub fn decode(body: &[u8]) -> Result<BudgetNotification, EnvelopeError> {
    let envelope: PushEnvelope =
        serde_json::from_slice(body).map_err(|e| EnvelopeError::Envelope(e.to_string()))?;

    let decoded = BASE64
        .decode(envelope.message.data.as_bytes())
        .map_err(|e| EnvelopeError::Base64(e.to_string()))?;

    let notification: NotificationBody =
        serde_json::from_slice(&decoded).map_err(|e| EnvelopeError::Payload(e.to_string()))?;

    let project_id = notification
        .project_id
        .ok_or(EnvelopeError::MissingProjectId)
        .and_then(ProjectId::new)?;

    Ok(BudgetNotification { project_id })
}
