//! Publishing domain events to NATS.
//!
//! Events implement `IntoNatsPayload` to declare their subject and JSON
//! body; `publish_event` turns them into a `NatsPublisher` call. Callers
//! publish only after the state an event describes has been persisted.

use anyhow::{Context, Result};
use bytes::Bytes;

use crate::kernel::NatsPublisher;

/// A domain event that can be published to NATS.
pub trait IntoNatsPayload: Send + Sync {
    /// Subject suffix appended to the configured prefix, e.g. `members.enrolled`.
    fn subject_suffix(&self) -> &'static str;

    /// JSON body of the message.
    fn into_payload(&self) -> serde_json::Result<serde_json::Value>;
}

/// Full subject for an event: `{prefix}.{suffix}`.
pub fn subject_for<E: IntoNatsPayload>(prefix: &str, event: &E) -> String {
    format!("{}.{}", prefix, event.subject_suffix())
}

/// Serialize `event` and publish it under `prefix`.
pub async fn publish_event<E: IntoNatsPayload>(
    publisher: &dyn NatsPublisher,
    prefix: &str,
    event: &E,
) -> Result<()> {
    let subject = subject_for(prefix, event);
    let payload = serde_json::to_vec(&event.into_payload()?)
        .with_context(|| format!("Failed to encode payload for {}", subject))?;

    publisher.publish(subject, Bytes::from(payload)).await
}
