//! NATS client abstraction for production and testing.
//!
//! Provides a trait-based NATS implementation that allows swapping between
//! real NATS connections and test mocks.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::RwLock;

/// A published message.
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub subject: String,
    pub payload: Bytes,
}

/// Trait for NATS publish operations.
#[async_trait]
pub trait NatsPublisher: Send + Sync {
    /// Publish a message to a subject.
    async fn publish(&self, subject: String, payload: Bytes) -> Result<()>;
}

/// Real NATS client publisher.
pub struct NatsClientPublisher {
    client: async_nats::Client,
}

impl NatsClientPublisher {
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }

    /// Connect to the server at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = async_nats::connect(url).await?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl NatsPublisher for NatsClientPublisher {
    async fn publish(&self, subject: String, payload: Bytes) -> Result<()> {
        self.client.publish(subject, payload).await?;
        // Core NATS publish is buffered; flush so a returned Ok means the
        // message reached the server.
        self.client.flush().await?;
        Ok(())
    }
}

/// Mock NATS client that records published messages for testing.
///
/// Subjects ending in a registered suffix fail instead of being recorded,
/// which lets tests simulate an unreachable broker.
#[derive(Default)]
pub struct TestNats {
    published: RwLock<Vec<PublishedMessage>>,
    failing_suffixes: RwLock<Vec<String>>,
}

impl TestNats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every publish to a subject ending in `suffix` fail.
    pub fn fail_subjects_ending_with(&self, suffix: &str) {
        self.failing_suffixes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(suffix.to_string());
    }

    /// Stop injecting publish failures.
    pub fn recover(&self) {
        self.failing_suffixes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Get all published messages.
    pub fn published_messages(&self) -> Vec<PublishedMessage> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Get published messages whose subject ends with `suffix`.
    pub fn messages_ending_with(&self, suffix: &str) -> Vec<PublishedMessage> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|m| m.subject.ends_with(suffix))
            .cloned()
            .collect()
    }

    /// Get the count of published messages.
    pub fn publish_count(&self) -> usize {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Get the count of messages whose subject ends with `suffix`.
    pub fn publish_count_ending_with(&self, suffix: &str) -> usize {
        self.messages_ending_with(suffix).len()
    }

    /// Clear all recorded messages.
    pub fn clear(&self) {
        self.published
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Deserialize a published message payload as JSON.
    pub fn deserialize_message<T: serde::de::DeserializeOwned>(
        &self,
        msg: &PublishedMessage,
    ) -> std::result::Result<T, serde_json::Error> {
        serde_json::from_slice(&msg.payload)
    }

    fn is_failing(&self, subject: &str) -> bool {
        self.failing_suffixes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|suffix| subject.ends_with(suffix.as_str()))
    }
}

#[async_trait]
impl NatsPublisher for TestNats {
    async fn publish(&self, subject: String, payload: Bytes) -> Result<()> {
        if self.is_failing(&subject) {
            return Err(anyhow!("NATS unavailable for subject {}", subject));
        }

        self.published
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(PublishedMessage { subject, payload });
        Ok(())
    }
}
