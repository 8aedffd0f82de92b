//! Server dependencies for member operations (using traits for testability)
//!
//! This module provides the dependency container every activity receives.
//! All external services sit behind trait objects so tests can swap them.

use std::sync::Arc;

use crate::kernel::{BaseClock, BaseIdentityStore, NatsPublisher};

/// Default prefix for event subjects.
pub const DEFAULT_SUBJECT_PREFIX: &str = "loyalty";

// =============================================================================
// ServerDeps
// =============================================================================

#[derive(Clone)]
pub struct ServerDeps {
    pub identity_store: Arc<dyn BaseIdentityStore>,
    /// Event sink for enrollment and family events
    pub publisher: Arc<dyn NatsPublisher>,
    pub clock: Arc<dyn BaseClock>,
    /// Prepended to every event subject, e.g. `loyalty.members.enrolled`
    pub subject_prefix: String,
}

impl ServerDeps {
    pub fn new(
        identity_store: Arc<dyn BaseIdentityStore>,
        publisher: Arc<dyn NatsPublisher>,
        clock: Arc<dyn BaseClock>,
        subject_prefix: impl Into<String>,
    ) -> Self {
        Self {
            identity_store,
            publisher,
            clock,
            subject_prefix: subject_prefix.into(),
        }
    }
}
