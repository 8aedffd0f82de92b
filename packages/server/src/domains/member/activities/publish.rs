//! Event publication tied to the store write it describes.

use async_trait::async_trait;

use crate::common::publish_event;
use crate::domains::member::events::MemberEvent;
use crate::domains::member::models::{Member, SpouseLink};
use crate::kernel::{BeforeCommit, ServerDeps};

/// Publishes the fact event for a write before the write commits, so a
/// failed publish rolls the write back instead of losing the event.
pub(super) struct PublishEvents<'a> {
    deps: &'a ServerDeps,
}

impl<'a> PublishEvents<'a> {
    pub(super) fn new(deps: &'a ServerDeps) -> Self {
        Self { deps }
    }

    async fn publish(&self, event: MemberEvent) -> anyhow::Result<()> {
        publish_event(self.deps.publisher.as_ref(), &self.deps.subject_prefix, &event).await
    }
}

#[async_trait]
impl BeforeCommit<Member> for PublishEvents<'_> {
    async fn before_commit(&self, member: &Member) -> anyhow::Result<()> {
        self.publish(MemberEvent::enrolled(member)).await
    }
}

#[async_trait]
impl BeforeCommit<SpouseLink> for PublishEvents<'_> {
    async fn before_commit(&self, link: &SpouseLink) -> anyhow::Result<()> {
        self.publish(MemberEvent::family_assigned(link)).await
    }
}
