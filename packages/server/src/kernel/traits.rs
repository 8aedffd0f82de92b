// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Enrollment and spouse-linking decisions live in domains/member/activities
// and reach storage and time only through these seams.
//
// Naming convention: Base* for trait names (e.g., BaseIdentityStore, BaseClock)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::common::{FamilyId, MemberId};
use crate::domains::member::models::{FamilyMember, Member, SpouseLink};

// =============================================================================
// Identity Store Trait (Infrastructure - member + family records)
// =============================================================================

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("External id already enrolled: {0}")]
    DuplicateExternalId(String),

    #[error("Concurrent modification: {0}")]
    Conflict(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The pre-commit step failed; nothing was written.
    #[error("Event publish failed: {0}")]
    Publish(#[source] anyhow::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Step run inside a store write after every row is staged and before the
/// write commits. An error rolls the whole write back.
///
/// Events are published here so a write never commits without its event.
#[async_trait]
pub trait BeforeCommit<T: Sync>: Send + Sync {
    async fn before_commit(&self, staged: &T) -> anyhow::Result<()>;
}

#[async_trait]
pub trait BaseIdentityStore: Send + Sync {
    async fn find_by_external_id(&self, external_id: &str) -> StoreResult<Option<Member>>;

    async fn exists_by_external_id(&self, external_id: &str) -> StoreResult<bool>;

    /// Insert a new member, running `before_commit` on the inserted row.
    ///
    /// Enforces `external_id` uniqueness: fails with `DuplicateExternalId`
    /// even when the caller's existence check raced another insert.
    async fn insert_member(
        &self,
        member: &Member,
        before_commit: &dyn BeforeCommit<Member>,
    ) -> StoreResult<Member>;

    /// Update an existing member if the stored row is still at
    /// `member.version`. Returns the stored row with its bumped version, or
    /// `Conflict` when another writer got there first.
    async fn save_member(&self, member: &Member) -> StoreResult<Member>;

    /// Insert a single relationship record.
    ///
    /// Fails with `Conflict` if the member already has a record or the
    /// family already has a primary.
    async fn save_relationship(&self, relationship: &FamilyMember) -> StoreResult<FamilyMember>;

    async fn find_relationships_by_family_id(
        &self,
        family_id: &FamilyId,
    ) -> StoreResult<Vec<FamilyMember>>;

    async fn find_relationship_by_member_id(
        &self,
        member_id: MemberId,
    ) -> StoreResult<Option<FamilyMember>>;

    /// Apply a spouse link all-or-nothing: spouse update, both relationship
    /// records, primary update, then `before_commit` on the stored rows.
    /// Returns the link with the stored rows.
    async fn commit_spouse_link(
        &self,
        link: &SpouseLink,
        before_commit: &dyn BeforeCommit<SpouseLink>,
    ) -> StoreResult<SpouseLink>;
}

// =============================================================================
// Clock Trait (Infrastructure)
// =============================================================================

pub trait BaseClock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl BaseClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
