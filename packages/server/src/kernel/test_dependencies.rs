// TestDependencies - mock implementations for testing
//
// Provides in-memory services that can be injected into ServerDeps for tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::{
    BaseClock, BaseIdentityStore, BeforeCommit, ServerDeps, StoreError, StoreResult, TestNats,
    DEFAULT_SUBJECT_PREFIX,
};
use crate::common::{FamilyId, MemberId};
use crate::domains::member::models::{FamilyMember, Member, SpouseLink};

// =============================================================================
// Mock Identity Store
// =============================================================================

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    FindByExternalId,
    ExistsByExternalId,
    InsertMember,
    SaveMember,
    SaveRelationship,
    FindRelationships,
    CommitSpouseLink,
}

#[derive(Default)]
struct StoreState {
    members: HashMap<MemberId, Member>,
    relationships: Vec<FamilyMember>,
}

impl StoreState {
    fn by_external_id(&self, external_id: &str) -> Option<&Member> {
        self.members.values().find(|m| m.external_id == external_id)
    }

    fn check_version(&self, member: &Member) -> StoreResult<()> {
        match self.members.get(&member.id) {
            None => Err(StoreError::NotFound(format!("member {}", member.id))),
            Some(stored) if stored.version != member.version => Err(StoreError::Conflict(
                format!("member {} changed since version {}", member.id, member.version),
            )),
            Some(_) => Ok(()),
        }
    }

    fn check_relationship(&self, relationship: &FamilyMember) -> StoreResult<()> {
        let clash = self.relationships.iter().any(|r| {
            r.member_id == relationship.member_id
                || (relationship.is_primary
                    && r.is_primary
                    && r.family_id == relationship.family_id)
        });
        if clash {
            return Err(StoreError::Conflict(format!(
                "member {} or family {} already linked",
                relationship.member_id, relationship.family_id
            )));
        }
        Ok(())
    }

    fn write_member(&mut self, member: &Member) -> Member {
        let mut stored = member.clone();
        stored.version += 1;
        self.members.insert(stored.id, stored.clone());
        stored
    }

    /// Validate a link against current state and return the rows it would
    /// store, without writing anything.
    fn stage_link(&self, link: &SpouseLink) -> StoreResult<SpouseLink> {
        self.check_version(&link.spouse)?;
        self.check_version(&link.primary)?;
        self.check_relationship(&link.spouse_record)?;
        self.check_relationship(&link.primary_record)?;

        let mut staged = link.clone();
        staged.spouse.version += 1;
        staged.primary.version += 1;
        Ok(staged)
    }

    fn apply_link(&mut self, staged: &SpouseLink) {
        self.members.insert(staged.spouse.id, staged.spouse.clone());
        self.relationships.push(staged.spouse_record.clone());
        self.relationships.push(staged.primary_record.clone());
        self.members.insert(staged.primary.id, staged.primary.clone());
    }
}

/// In-memory identity store with the same uniqueness and versioning rules
/// as the Postgres schema.
///
/// Writes are serialized by `writer`, held across the pre-commit step the way
/// row locks are held until a transaction commits. Reads never wait on it.
#[derive(Default)]
pub struct MockIdentityStore {
    state: Mutex<StoreState>,
    writer: tokio::sync::Mutex<()>,
    failing: Mutex<HashSet<StoreOp>>,
    calls: Mutex<Vec<StoreOp>>,
}

impl MockIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `op` fail with `Unavailable` until `recover`.
    pub fn fail_on(&self, op: StoreOp) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn recover(&self) {
        self.failing.lock().unwrap().clear();
    }

    /// Every operation attempted so far, failed ones included.
    pub fn calls(&self) -> Vec<StoreOp> {
        self.calls.lock().unwrap().clone()
    }

    pub fn member_count(&self) -> usize {
        self.state.lock().unwrap().members.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.state.lock().unwrap().relationships.len()
    }

    /// Current stored row, bypassing failure injection.
    pub fn member(&self, external_id: &str) -> Option<Member> {
        self.state.lock().unwrap().by_external_id(external_id).cloned()
    }

    pub fn relationships(&self) -> Vec<FamilyMember> {
        self.state.lock().unwrap().relationships.clone()
    }

    fn enter(&self, op: StoreOp) -> StoreResult<()> {
        self.calls.lock().unwrap().push(op);
        if self.failing.lock().unwrap().contains(&op) {
            return Err(StoreError::Unavailable(format!("{:?} failed", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl BaseIdentityStore for MockIdentityStore {
    async fn find_by_external_id(&self, external_id: &str) -> StoreResult<Option<Member>> {
        self.enter(StoreOp::FindByExternalId)?;
        Ok(self.member(external_id))
    }

    async fn exists_by_external_id(&self, external_id: &str) -> StoreResult<bool> {
        self.enter(StoreOp::ExistsByExternalId)?;
        Ok(self.member(external_id).is_some())
    }

    async fn insert_member(
        &self,
        member: &Member,
        before_commit: &dyn BeforeCommit<Member>,
    ) -> StoreResult<Member> {
        self.enter(StoreOp::InsertMember)?;
        let _writer = self.writer.lock().await;

        if self.member(&member.external_id).is_some() {
            return Err(StoreError::DuplicateExternalId(member.external_id.clone()));
        }
        before_commit
            .before_commit(member)
            .await
            .map_err(StoreError::Publish)?;

        let mut state = self.state.lock().unwrap();
        state.members.insert(member.id, member.clone());
        Ok(member.clone())
    }

    async fn save_member(&self, member: &Member) -> StoreResult<Member> {
        self.enter(StoreOp::SaveMember)?;
        let _writer = self.writer.lock().await;
        let mut state = self.state.lock().unwrap();
        state.check_version(member)?;
        Ok(state.write_member(member))
    }

    async fn save_relationship(&self, relationship: &FamilyMember) -> StoreResult<FamilyMember> {
        self.enter(StoreOp::SaveRelationship)?;
        let _writer = self.writer.lock().await;
        let mut state = self.state.lock().unwrap();
        state.check_relationship(relationship)?;
        state.relationships.push(relationship.clone());
        Ok(relationship.clone())
    }

    async fn find_relationships_by_family_id(
        &self,
        family_id: &FamilyId,
    ) -> StoreResult<Vec<FamilyMember>> {
        self.enter(StoreOp::FindRelationships)?;
        let state = self.state.lock().unwrap();
        let mut records: Vec<FamilyMember> = state
            .relationships
            .iter()
            .filter(|r| &r.family_id == family_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| (!r.is_primary, r.created_at));
        Ok(records)
    }

    async fn find_relationship_by_member_id(
        &self,
        member_id: MemberId,
    ) -> StoreResult<Option<FamilyMember>> {
        self.enter(StoreOp::FindRelationships)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .relationships
            .iter()
            .find(|r| r.member_id == member_id)
            .cloned())
    }

    async fn commit_spouse_link(
        &self,
        link: &SpouseLink,
        before_commit: &dyn BeforeCommit<SpouseLink>,
    ) -> StoreResult<SpouseLink> {
        self.enter(StoreOp::CommitSpouseLink)?;
        let _writer = self.writer.lock().await;

        let staged = self.state.lock().unwrap().stage_link(link)?;
        before_commit
            .before_commit(&staged)
            .await
            .map_err(StoreError::Publish)?;

        self.state.lock().unwrap().apply_link(&staged);
        Ok(staged)
    }
}

// =============================================================================
// Fixed Clock
// =============================================================================

/// Clock that returns a settable instant.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::at(Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap())
    }
}

impl BaseClock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// =============================================================================
// TestDependencies - Builder for test dependencies
// =============================================================================

#[derive(Clone)]
pub struct TestDependencies {
    pub identity_store: Arc<MockIdentityStore>,
    pub nats: Arc<TestNats>,
    pub clock: Arc<FixedClock>,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            identity_store: Arc::new(MockIdentityStore::new()),
            nats: Arc::new(TestNats::new()),
            clock: Arc::new(FixedClock::default()),
        }
    }

    /// Set a mock identity store
    pub fn mock_store(mut self, store: MockIdentityStore) -> Self {
        self.identity_store = Arc::new(store);
        self
    }

    /// Set the clock
    pub fn mock_clock(mut self, clock: FixedClock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Convert into ServerDeps for testing
    pub fn server_deps(&self) -> ServerDeps {
        ServerDeps::new(
            self.identity_store.clone(),
            self.nats.clone(),
            self.clock.clone(),
            DEFAULT_SUBJECT_PREFIX,
        )
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
