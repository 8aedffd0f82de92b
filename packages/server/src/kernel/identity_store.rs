//! Postgres-backed identity store.
//!
//! SQL lives on the models; this adapter maps sqlx failures onto
//! `StoreError` and scopes each write, with its pre-commit step, in one
//! transaction.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{BaseIdentityStore, BeforeCommit, StoreError, StoreResult};
use crate::common::{FamilyId, MemberId};
use crate::domains::member::models::{FamilyMember, Member, SpouseLink};

pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Relationship inserts only collide on the per-member and per-family-primary
/// unique indexes, which means another link won.
fn relationship_error(err: sqlx::Error, relationship: &FamilyMember) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::Conflict(format!(
            "member {} or family {} already linked",
            relationship.member_id, relationship.family_id
        ))
    } else {
        transaction_error(err)
    }
}

/// Deadlocks and serialization failures between two links touching the same
/// pair of rows are lost races, not outages.
fn transaction_error(err: sqlx::Error) -> StoreError {
    let lost_race = matches!(
        &err,
        sqlx::Error::Database(db)
            if matches!(db.code().as_deref(), Some("40P01") | Some("40001"))
    );
    if lost_race {
        StoreError::Conflict(err.to_string())
    } else {
        StoreError::Database(err)
    }
}

fn stale(member: &Member) -> StoreError {
    StoreError::Conflict(format!(
        "member {} changed since version {}",
        member.id, member.version
    ))
}

#[async_trait]
impl BaseIdentityStore for PgIdentityStore {
    async fn find_by_external_id(&self, external_id: &str) -> StoreResult<Option<Member>> {
        Ok(Member::find_by_external_id(external_id, &self.pool).await?)
    }

    async fn exists_by_external_id(&self, external_id: &str) -> StoreResult<bool> {
        Ok(Member::exists_by_external_id(external_id, &self.pool).await?)
    }

    async fn insert_member(
        &self,
        member: &Member,
        before_commit: &dyn BeforeCommit<Member>,
    ) -> StoreResult<Member> {
        // Dropping `tx` on any early return rolls the insert back.
        let mut tx = self.pool.begin().await?;

        let saved = member.insert(&mut *tx).await.map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateExternalId(member.external_id.clone())
            } else {
                StoreError::Database(e)
            }
        })?;

        before_commit
            .before_commit(&saved)
            .await
            .map_err(StoreError::Publish)?;

        tx.commit().await?;
        Ok(saved)
    }

    async fn save_member(&self, member: &Member) -> StoreResult<Member> {
        if let Some(saved) = member.update_versioned(&self.pool).await? {
            return Ok(saved);
        }

        match Member::find_by_id(member.id, &self.pool).await? {
            Some(_) => Err(stale(member)),
            None => Err(StoreError::NotFound(format!("member {}", member.id))),
        }
    }

    async fn save_relationship(&self, relationship: &FamilyMember) -> StoreResult<FamilyMember> {
        relationship
            .insert(&self.pool)
            .await
            .map_err(|e| relationship_error(e, relationship))
    }

    async fn find_relationships_by_family_id(
        &self,
        family_id: &FamilyId,
    ) -> StoreResult<Vec<FamilyMember>> {
        Ok(FamilyMember::find_by_family_id(family_id, &self.pool).await?)
    }

    async fn find_relationship_by_member_id(
        &self,
        member_id: MemberId,
    ) -> StoreResult<Option<FamilyMember>> {
        Ok(FamilyMember::find_by_member_id(member_id, &self.pool).await?)
    }

    async fn commit_spouse_link(
        &self,
        link: &SpouseLink,
        before_commit: &dyn BeforeCommit<SpouseLink>,
    ) -> StoreResult<SpouseLink> {
        // Dropping `tx` on any early return rolls the whole link back.
        let mut tx = self.pool.begin().await?;

        let spouse = link
            .spouse
            .update_versioned(&mut *tx)
            .await
            .map_err(transaction_error)?
            .ok_or_else(|| stale(&link.spouse))?;

        let spouse_record = link
            .spouse_record
            .insert(&mut *tx)
            .await
            .map_err(|e| relationship_error(e, &link.spouse_record))?;

        let primary_record = link
            .primary_record
            .insert(&mut *tx)
            .await
            .map_err(|e| relationship_error(e, &link.primary_record))?;

        let primary = link
            .primary
            .update_versioned(&mut *tx)
            .await
            .map_err(transaction_error)?
            .ok_or_else(|| stale(&link.primary))?;

        let stored = SpouseLink {
            primary,
            spouse,
            primary_record,
            spouse_record,
        };

        // Row locks are held until commit, so no other link can slip in
        // while the event goes out.
        before_commit
            .before_commit(&stored)
            .await
            .map_err(StoreError::Publish)?;

        tx.commit().await.map_err(transaction_error)?;
        Ok(stored)
    }
}
