use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgExecutor;

use super::{Affiliation, MemberStatus, SpouseAssignmentStatus, TransitionError};
use crate::common::{FamilyId, MemberId};
use crate::domains::member::data::EnrollmentRequest;

/// Enrolled loyalty member - SQL persistence layer
///
/// `version` is bumped by every successful update and is the optimistic lock
/// for read-modify-write on the spouse-linking fields.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct Member {
    pub id: MemberId,
    pub external_id: String,

    // Classification
    pub partner: String,
    pub client_type: String,
    pub affiliation: Affiliation,

    pub enrollment_date: NaiveDate,
    pub status: MemberStatus,
    pub family_id: FamilyId,

    // Spouse linking
    pub spouse_external_id: Option<String>,
    pub spouse_assignment_status: SpouseAssignmentStatus,
    pub spouse_assignment_date: Option<DateTime<Utc>>,
    pub spouse_assignment_error: Option<String>,

    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Member {
    /// Build a new, not yet persisted member from an enrollment request.
    pub fn enroll(request: &EnrollmentRequest, now: DateTime<Utc>) -> Self {
        let family_id = request
            .requested_family_id()
            .map(FamilyId::from)
            .unwrap_or_else(FamilyId::generate);

        Self {
            id: MemberId::new(),
            external_id: request.external_id.trim().to_string(),
            partner: request.partner.clone(),
            client_type: request.client_type.clone(),
            affiliation: Affiliation::resolve(&request.partner, &request.client_type),
            enrollment_date: now.date_naive(),
            status: MemberStatus::Active,
            family_id,
            spouse_external_id: request.spouse_reference().map(str::to_string),
            spouse_assignment_status: SpouseAssignmentStatus::Pending,
            spouse_assignment_date: None,
            spouse_assignment_error: None,
            version: 0,
            created_at: now,
        }
    }

    fn transition(&mut self, next: SpouseAssignmentStatus) -> Result<(), TransitionError> {
        let from = self.spouse_assignment_status;
        if !from.can_transition_to(next) {
            return Err(TransitionError { from, to: next });
        }
        self.spouse_assignment_status = next;
        Ok(())
    }

    /// Mark the member as linked into `family_id`.
    ///
    /// The assignment date is stamped only when entering `Completed`;
    /// converging an already completed member keeps its original date.
    pub fn mark_spouse_completed(
        &mut self,
        family_id: FamilyId,
        at: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        let already_completed = self.spouse_assignment_status == SpouseAssignmentStatus::Completed;
        self.transition(SpouseAssignmentStatus::Completed)?;

        self.family_id = family_id;
        self.spouse_assignment_error = None;
        if !already_completed || self.spouse_assignment_date.is_none() {
            self.spouse_assignment_date = Some(at);
        }
        Ok(())
    }

    pub fn mark_spouse_not_found(&mut self) -> Result<(), TransitionError> {
        self.transition(SpouseAssignmentStatus::SpouseNotFound)?;
        self.spouse_assignment_error = None;
        Ok(())
    }

    pub fn mark_spouse_failed(&mut self, reason: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(SpouseAssignmentStatus::Failed)?;
        self.spouse_assignment_error = Some(reason.into());
        Ok(())
    }

    pub fn is_spouse_linked(&self) -> bool {
        self.spouse_assignment_status == SpouseAssignmentStatus::Completed
    }

    // =========================================================================
    // SQL
    // =========================================================================

    pub async fn find_by_external_id<'e>(
        external_id: &str,
        executor: impl PgExecutor<'e>,
    ) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM loyalty_members WHERE external_id = $1")
            .bind(external_id)
            .fetch_optional(executor)
            .await
    }

    pub async fn exists_by_external_id<'e>(
        external_id: &str,
        executor: impl PgExecutor<'e>,
    ) -> sqlx::Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM loyalty_members WHERE external_id = $1)",
        )
        .bind(external_id)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e>(
        id: MemberId,
        executor: impl PgExecutor<'e>,
    ) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM loyalty_members WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Insert new member. The unique index on `external_id` rejects duplicates.
    pub async fn insert<'e>(&self, executor: impl PgExecutor<'e>) -> sqlx::Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO loyalty_members (
                id,
                external_id,
                partner,
                client_type,
                affiliation,
                enrollment_date,
                status,
                family_id,
                spouse_external_id,
                spouse_assignment_status,
                spouse_assignment_date,
                spouse_assignment_error,
                version,
                created_at
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING *",
        )
        .bind(self.id)
        .bind(&self.external_id)
        .bind(&self.partner)
        .bind(&self.client_type)
        .bind(self.affiliation)
        .bind(self.enrollment_date)
        .bind(self.status)
        .bind(&self.family_id)
        .bind(&self.spouse_external_id)
        .bind(self.spouse_assignment_status)
        .bind(self.spouse_assignment_date)
        .bind(&self.spouse_assignment_error)
        .bind(self.version)
        .bind(self.created_at)
        .fetch_one(executor)
        .await
    }

    /// Write the mutable linking fields if the row is still at `self.version`.
    ///
    /// Returns `None` when another writer got there first.
    pub async fn update_versioned<'e>(
        &self,
        executor: impl PgExecutor<'e>,
    ) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE loyalty_members
             SET family_id = $3,
                 spouse_external_id = $4,
                 spouse_assignment_status = $5,
                 spouse_assignment_date = $6,
                 spouse_assignment_error = $7,
                 version = version + 1
             WHERE id = $1
               AND version = $2
             RETURNING *",
        )
        .bind(self.id)
        .bind(self.version)
        .bind(&self.family_id)
        .bind(&self.spouse_external_id)
        .bind(self.spouse_assignment_status)
        .bind(self.spouse_assignment_date)
        .bind(&self.spouse_assignment_error)
        .fetch_optional(executor)
        .await
    }
}
