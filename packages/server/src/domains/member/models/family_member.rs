use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

use crate::common::{FamilyId, FamilyMemberId, MemberId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "relationship_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    Primary,
    Spouse,
}

/// One member's place in a family group.
///
/// Created only when a spouse link succeeds and never changed afterwards.
/// A member appears in at most one record, and a family has at most one
/// record with `is_primary`.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyMember {
    pub id: FamilyMemberId,
    pub family_id: FamilyId,
    pub member_id: MemberId,
    pub relationship_type: RelationshipType,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

impl FamilyMember {
    pub fn new(
        family_id: FamilyId,
        member_id: MemberId,
        relationship_type: RelationshipType,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: FamilyMemberId::new(),
            family_id,
            member_id,
            relationship_type,
            is_primary: relationship_type == RelationshipType::Primary,
            created_at,
        }
    }

    pub async fn insert<'e>(&self, executor: impl PgExecutor<'e>) -> sqlx::Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO family_members (id, family_id, member_id, relationship_type, is_primary, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(self.id)
        .bind(&self.family_id)
        .bind(self.member_id)
        .bind(self.relationship_type)
        .bind(self.is_primary)
        .bind(self.created_at)
        .fetch_one(executor)
        .await
    }

    /// Records of a family group, primary first.
    pub async fn find_by_family_id<'e>(
        family_id: &FamilyId,
        executor: impl PgExecutor<'e>,
    ) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM family_members
             WHERE family_id = $1
             ORDER BY is_primary DESC, created_at ASC",
        )
        .bind(family_id)
        .fetch_all(executor)
        .await
    }

    pub async fn find_by_member_id<'e>(
        member_id: MemberId,
        executor: impl PgExecutor<'e>,
    ) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM family_members WHERE member_id = $1")
            .bind(member_id)
            .fetch_optional(executor)
            .await
    }
}
