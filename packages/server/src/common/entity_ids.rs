//! Identifier types for the loyalty entities.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub use super::id::Id;

/// Marker type for enrolled members.
pub struct Member;

/// Marker type for family relationship records.
pub struct FamilyMember;

pub type MemberId = Id<Member>;

pub type FamilyMemberId = Id<FamilyMember>;

/// Family group identifier.
///
/// Callers may bring their own family id at enrollment, so this is an opaque
/// string rather than a UUID. Generated ids are random v4 UUID strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct FamilyId(String);

impl FamilyId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for FamilyId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for FamilyId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for FamilyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
