use chrono::{DateTime, Utc};

use super::{FamilyMember, Member, RelationshipType, TransitionError};
use crate::common::FamilyId;

/// Everything a successful spouse match writes, applied by the store as one
/// unit.
///
/// `primary` and `spouse` carry the versions they were read at; the store
/// rejects the whole link if either row has moved since.
#[derive(Debug, Clone, PartialEq)]
pub struct SpouseLink {
    pub primary: Member,
    pub spouse: Member,
    pub primary_record: FamilyMember,
    pub spouse_record: FamilyMember,
}

impl SpouseLink {
    /// Link `spouse` into `primary`'s family.
    ///
    /// The spouse adopts the primary's family id; both move to `Completed`.
    pub fn new(
        mut primary: Member,
        mut spouse: Member,
        now: DateTime<Utc>,
    ) -> Result<Self, TransitionError> {
        let family_id = primary.family_id.clone();

        spouse.mark_spouse_completed(family_id.clone(), now)?;
        let primary_record =
            FamilyMember::new(family_id.clone(), primary.id, RelationshipType::Primary, now);
        let spouse_record =
            FamilyMember::new(family_id.clone(), spouse.id, RelationshipType::Spouse, now);
        primary.mark_spouse_completed(family_id, now)?;

        Ok(Self {
            primary,
            spouse,
            primary_record,
            spouse_record,
        })
    }

    pub fn family_id(&self) -> &FamilyId {
        &self.primary.family_id
    }
}
