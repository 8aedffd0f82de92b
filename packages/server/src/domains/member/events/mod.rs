use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::common::{FamilyId, IntoNatsPayload, MemberId};
use crate::domains::member::models::{Affiliation, Member, SpouseLink};

/// Member domain events - FACT EVENTS ONLY
///
/// Published after the state they describe is durable. Delivery is
/// at-least-once; consumers deduplicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MemberEvent {
    /// A new member was enrolled
    MemberEnrolled {
        member_id: MemberId,
        external_id: String,
        affiliation: Affiliation,
        family_id: FamilyId,
        enrollment_date: NaiveDate,
    },

    /// Two members were linked into one family group
    FamilyAssigned {
        family_id: FamilyId,
        primary_member_id: MemberId,
        spouse_member_id: MemberId,
    },
}

impl MemberEvent {
    pub fn enrolled(member: &Member) -> Self {
        Self::MemberEnrolled {
            member_id: member.id,
            external_id: member.external_id.clone(),
            affiliation: member.affiliation,
            family_id: member.family_id.clone(),
            enrollment_date: member.enrollment_date,
        }
    }

    pub fn family_assigned(link: &SpouseLink) -> Self {
        Self::FamilyAssigned {
            family_id: link.family_id().clone(),
            primary_member_id: link.primary.id,
            spouse_member_id: link.spouse.id,
        }
    }
}

impl IntoNatsPayload for MemberEvent {
    fn subject_suffix(&self) -> &'static str {
        match self {
            MemberEvent::MemberEnrolled { .. } => "members.enrolled",
            MemberEvent::FamilyAssigned { .. } => "families.assigned",
        }
    }

    fn into_payload(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}
