use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domains::member::models::{Affiliation, Member, MemberStatus, SpouseAssignmentStatus};

/// Caller-facing projection of a member.
///
/// Leaves out storage bookkeeping (version, failure detail, spouse reference).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberData {
    pub member_id: String,

    /// Caller-supplied unique id (e.g. health-plan id)
    pub external_id: String,

    pub partner: String,
    pub client_type: String,
    pub affiliation: Affiliation,
    pub enrollment_date: NaiveDate,
    pub status: MemberStatus,
    pub family_id: String,
    pub spouse_assignment_status: SpouseAssignmentStatus,

    /// Set once the member has been linked with a spouse
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spouse_assignment_date: Option<DateTime<Utc>>,
}

impl From<Member> for MemberData {
    fn from(member: Member) -> Self {
        Self {
            member_id: member.id.to_string(),
            external_id: member.external_id,
            partner: member.partner,
            client_type: member.client_type,
            affiliation: member.affiliation,
            enrollment_date: member.enrollment_date,
            status: member.status,
            family_id: member.family_id.to_string(),
            spouse_assignment_status: member.spouse_assignment_status,
            spouse_assignment_date: member.spouse_assignment_date,
        }
    }
}
