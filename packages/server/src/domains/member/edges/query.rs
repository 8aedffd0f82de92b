use crate::common::FamilyId;
use crate::domains::member::activities;
use crate::domains::member::data::MemberData;
use crate::domains::member::errors::MemberError;
use crate::domains::member::models::FamilyMember;
use crate::kernel::ServerDeps;

/// Look up a member by external id
pub async fn get_by_external_id(
    external_id: &str,
    deps: &ServerDeps,
) -> Result<MemberData, MemberError> {
    activities::get_member_by_external_id(external_id, deps)
        .await
        .map(MemberData::from)
}

/// Relationship records of a family group
pub async fn family(family_id: &str, deps: &ServerDeps) -> Result<Vec<FamilyMember>, MemberError> {
    activities::get_family(&FamilyId::from(family_id), deps).await
}
