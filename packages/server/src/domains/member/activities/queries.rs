//! Member read operations and operator-driven relinking

use tracing::info;

use super::link_spouse;
use crate::common::FamilyId;
use crate::domains::member::errors::MemberError;
use crate::domains::member::models::{FamilyMember, Member};
use crate::kernel::ServerDeps;

pub async fn get_member_by_external_id(
    external_id: &str,
    deps: &ServerDeps,
) -> Result<Member, MemberError> {
    deps.identity_store
        .find_by_external_id(external_id)
        .await?
        .ok_or_else(|| MemberError::MemberNotFound {
            external_id: external_id.to_string(),
        })
}

/// Relationship records of a family group, primary first.
pub async fn get_family(
    family_id: &FamilyId,
    deps: &ServerDeps,
) -> Result<Vec<FamilyMember>, MemberError> {
    Ok(deps
        .identity_store
        .find_relationships_by_family_id(family_id)
        .await?)
}

/// Re-run spouse linking for an enrolled member.
///
/// Uses `spouse_external_id` when given, else the reference stored at
/// enrollment. A given reference replaces the stored one only if the
/// member has no link yet.
pub async fn relink_spouse(
    external_id: &str,
    spouse_external_id: Option<&str>,
    deps: &ServerDeps,
) -> Result<Member, MemberError> {
    let mut member = get_member_by_external_id(external_id, deps).await?;

    let spouse_external_id = match spouse_external_id.map(str::trim).filter(|s| !s.is_empty()) {
        Some(given) => given.to_string(),
        None => member.spouse_external_id.clone().ok_or_else(|| {
            MemberError::InvalidRequest(format!(
                "member {} has no spouse reference to relink",
                external_id
            ))
        })?,
    };

    if !member.is_spouse_linked()
        && member.spouse_external_id.as_deref() != Some(spouse_external_id.as_str())
    {
        member.spouse_external_id = Some(spouse_external_id.clone());
        member = deps.identity_store.save_member(&member).await?;
    }

    info!(
        member_id = %member.id,
        status = %member.spouse_assignment_status,
        spouse_external_id = %spouse_external_id,
        "Relinking spouse"
    );

    Ok(link_spouse(member, &spouse_external_id, deps).await)
}
