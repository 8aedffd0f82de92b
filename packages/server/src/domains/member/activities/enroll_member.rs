//! Enroll member activity

use tracing::{error, info, warn};

use super::link_spouse;
use super::publish::PublishEvents;
use crate::domains::member::data::EnrollmentRequest;
use crate::domains::member::errors::MemberError;
use crate::domains::member::models::Member;
use crate::kernel::{ServerDeps, StoreError};

/// Enroll a new member and, if a spouse reference was given, link them.
///
/// Rejects an external id that is already enrolled, and fails without
/// persisting anything if the enrollment event cannot be published. Once the
/// member is persisted the enrollment stands: the linking outcome is reported
/// through `spouse_assignment_status`, never as an error.
pub async fn enroll_member(
    request: EnrollmentRequest,
    deps: &ServerDeps,
) -> Result<Member, MemberError> {
    info!(
        external_id = %request.external_id,
        partner = %request.partner,
        client_type = %request.client_type,
        "Enrolling new member"
    );

    let external_id = request.external_id.trim();
    if external_id.is_empty() {
        return Err(MemberError::InvalidRequest(
            "external_id must not be empty".to_string(),
        ));
    }

    let store = deps.identity_store.as_ref();

    // Fast path only; the store's unique index is what actually prevents
    // two members with one external id.
    if store.exists_by_external_id(external_id).await? {
        warn!(external_id, "Member already exists");
        return Err(MemberError::DuplicateEnrollment {
            external_id: external_id.to_string(),
        });
    }

    let member = Member::enroll(&request, deps.clock.now());
    if !member.affiliation.is_known() {
        warn!(
            external_id = %member.external_id,
            partner = %member.partner,
            client_type = %member.client_type,
            "No affiliation mapping, enrolling as UNKNOWN_AFFILIATION"
        );
    }

    // The enrollment event is published inside the insert: if it cannot be
    // published, the member is not persisted and the caller may retry.
    let saved = store
        .insert_member(&member, &PublishEvents::new(deps))
        .await
        .map_err(|e| match e {
            StoreError::DuplicateExternalId(external_id) => {
                warn!(%external_id, "Concurrent enrollment won the race");
                MemberError::DuplicateEnrollment { external_id }
            }
            other => {
                error!(external_id = %member.external_id, error = %other, "Failed to enroll member");
                MemberError::Store(other)
            }
        })?;

    info!(
        member_id = %saved.id,
        affiliation = %saved.affiliation,
        family_id = %saved.family_id,
        "Successfully enrolled member"
    );

    match saved.spouse_external_id.clone() {
        Some(spouse_external_id) => Ok(link_spouse(saved, &spouse_external_id, deps).await),
        None => Ok(saved),
    }
}
