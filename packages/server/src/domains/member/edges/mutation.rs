use tracing::error;

use crate::domains::member::activities;
use crate::domains::member::data::{EnrollmentRequest, MemberData};
use crate::domains::member::errors::MemberError;
use crate::kernel::ServerDeps;

/// Enroll a new member
///
/// Fails only with `DuplicateEnrollment`, `InvalidRequest` or a store error
/// on the enrollment path. Spouse linking problems show up in
/// `spouse_assignment_status` instead.
pub async fn enroll(request: EnrollmentRequest, deps: &ServerDeps) -> Result<MemberData, MemberError> {
    activities::enroll_member(request, deps)
        .await
        .map(MemberData::from)
        .map_err(|e| {
            error!(error = %e, "Failed to enroll member");
            e
        })
}

/// Re-run spouse linking for an enrolled member
pub async fn relink_spouse(
    external_id: &str,
    spouse_external_id: Option<&str>,
    deps: &ServerDeps,
) -> Result<MemberData, MemberError> {
    activities::relink_spouse(external_id, spouse_external_id, deps)
        .await
        .map(MemberData::from)
}
