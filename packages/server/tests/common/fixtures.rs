//! Test fixtures for building enrollment requests and seeding members.

use loyalty_core::domains::member::activities::enroll_member;
use loyalty_core::domains::member::{EnrollmentRequest, Member};
use loyalty_core::kernel::ServerDeps;
use uuid::Uuid;

/// Unique external id so tests sharing a database never collide.
pub fn unique_external_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

/// PartnerA / INDIVIDUAL request without family or spouse.
pub fn individual(external_id: &str) -> EnrollmentRequest {
    EnrollmentRequest::builder()
        .external_id(external_id)
        .partner("PartnerA")
        .client_type("INDIVIDUAL")
        .build()
}

/// PartnerA / FAMILY request that references a spouse.
pub fn family_primary(external_id: &str, spouse_external_id: &str) -> EnrollmentRequest {
    EnrollmentRequest::builder()
        .external_id(external_id)
        .partner("PartnerA")
        .client_type("FAMILY")
        .spouse_external_id(spouse_external_id)
        .build()
}

/// Enroll and unwrap, for arranging state.
pub async fn enroll(request: EnrollmentRequest, deps: &ServerDeps) -> Member {
    enroll_member(request, deps)
        .await
        .expect("Failed to enroll fixture member")
}
