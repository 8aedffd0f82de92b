use thiserror::Error;

use crate::domains::member::models::TransitionError;
use crate::kernel::StoreError;

/// Errors surfaced to callers of the member operations.
#[derive(Error, Debug)]
pub enum MemberError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Member already enrolled with external id: {external_id}")]
    DuplicateEnrollment { external_id: String },

    #[error("Member not found with external id: {external_id}")]
    MemberNotFound { external_id: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a linking attempt could not finish.
///
/// Never escapes the linker: it is logged and recorded on the member as
/// `FAILED`.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Member cannot be linked to itself")]
    SelfReference,

    #[error("Spouse {spouse_external_id} already belongs to family {family_id}")]
    SpouseLinkedElsewhere {
        spouse_external_id: String,
        family_id: String,
    },

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LinkError {
    /// Lost an optimistic-lock race; the attempt may be retried.
    pub fn is_conflict(&self) -> bool {
        matches!(self, LinkError::Store(StoreError::Conflict(_)))
    }
}
