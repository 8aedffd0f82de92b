use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lifecycle flag of an enrolled member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "member_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberStatus {
    #[default]
    Active,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Active => "ACTIVE",
        }
    }
}

/// Progress of the spouse-matching protocol for one member.
///
/// `Pending` is the initial state. The other three end a linking attempt;
/// an external re-invocation may leave `SpouseNotFound` or `Failed` again,
/// but nothing ever leaves `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(
    type_name = "spouse_assignment_status",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpouseAssignmentStatus {
    #[default]
    Pending,
    Completed,
    SpouseNotFound,
    Failed,
}

impl SpouseAssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpouseAssignmentStatus::Pending => "PENDING",
            SpouseAssignmentStatus::Completed => "COMPLETED",
            SpouseAssignmentStatus::SpouseNotFound => "SPOUSE_NOT_FOUND",
            SpouseAssignmentStatus::Failed => "FAILED",
        }
    }

    /// Whether a linking attempt may move a member from `self` to `next`.
    ///
    /// `Completed -> Completed` is allowed so converging twice is a no-op.
    pub fn can_transition_to(&self, next: SpouseAssignmentStatus) -> bool {
        use SpouseAssignmentStatus::*;

        match (self, next) {
            (_, Pending) => false,
            (Completed, Completed) => true,
            (Completed, _) => false,
            (Pending | SpouseNotFound | Failed, _) => true,
        }
    }
}

impl fmt::Display for SpouseAssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected spouse assignment transition.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Illegal spouse assignment transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: SpouseAssignmentStatus,
    pub to: SpouseAssignmentStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use SpouseAssignmentStatus::*;

    #[test]
    fn test_pending_moves_to_every_terminal_state() {
        for next in [Completed, SpouseNotFound, Failed] {
            assert!(Pending.can_transition_to(next), "PENDING -> {next}");
        }
    }

    #[test]
    fn test_nothing_returns_to_pending() {
        for from in [Pending, Completed, SpouseNotFound, Failed] {
            assert!(!from.can_transition_to(Pending), "{from} -> PENDING");
        }
    }

    #[test]
    fn test_completed_never_reverts() {
        assert!(Completed.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(SpouseNotFound));
        assert!(!Completed.can_transition_to(Failed));
    }

    #[test]
    fn test_reattempt_from_not_found_and_failed() {
        for from in [SpouseNotFound, Failed] {
            for next in [Completed, SpouseNotFound, Failed] {
                assert!(from.can_transition_to(next), "{from} -> {next}");
            }
        }
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&SpouseNotFound).unwrap();
        assert_eq!(json, "\"SPOUSE_NOT_FOUND\"");
        assert_eq!(SpouseNotFound.as_str(), "SPOUSE_NOT_FOUND");
    }
}
