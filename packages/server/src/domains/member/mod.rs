//! Member domain - enrollment and spouse/family linking
//!
//! Architecture:
//!   edges (caller-facing, MemberData) → activities (enroll, link, relink)
//!   → kernel traits (identity store, NATS publisher, clock)

pub mod activities;
pub mod data;
pub mod edges;
pub mod errors;
pub mod events;
pub mod models;

// Re-export commonly used types
pub use data::{EnrollmentRequest, MemberData};
pub use errors::{LinkError, MemberError};
pub use events::MemberEvent;
pub use models::{Affiliation, FamilyMember, Member, SpouseAssignmentStatus};
