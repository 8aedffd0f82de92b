pub mod affiliation;
pub mod family_member;
pub mod member;
pub mod spouse_link;
pub mod status;

pub use affiliation::Affiliation;
pub use family_member::{FamilyMember, RelationshipType};
pub use member::Member;
pub use spouse_link::SpouseLink;
pub use status::{MemberStatus, SpouseAssignmentStatus, TransitionError};
