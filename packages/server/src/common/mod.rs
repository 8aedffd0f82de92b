// Common types shared by the kernel and the member domain

pub mod entity_ids;
pub mod id;
pub mod nats;

pub use entity_ids::{FamilyId, FamilyMemberId, MemberId};
pub use id::Id;
pub use nats::{publish_event, IntoNatsPayload};
