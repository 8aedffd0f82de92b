//! Member domain activities - business logic functions
//!
//! Activities take `ServerDeps` and do the work; edges project results for
//! callers.

mod enroll_member;
mod link_spouse;
mod publish;
mod queries;

pub use enroll_member::enroll_member;
pub use link_spouse::link_spouse;
pub use queries::{get_family, get_member_by_external_id, relink_spouse};
