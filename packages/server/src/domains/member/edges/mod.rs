//! Caller-facing member operations

pub mod mutation;
pub mod query;

pub use mutation::{enroll, relink_spouse};
pub use query::{family, get_by_external_id};
