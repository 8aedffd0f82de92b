// Loyalty Enrollment - Member Core
//
// This crate enrolls loyalty members, classifies their program affiliation
// and links spouses into shared family groups.
//
// Activities live per-domain in domains/*/activities/; infrastructure seams
// (identity store, NATS, clock) live in kernel/.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;

pub use config::*;
