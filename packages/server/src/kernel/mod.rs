//! Kernel module - infrastructure seams and their implementations.

pub mod deps;
pub mod identity_store;
pub mod nats;
pub mod test_dependencies;
pub mod traits;

pub use deps::{ServerDeps, DEFAULT_SUBJECT_PREFIX};
pub use identity_store::PgIdentityStore;
pub use nats::{NatsClientPublisher, NatsPublisher, PublishedMessage, TestNats};
pub use test_dependencies::{FixedClock, MockIdentityStore, StoreOp, TestDependencies};
pub use traits::*;
