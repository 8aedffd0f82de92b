pub mod enrollment_request;
pub mod member;

pub use enrollment_request::EnrollmentRequest;
pub use member::MemberData;
