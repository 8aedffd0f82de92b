use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Input for enrolling a new member.
///
/// `family_id` and `spouse_external_id` treat an empty string the same as
/// absent.
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct EnrollmentRequest {
    pub external_id: String,
    pub partner: String,
    pub client_type: String,
    #[builder(default, setter(strip_option))]
    pub family_id: Option<String>,
    #[builder(default, setter(strip_option))]
    pub spouse_external_id: Option<String>,
}

impl EnrollmentRequest {
    /// Caller-supplied family id, if one was actually given.
    pub fn requested_family_id(&self) -> Option<&str> {
        non_blank(self.family_id.as_deref())
    }

    /// Spouse reference, if one was actually given.
    pub fn spouse_reference(&self) -> Option<&str> {
        non_blank(self.spouse_external_id.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
