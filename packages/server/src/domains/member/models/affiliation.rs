use serde::{Deserialize, Serialize};
use std::fmt;

/// Program affiliation derived from a member's partner and client type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "affiliation_category")]
pub enum Affiliation {
    #[serde(rename = "A_INDIVIDUAL")]
    #[sqlx(rename = "A_INDIVIDUAL")]
    AIndividual,
    #[serde(rename = "A_FAMILY_PRIMARY")]
    #[sqlx(rename = "A_FAMILY_PRIMARY")]
    AFamilyPrimary,
    #[serde(rename = "B_EMPLOYEE")]
    #[sqlx(rename = "B_EMPLOYEE")]
    BEmployee,
    #[serde(rename = "B_CONTRACTOR")]
    #[sqlx(rename = "B_CONTRACTOR")]
    BContractor,
    #[serde(rename = "UNKNOWN_AFFILIATION")]
    #[sqlx(rename = "UNKNOWN_AFFILIATION")]
    UnknownAffiliation,
}

impl Affiliation {
    /// Classify a (partner, client type) pair. Exact, case-sensitive match.
    ///
    /// Total: an unmapped pair is recorded as `UnknownAffiliation` so that
    /// classification never blocks an enrollment.
    pub fn resolve(partner: &str, client_type: &str) -> Self {
        match (partner, client_type) {
            ("PartnerA", "INDIVIDUAL") => Affiliation::AIndividual,
            ("PartnerA", "FAMILY") => Affiliation::AFamilyPrimary,
            ("PartnerB", "EMPLOYEE") => Affiliation::BEmployee,
            ("PartnerB", "CONTRACTOR") => Affiliation::BContractor,
            _ => Affiliation::UnknownAffiliation,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Affiliation::AIndividual => "A_INDIVIDUAL",
            Affiliation::AFamilyPrimary => "A_FAMILY_PRIMARY",
            Affiliation::BEmployee => "B_EMPLOYEE",
            Affiliation::BContractor => "B_CONTRACTOR",
            Affiliation::UnknownAffiliation => "UNKNOWN_AFFILIATION",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Affiliation::UnknownAffiliation)
    }
}

impl fmt::Display for Affiliation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
