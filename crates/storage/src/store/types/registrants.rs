#![forbid(unsafe_code)]

use census_core::Registrant;
use census_core::ids::RegistrantId;
use serde::Serialize;

/// A persisted registrant with its crops and family members joined in.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrantDetail {
    pub id: RegistrantId,
    #[serde(flatten)]
    pub registrant: Registrant,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}
