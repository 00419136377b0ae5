#![forbid(unsafe_code)]

use super::CancelToken;
use census_core::ids::RegistrantId;
use serde_json::Value;

#[derive(Clone, Debug)]
pub struct CreateRegistrantRequest {
    /// Raw camelCase form payload; validated before anything is written.
    pub payload: Value,
    pub cancel: Option<CancelToken>,
}

impl CreateRegistrantRequest {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            cancel: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ReplaceRegistrantRequest {
    pub id: RegistrantId,
    pub payload: Value,
    pub cancel: Option<CancelToken>,
}

impl ReplaceRegistrantRequest {
    pub fn new(id: RegistrantId, payload: Value) -> Self {
        Self {
            id,
            payload,
            cancel: None,
        }
    }
}
