#![forbid(unsafe_code)]

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CropCount {
    pub crop_name: String,
    pub count: u64,
}
