#![forbid(unsafe_code)]

mod crops;
mod registrants;

pub use crops::*;
pub use registrants::*;
