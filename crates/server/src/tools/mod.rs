#![forbid(unsafe_code)]

mod crops;
mod definitions;
mod dispatch;
mod registrants;

pub(crate) use definitions::tool_definitions;
pub(crate) use dispatch::dispatch_tool;
