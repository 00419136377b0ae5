#![forbid(unsafe_code)]

mod ai;
mod args;
mod jsonrpc;

pub(crate) use ai::*;
pub(crate) use args::*;
pub(crate) use jsonrpc::*;
