//! CLI command implementations for strata

mod common;
mod status;
mod sync;

pub use status::status;
pub use sync::{SyncArgs, sync};
