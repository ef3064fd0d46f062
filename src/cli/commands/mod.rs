//! CLI command implementations

mod scan;
mod stage;

pub use scan::{ScanArgs, handle_scan};
pub use stage::{StageArgs, handle_stage};
