//! Pipeline module driving a complete backup run
//!
//! This module contains:
//! - `Coordinator`, which sequences authentication, export, and archiving
//! - `RunOptions` and the `CodePrompt` seam for the interactive code entry

mod coordinator;
mod options;

pub use coordinator::{Coordinator, SITES_FILE, URLS_FILE};
pub use options::{run_timestamp, CodePrompt, NoPrompt, RunOptions};
