//! Output module for progress reporting and run summaries
//!
//! This module handles:
//! - Console progress lines, resolution marks, and styled error lines
//! - Collecting and printing run statistics

mod console;
pub mod stats;

pub use console::{format_site_row, Console};
pub use stats::{print_statistics, RunStatistics};
