//! I/O helpers for paws commands.

pub mod artifact;
pub mod config;
pub mod progress_log;
pub mod runs;
