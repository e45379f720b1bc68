//! Stable exit codes for `paws` commands.

/// Command succeeded, or an execution loop was stopped by the user.
pub const OK: i32 = 0;
/// Invalid config, unknown registry kind, or a fatal environment/agent fault.
pub const INVALID: i32 = 1;
/// `paws eval` could not resolve a run or load its model.
pub const ABORTED: i32 = 2;
