//! Deterministic, pure logic shared by the experiment driver.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! values and return deterministic outputs suitable for tests.

pub mod loop_state;
pub mod reward;
pub mod space;
pub mod types;
