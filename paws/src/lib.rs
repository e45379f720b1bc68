//! Reinforcement-learning experiment driver.
//!
//! Trains an agent against a simulated environment, persists the result as a
//! run under a model directory, and replays or visualizes it later. The
//! architecture separates:
//!
//! - **[`core`]**: Pure, deterministic logic (step types, action spaces,
//!   reward shaping math, loop state transitions). No I/O.
//! - **[`env`]**: The environment capability, the reward-shaping wrapper and
//!   the built-in `door_reach` simulation.
//! - **[`agent`]**: The learning-agent capability and the built-in
//!   `hill_climb` agent.
//! - **[`io`]**: Side-effecting operations (config files, run resolution,
//!   artifact persistence, progress logs).
//!
//! Orchestration modules ([`train`], [`evaluate`], [`visualize`], [`inspect`])
//! coordinate them through an explicit [`registry::Registry`] to implement
//! CLI commands.

pub mod agent;
pub mod core;
pub mod env;
pub mod evaluate;
pub mod exit_codes;
pub mod inspect;
pub mod interrupt;
pub mod io;
pub mod logging;
pub mod looping;
pub mod registry;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod train;
pub mod visualize;
