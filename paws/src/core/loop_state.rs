//! State machine shared by the evaluation and visualization loops.
//!
//! ```text
//! Initializing -> Running -> (Resetting <-> Running) -> Stopped
//! ```
//!
//! `Stopped` is terminal and is only entered on an external interrupt (checked
//! at iteration boundaries) or on a fault.

/// Phase of an execution loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Environment is being constructed and reset for the first time.
    Initializing,
    /// Steady-state: act, step, render.
    Running,
    /// The last step ended an episode; the environment must be reset.
    Resetting,
    /// Loop finished; the environment has been (or is being) released.
    Stopped,
}

/// Inputs that drive [`LoopState`] transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopInput {
    /// First reset completed.
    Initialized,
    /// A step completed; `episode_over` is `terminated || truncated`.
    Stepped { episode_over: bool },
    /// Reset after an episode boundary completed.
    ResetDone,
    /// External interrupt observed at an iteration boundary.
    Interrupted,
    /// Unrecoverable fault from a collaborator.
    Fault,
}

/// Next state, or `None` if `input` is not legal in `state`.
pub fn transition(state: LoopState, input: LoopInput) -> Option<LoopState> {
    use LoopInput as I;
    use LoopState as S;

    match (state, input) {
        (S::Stopped, _) => None,
        (_, I::Fault) => Some(S::Stopped),
        (S::Initializing, I::Initialized) => Some(S::Running),
        (S::Initializing, I::Interrupted) => Some(S::Stopped),
        (S::Running, I::Stepped { episode_over: true }) => Some(S::Resetting),
        (S::Running, I::Stepped { episode_over: false }) => Some(S::Running),
        (S::Running, I::Interrupted) => Some(S::Stopped),
        (S::Resetting, I::ResetDone) => Some(S::Running),
        _ => None,
    }
}
