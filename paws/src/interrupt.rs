//! Cooperative cancellation for the execution loops.
//!
//! A Ctrl-C handler raises a shared flag; loops poll it between iterations.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tracing::debug;

/// Shared interrupt flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    raised: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag from Ctrl-C. May be installed once per process.
    pub fn install_ctrlc_handler(&self) -> Result<()> {
        let raised = Arc::clone(&self.raised);
        ctrlc::set_handler(move || {
            raised.store(true, Ordering::SeqCst);
        })
        .context("install Ctrl-C handler")?;
        debug!("Ctrl-C handler installed");
        Ok(())
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let interrupt = Interrupt::new();
        let observer = interrupt.clone();
        assert!(!observer.is_raised());

        interrupt.raise();

        assert!(observer.is_raised());
    }
}
