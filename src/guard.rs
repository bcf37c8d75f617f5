//! Single-slot reentrancy lock

use crate::error::{PairError, Result};

/// Held for the whole of every mutating pair operation, including the
/// flash-swap callback. Not persisted: a pair at rest is always unlocked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReentrancyGuard {
    locked: bool,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock, failing with `Reentrancy` if it is already held
    pub fn acquire(&mut self) -> Result<()> {
        if self.locked {
            return Err(PairError::Reentrancy);
        }
        self.locked = true;
        Ok(())
    }

    pub fn release(&mut self) {
        self.locked = false;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}
