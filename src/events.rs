//! Observable notifications emitted by the pair

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Pair event
///
/// Events raised by an operation that later fails are discarded together
/// with the rest of its effects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum PairEvent {
    /// Claim movement; mints come from and burns go to `Address::ZERO`
    Transfer {
        from: Address,
        to: Address,
        amount: u128,
    },
    Mint {
        sender: Address,
        amount0: u128,
        amount1: u128,
    },
    Burn {
        sender: Address,
        amount0: u128,
        amount1: u128,
        to: Address,
    },
    Swap {
        sender: Address,
        amount0_in: u128,
        amount1_in: u128,
        amount0_out: u128,
        amount1_out: u128,
        to: Address,
    },
    Sync {
        reserve0: u128,
        reserve1: u128,
    },
}

/// Append-only event log with truncate-on-rollback
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<PairEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: PairEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn as_slice(&self) -> &[PairEvent] {
        &self.events
    }

    /// Events emitted at or after position `mark`
    pub fn since(&self, mark: usize) -> &[PairEvent] {
        self.events.get(mark..).unwrap_or(&[])
    }

    /// Drop everything emitted after `mark`
    pub fn truncate(&mut self, mark: usize) {
        self.events.truncate(mark);
    }

    pub fn drain(&mut self) -> Vec<PairEvent> {
        core::mem::take(&mut self.events)
    }
}
