//! Liquidity claim ledger

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::{PairError, Result};
use crate::events::{EventLog, PairEvent};

/// Total claims issued and per-holder balances. No balance ever goes
/// negative and `total_supply` always equals the sum of balances.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimLedger {
    total_supply: u128,
    balances: BTreeMap<Address, u128>,
}

impl ClaimLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    pub fn balance_of(&self, holder: &Address) -> u128 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    /// Holders with a non-zero balance
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &u128)> {
        self.balances.iter().filter(|(_, b)| **b > 0)
    }

    pub fn mint(&mut self, to: &Address, amount: u128, log: &mut EventLog) -> Result<()> {
        let supply = self.total_supply.checked_add(amount).ok_or(PairError::Overflow)?;
        let balance = self.balance_of(to).checked_add(amount).ok_or(PairError::Overflow)?;
        self.total_supply = supply;
        self.balances.insert(*to, balance);
        log.emit(PairEvent::Transfer {
            from: Address::ZERO,
            to: *to,
            amount,
        });
        Ok(())
    }

    pub fn burn(&mut self, from: &Address, amount: u128, log: &mut EventLog) -> Result<()> {
        if from.is_zero() {
            return Err(PairError::SinkLocked);
        }
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(PairError::InsufficientBalance);
        }
        self.balances.insert(*from, balance - amount);
        // Supply >= any single balance
        self.total_supply -= amount;
        log.emit(PairEvent::Transfer {
            from: *from,
            to: Address::ZERO,
            amount,
        });
        Ok(())
    }

    pub fn transfer(&mut self, from: &Address, to: &Address, amount: u128, log: &mut EventLog) -> Result<()> {
        if from.is_zero() {
            return Err(PairError::SinkLocked);
        }
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(PairError::InsufficientBalance);
        }
        if from != to {
            let to_balance = self.balance_of(to).checked_add(amount).ok_or(PairError::Overflow)?;
            self.balances.insert(*from, from_balance - amount);
            self.balances.insert(*to, to_balance);
        }
        log.emit(PairEvent::Transfer {
            from: *from,
            to: *to,
            amount,
        });
        Ok(())
    }
}
