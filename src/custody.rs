//! Asset custody capability and the in-memory ledger
//!
//! The pair never pulls funds: callers push assets to the pair's address
//! through the ledger, and the pair infers what arrived by diffing
//! `balance_of(asset, pair)` against its reserves.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::Address;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("{holder} holds {available} of {asset}, needs {requested}")]
    InsufficientFunds {
        asset: Address,
        holder: Address,
        available: u128,
        requested: u128,
    },
    #[error("balance of {holder} in {asset} would overflow")]
    Overflow { asset: Address, holder: Address },
}

/// Trait for the fungible-asset ledger the pair holds custody through
///
/// Implementations must support checkpoints: every pair operation takes
/// one on entry and reverts to it if the operation fails, which is how
/// optimistic swap transfers (and anything a flash callee did) are undone.
pub trait AssetLedger {
    /// Opaque state captured by `checkpoint`
    type Checkpoint;

    /// Balance of `holder` in `asset`
    fn balance_of(&self, asset: &Address, holder: &Address) -> u128;

    /// Move `amount` of `asset` from `from` to `to`
    fn transfer(
        &mut self,
        asset: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), LedgerError>;

    /// Capture the current state
    fn checkpoint(&self) -> Self::Checkpoint;

    /// Restore a state captured by `checkpoint`
    fn revert(&mut self, checkpoint: Self::Checkpoint);
}

/// BTreeMap-backed ledger (asset → holder → balance)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryLedger {
    balances: BTreeMap<Address, BTreeMap<Address, u128>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue new units of `asset` to `holder` (stands in for the asset's
    /// own minting, which is outside the pair)
    pub fn issue(&mut self, asset: &Address, holder: &Address, amount: u128) -> Result<(), LedgerError> {
        let balance = self.balances.entry(*asset).or_default().entry(*holder).or_default();
        *balance = balance.checked_add(amount).ok_or(LedgerError::Overflow {
            asset: *asset,
            holder: *holder,
        })?;
        Ok(())
    }

    /// Sum of all balances of `asset`
    pub fn total_supply(&self, asset: &Address) -> u128 {
        self.balances
            .get(asset)
            .map(|holders| holders.values().fold(0u128, |acc, b| acc.saturating_add(*b)))
            .unwrap_or(0)
    }

    /// Non-zero balances of `asset`
    pub fn holders<'a>(&'a self, asset: &Address) -> impl Iterator<Item = (&'a Address, &'a u128)> + 'a {
        self.balances
            .get(asset)
            .into_iter()
            .flat_map(|holders| holders.iter())
            .filter(|(_, balance)| **balance > 0)
    }
}

impl AssetLedger for MemoryLedger {
    type Checkpoint = BTreeMap<Address, BTreeMap<Address, u128>>;

    fn balance_of(&self, asset: &Address, holder: &Address) -> u128 {
        self.balances
            .get(asset)
            .and_then(|holders| holders.get(holder))
            .copied()
            .unwrap_or(0)
    }

    fn transfer(
        &mut self,
        asset: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let available = self.balance_of(asset, from);
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                asset: *asset,
                holder: *from,
                available,
                requested: amount,
            });
        }
        if from == to || amount == 0 {
            return Ok(());
        }
        let received = self.balance_of(asset, to).checked_add(amount).ok_or(LedgerError::Overflow {
            asset: *asset,
            holder: *to,
        })?;

        let holders = self.balances.entry(*asset).or_default();
        holders.insert(*from, available - amount);
        holders.insert(*to, received);
        Ok(())
    }

    fn checkpoint(&self) -> Self::Checkpoint {
        self.balances.clone()
    }

    fn revert(&mut self, checkpoint: Self::Checkpoint) {
        self.balances = checkpoint;
    }
}
