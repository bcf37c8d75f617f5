//! Reserve ledger

use pair_math::MAX_RESERVE;
use serde::{Deserialize, Serialize};

use crate::error::{PairError, Result};
use crate::events::{EventLog, PairEvent};
use crate::oracle::PriceAccumulator;

/// Snapshot returned by `Pair::reserves`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserves {
    pub reserve0: u128,
    pub reserve1: u128,
    pub block_timestamp_last: u32,
}

/// Truncate a unix timestamp to the 32-bit block time the ledger stores
#[inline]
pub fn block_timestamp(timestamp: u64) -> u32 {
    (timestamp % (1u64 << 32)) as u32
}

/// Last-synced custody balances and the time they were recorded
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveLedger {
    reserve0: u128,
    reserve1: u128,
    block_timestamp_last: u32,
}

impl ReserveLedger {
    pub fn reserves(&self) -> Reserves {
        Reserves {
            reserve0: self.reserve0,
            reserve1: self.reserve1,
            block_timestamp_last: self.block_timestamp_last,
        }
    }

    /// Record `balance0`/`balance1` as the new reserves at `timestamp`.
    ///
    /// Balances above 112 bits are rejected with `Overflow`. When time has
    /// passed and the previous reserves were both non-zero, the oracle is
    /// advanced with those previous reserves first. A second update within
    /// the same second therefore leaves the accumulators untouched.
    pub fn update(
        &mut self,
        oracle: &mut PriceAccumulator,
        balance0: u128,
        balance1: u128,
        timestamp: u64,
        log: &mut EventLog,
    ) -> Result<()> {
        if balance0 > MAX_RESERVE || balance1 > MAX_RESERVE {
            return Err(PairError::Overflow);
        }
        let now = block_timestamp(timestamp);
        let elapsed = now.wrapping_sub(self.block_timestamp_last);
        if elapsed > 0 && self.reserve0 != 0 && self.reserve1 != 0 {
            oracle.accumulate(self.reserve0, self.reserve1, elapsed)?;
        }
        self.reserve0 = balance0;
        self.reserve1 = balance1;
        self.block_timestamp_last = now;
        log.emit(PairEvent::Sync {
            reserve0: balance0,
            reserve1: balance1,
        });
        Ok(())
    }
}
