//! Time-weighted price accumulator
//!
//! Each reserve update integrates the price that held since the previous
//! update: `price0 += (r1 / r0) · Δt` and `price1 += (r0 / r1) · Δt` in
//! UQ112x112, wrapping at 2^256. Consumers take two readings and divide the
//! wrapped difference by the elapsed time; the absolute values carry no
//! meaning.

use pair_math::uq112x112::{accumulate, UQ112x112};
use pair_math::U256;
use serde::{Deserialize, Serialize};

use crate::error::{PairError, Result};

/// Cumulative prices, one per direction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAccumulator {
    #[serde(with = "crate::serde_u256")]
    pub price0_cumulative_last: U256,
    #[serde(with = "crate::serde_u256")]
    pub price1_cumulative_last: U256,
}

impl PriceAccumulator {
    /// Integrate the prices implied by `(reserve0, reserve1)` over `elapsed`
    /// seconds. Callers pass the reserves as they stood before the current
    /// operation and skip the call when either is zero.
    pub fn accumulate(&mut self, reserve0: u128, reserve1: u128, elapsed: u32) -> Result<()> {
        let (price0, price1) = spot_prices(reserve0, reserve1)?;
        self.price0_cumulative_last = accumulate(self.price0_cumulative_last, price0, elapsed);
        self.price1_cumulative_last = accumulate(self.price1_cumulative_last, price1, elapsed);
        Ok(())
    }
}

/// Instantaneous prices `(r1 / r0, r0 / r1)`
pub fn spot_prices(reserve0: u128, reserve1: u128) -> Result<(UQ112x112, UQ112x112)> {
    let price0 = UQ112x112::ratio(reserve1, reserve0)?;
    let price1 = UQ112x112::ratio(reserve0, reserve1)?;
    Ok((price0, price1))
}

/// A cumulative-price reading at a point in time
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Seconds, truncated to 32 bits
    pub timestamp: u32,
    #[serde(with = "crate::serde_u256")]
    pub price0_cumulative: U256,
    #[serde(with = "crate::serde_u256")]
    pub price1_cumulative: U256,
}

/// Time-weighted average prices between two observations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AveragePrices {
    pub price0: UQ112x112,
    pub price1: UQ112x112,
    pub elapsed: u32,
}

/// Average prices over `[older, newer]`. Both the timestamp and the
/// cumulative differences wrap, so the window must be shorter than either
/// wrap period (about 136 years for timestamps).
pub fn average_prices(older: &Observation, newer: &Observation) -> Result<AveragePrices> {
    let elapsed = newer.timestamp.wrapping_sub(older.timestamp);
    if elapsed == 0 {
        return Err(PairError::OracleWindowEmpty);
    }
    Ok(AveragePrices {
        price0: UQ112x112::average(older.price0_cumulative, newer.price0_cumulative, elapsed)?,
        price1: UQ112x112::average(older.price1_cumulative, newer.price1_cumulative, elapsed)?,
        elapsed,
    })
}
