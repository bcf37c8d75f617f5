//! UQ112x112 fixed-point prices
//!
//! A price is stored as `value * 2^112` in the low 224 bits of a `U256`.
//! Any ratio of two 112-bit reserves is representable with full integer
//! part, and `price * seconds` for a 32-bit elapsed time stays below 2^256,
//! so accumulation only ever wraps on the running sum.

use crate::{MathError, MAX_RESERVE, U256};

/// Unsigned fixed-point number with 112 integer and 112 fractional bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct UQ112x112(pub U256);

impl UQ112x112 {
    /// Number of fractional bits
    pub const RESOLUTION: usize = 112;

    /// 2^112, the fixed-point representation of 1
    pub fn one() -> Self {
        Self(U256::one() << Self::RESOLUTION)
    }

    /// Encode a 112-bit integer as fixed point
    pub fn encode(y: u128) -> Result<Self, MathError> {
        if y > MAX_RESERVE {
            return Err(MathError::Overflow);
        }
        Ok(Self(U256::from(y) << Self::RESOLUTION))
    }

    /// Divide by a 112-bit integer, truncating
    pub fn uqdiv(self, y: u128) -> Result<Self, MathError> {
        if y == 0 {
            return Err(MathError::DivisionByZero);
        }
        Ok(Self(self.0 / U256::from(y)))
    }

    /// `numerator / denominator` as fixed point (both 112-bit)
    pub fn ratio(numerator: u128, denominator: u128) -> Result<Self, MathError> {
        Self::encode(numerator)?.uqdiv(denominator)
    }

    /// `self * seconds`, modulo 2^256
    pub fn wrapping_mul(self, seconds: u32) -> U256 {
        self.0.overflowing_mul(U256::from(seconds)).0
    }

    /// Average price between two cumulative readings taken `elapsed`
    /// seconds apart. The subtraction wraps, so readings on either side of
    /// an accumulator overflow still produce the right window average.
    pub fn average(older: U256, newer: U256, elapsed: u32) -> Result<Self, MathError> {
        if elapsed == 0 {
            return Err(MathError::DivisionByZero);
        }
        let delta = newer.overflowing_sub(older).0;
        Ok(Self(delta / U256::from(elapsed)))
    }

    /// Integer part, truncated
    pub fn integer_part(self) -> U256 {
        self.0 >> Self::RESOLUTION
    }

    /// Lossy conversion for display
    pub fn to_f64(self) -> f64 {
        const TWO_64: f64 = 18_446_744_073_709_551_616.0;
        const TWO_112: f64 = 5_192_296_858_534_827_628_530_496_329_220_096.0;

        let limbs = (self.0).0;
        let mut acc = 0.0f64;
        for limb in limbs.iter().rev() {
            acc = acc * TWO_64 + *limb as f64;
        }
        acc / TWO_112
    }
}

/// Add `price * seconds` to an accumulator, wrapping at 2^256
#[inline]
pub fn accumulate(cumulative: U256, price: UQ112x112, seconds: u32) -> U256 {
    cumulative.overflowing_add(price.wrapping_mul(seconds)).0
}
