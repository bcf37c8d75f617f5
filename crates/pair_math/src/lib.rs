//! Pair Math - exact integer arithmetic for a constant product pair (x·y=k)
//!
//! This crate holds every formula the pair engine relies on, with no state
//! and no I/O, so the same functions back the engine, the CLI quotes and the
//! Kani proofs:
//! - `U256` wide integers for products of two 112-bit reserves
//! - `UQ112x112` fixed-point prices with wrapping accumulation
//! - integer square root, fee-adjusted invariant check, liquidity formulas
//! - protocol fee growth formula and swap quoting

#![no_std]

#[cfg(kani)]
extern crate kani;

pub mod math;
pub mod uq112x112;

pub use math::{
    fee_adjusted_invariant_holds, get_amount_in, get_amount_out, initial_liquidity,
    integer_sqrt, proportional_liquidity, protocol_fee_liquidity, pro_rata_share, quote,
    to_u128,
};
pub use uq112x112::UQ112x112;

uint::construct_uint! {
    /// 256-bit unsigned integer for reserve products and price accumulators.
    pub struct U256(4);
}

/// Largest value a reserve may hold (2^112 - 1)
pub const MAX_RESERVE: u128 = (1u128 << 112) - 1;

/// Claims permanently locked on the first mint
pub const MINIMUM_LIQUIDITY: u128 = 1_000;

/// Trading fee as a fraction of the input amount.
///
/// The invariant check scales balances by `denominator` and subtracts
/// `numerator` per unit of input, so 19/10_000 counts 99.81% of every
/// input toward `k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeRate {
    pub numerator: u32,
    pub denominator: u32,
}

impl FeeRate {
    /// 0.19% trading fee
    pub const DEFAULT: Self = Self {
        numerator: 19,
        denominator: 10_000,
    };

    /// 0.30% trading fee
    pub const THIRTY_BPS: Self = Self {
        numerator: 3,
        denominator: 1_000,
    };

    /// Zero-fee curve, mostly useful in tests
    pub const ZERO: Self = Self {
        numerator: 0,
        denominator: 1,
    };

    /// Fee must be strictly below 100% with a nonzero denominator
    pub const fn is_valid(&self) -> bool {
        self.denominator > 0 && self.numerator < self.denominator
    }
}

impl Default for FeeRate {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Share of invariant growth minted to the protocol fee recipient.
///
/// Minted claims are `supply * (√k - √k_last) / (√k * divisor + √k_last)`,
/// which hands the recipient `1 / (divisor + 1)` of the growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolFeeShare {
    pub divisor: u32,
}

impl ProtocolFeeShare {
    /// One nineteenth of growth (divisor 18)
    pub const ONE_NINETEENTH: Self = Self { divisor: 18 };

    /// One sixth of growth (divisor 5)
    pub const ONE_SIXTH: Self = Self { divisor: 5 };
}

impl Default for ProtocolFeeShare {
    fn default() -> Self {
        Self::ONE_NINETEENTH
    }
}

/// Error types for pair math
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    /// Arithmetic overflow (also: result does not fit the target width)
    Overflow,
    /// Zero reserve on either side
    InsufficientLiquidity,
    /// Zero input amount
    InsufficientInputAmount,
    /// Zero output amount
    InsufficientOutputAmount,
    /// Division by zero
    DivisionByZero,
    /// Fee rate is not a proper fraction
    InvalidFee,
}
