//! Constant product pair math (x·y=k)
//!
//! Every function here is total: overflow, zero reserves and zero amounts
//! come back as `MathError` instead of panicking.

use crate::{FeeRate, MathError, ProtocolFeeShare, U256};

/// Narrow a `U256` to `u128`, failing if any high bit is set
#[inline]
pub fn to_u128(value: U256) -> Result<u128, MathError> {
    if value.bits() > 128 {
        return Err(MathError::Overflow);
    }
    Ok(value.low_u128())
}

#[inline]
fn mul(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_mul(b).ok_or(MathError::Overflow)
}

/// Floor square root (Babylonian method)
pub fn integer_sqrt(y: U256) -> U256 {
    if y > U256::from(3u8) {
        let mut z = y;
        let mut x = y / 2 + 1;
        while x < z {
            z = x;
            x = (y / x + x) / 2;
        }
        z
    } else if !y.is_zero() {
        U256::one()
    } else {
        U256::zero()
    }
}

/// Liquidity for the first deposit into an empty pair
///
/// `√(amount0 · amount1) - minimum_liquidity`; returns 0 when the geometric
/// mean does not exceed the locked minimum (caller rejects zero).
pub fn initial_liquidity(amount0: u128, amount1: u128, minimum_liquidity: u128) -> Result<u128, MathError> {
    let root = integer_sqrt(mul(U256::from(amount0), U256::from(amount1))?);
    let root = to_u128(root)?;
    Ok(root.saturating_sub(minimum_liquidity))
}

/// Liquidity for a deposit into a funded pair
///
/// Takes the smaller of the two ratios so a lopsided deposit only earns
/// credit for its weaker side.
pub fn proportional_liquidity(
    amount0: u128,
    amount1: u128,
    reserve0: u128,
    reserve1: u128,
    total_supply: u128,
) -> Result<u128, MathError> {
    if reserve0 == 0 || reserve1 == 0 {
        return Err(MathError::InsufficientLiquidity);
    }
    let supply = U256::from(total_supply);
    let by0 = mul(U256::from(amount0), supply)? / U256::from(reserve0);
    let by1 = mul(U256::from(amount1), supply)? / U256::from(reserve1);
    to_u128(by0.min(by1))
}

/// `liquidity · balance / total_supply`, floor
pub fn pro_rata_share(liquidity: u128, balance: u128, total_supply: u128) -> Result<u128, MathError> {
    if total_supply == 0 {
        return Err(MathError::DivisionByZero);
    }
    let share = mul(U256::from(liquidity), U256::from(balance))? / U256::from(total_supply);
    to_u128(share)
}

/// Claims owed to the protocol for invariant growth since `k_last`
///
/// Returns 0 when `k` has not grown. Tracking-disabled (`k_last == 0`) is
/// the caller's decision, not handled here.
pub fn protocol_fee_liquidity(
    total_supply: u128,
    reserve0: u128,
    reserve1: u128,
    k_last: U256,
    share: ProtocolFeeShare,
) -> Result<u128, MathError> {
    let root_k = integer_sqrt(mul(U256::from(reserve0), U256::from(reserve1))?);
    let root_k_last = integer_sqrt(k_last);
    if root_k <= root_k_last {
        return Ok(0);
    }
    let numerator = mul(U256::from(total_supply), root_k - root_k_last)?;
    let denominator = mul(root_k, U256::from(share.divisor))?
        .checked_add(root_k_last)
        .ok_or(MathError::Overflow)?;
    to_u128(numerator / denominator)
}

/// Fee-adjusted invariant check applied after every swap
///
/// `(b0·D - in0·N) · (b1·D - in1·N) >= r0 · r1 · D²`
pub fn fee_adjusted_invariant_holds(
    balance0: u128,
    balance1: u128,
    amount0_in: u128,
    amount1_in: u128,
    reserve0: u128,
    reserve1: u128,
    fee: FeeRate,
) -> Result<bool, MathError> {
    if !fee.is_valid() {
        return Err(MathError::InvalidFee);
    }
    let d = U256::from(fee.denominator);
    let n = U256::from(fee.numerator);

    // in_i <= b_i, so b_i·D - in_i·N never underflows when N < D
    let adjusted0 = mul(U256::from(balance0), d)? - mul(U256::from(amount0_in), n)?;
    let adjusted1 = mul(U256::from(balance1), d)? - mul(U256::from(amount1_in), n)?;
    let lhs = mul(adjusted0, adjusted1)?;

    let rhs = mul(mul(U256::from(reserve0), U256::from(reserve1))?, mul(d, d)?)?;
    Ok(lhs >= rhs)
}

/// Largest output the fee-adjusted invariant allows for `amount_in`
///
/// `out = in·(D-N)·r_out / (r_in·D + in·(D-N))`
pub fn get_amount_out(
    amount_in: u128,
    reserve_in: u128,
    reserve_out: u128,
    fee: FeeRate,
) -> Result<u128, MathError> {
    if amount_in == 0 {
        return Err(MathError::InsufficientInputAmount);
    }
    if reserve_in == 0 || reserve_out == 0 {
        return Err(MathError::InsufficientLiquidity);
    }
    if !fee.is_valid() {
        return Err(MathError::InvalidFee);
    }
    let in_with_fee = mul(U256::from(amount_in), U256::from(fee.denominator - fee.numerator))?;
    let numerator = mul(in_with_fee, U256::from(reserve_out))?;
    let denominator = mul(U256::from(reserve_in), U256::from(fee.denominator))?
        .checked_add(in_with_fee)
        .ok_or(MathError::Overflow)?;
    to_u128(numerator / denominator)
}

/// Smallest input that pays for `amount_out`
///
/// `in = r_in·out·D / ((r_out - out)·(D-N)) + 1`
pub fn get_amount_in(
    amount_out: u128,
    reserve_in: u128,
    reserve_out: u128,
    fee: FeeRate,
) -> Result<u128, MathError> {
    if amount_out == 0 {
        return Err(MathError::InsufficientOutputAmount);
    }
    if reserve_in == 0 || reserve_out == 0 || amount_out >= reserve_out {
        return Err(MathError::InsufficientLiquidity);
    }
    if !fee.is_valid() {
        return Err(MathError::InvalidFee);
    }
    let numerator = mul(
        mul(U256::from(reserve_in), U256::from(amount_out))?,
        U256::from(fee.denominator),
    )?;
    let denominator = mul(
        U256::from(reserve_out - amount_out),
        U256::from(fee.denominator - fee.numerator),
    )?;
    to_u128(numerator / denominator + 1)
}

/// Amount of the other asset matching `amount_a` at the current ratio
pub fn quote(amount_a: u128, reserve_a: u128, reserve_b: u128) -> Result<u128, MathError> {
    if amount_a == 0 {
        return Err(MathError::InsufficientInputAmount);
    }
    if reserve_a == 0 || reserve_b == 0 {
        return Err(MathError::InsufficientLiquidity);
    }
    to_u128(mul(U256::from(amount_a), U256::from(reserve_b))? / U256::from(reserve_a))
}


// ═══════════════════════════════════════════════════════════════
// KANI FORMAL VERIFICATION PROOFS
// ═══════════════════════════════════════════════════════════════

#[cfg(kani)]
mod kani_proofs {
    use super::*;

    /// P1: integer_sqrt returns the floor root
    #[kani::proof]
    #[kani::unwind(70)]
    fn p1_sqrt_is_floor() {
        let y: u64 = kani::any();
        let r = integer_sqrt(U256::from(y));
        let r1 = r + U256::one();
        assert!(r * r <= U256::from(y), "P1: root squared exceeds input");
        assert!(r1 * r1 > U256::from(y), "P1: root is not the floor");
    }

    /// P2: the quoted output always passes the invariant check
    #[kani::proof]
    #[kani::unwind(3)]
    fn p2_amount_out_satisfies_invariant() {
        let amount_in: u64 = kani::any();
        let r_in: u64 = kani::any();
        let r_out: u64 = kani::any();
        kani::assume(amount_in > 0 && r_in > 0 && r_out > 1);

        let fee = FeeRate::DEFAULT;
        if let Ok(out) = get_amount_out(amount_in as u128, r_in as u128, r_out as u128, fee) {
            assert!(out < r_out as u128, "P2: output drains reserve");
            let holds = fee_adjusted_invariant_holds(
                r_in as u128 + amount_in as u128,
                r_out as u128 - out,
                amount_in as u128,
                0,
                r_in as u128,
                r_out as u128,
                fee,
            );
            assert!(holds == Ok(true), "P2: quoted output breaks k");
        }
    }

    /// P3: proportional liquidity never exceeds either side's share
    #[kani::proof]
    #[kani::unwind(3)]
    fn p3_proportional_liquidity_bounded() {
        let a0: u64 = kani::any();
        let a1: u64 = kani::any();
        let r0: u64 = kani::any();
        let r1: u64 = kani::any();
        let supply: u64 = kani::any();
        kani::assume(r0 > 0 && r1 > 0);

        if let Ok(l) = proportional_liquidity(a0 as u128, a1 as u128, r0 as u128, r1 as u128, supply as u128) {
            assert!(l * r0 as u128 <= a0 as u128 * supply as u128, "P3: exceeds side 0");
            assert!(l * r1 as u128 <= a1 as u128 * supply as u128, "P3: exceeds side 1");
        }
    }
}
