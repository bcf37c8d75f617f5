//! Trading operations

use anyhow::{Context, Result};
use colored::Colorize;
use duopool::{Address, AssetLedger, FeeRate, FlashSwap, NoCallback, Pair, PairError, SwapCallee};
use pair_math::math::{get_amount_in, get_amount_out};

use crate::config::Session;
use crate::pool::print_events;
use crate::state::SimState;

/// Direction of a trade relative to the pair's ordering
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    /// token0 in, token1 out
    ZeroForOne,
    /// token1 in, token0 out
    OneForZero,
}

fn side_of(pair: &Pair, asset_in: &Address) -> Result<Side> {
    if *asset_in == pair.token0() {
        Ok(Side::ZeroForOne)
    } else if *asset_in == pair.token1() {
        Ok(Side::OneForZero)
    } else {
        anyhow::bail!("{} is not traded by this pair ({} / {})", asset_in, pair.token0(), pair.token1())
    }
}

/// Swap an exact input for as much output as the pair allows
pub fn swap(
    session: &Session,
    asset_in: Address,
    amount_in: u128,
    min_out: u128,
    to: Option<Address>,
) -> Result<()> {
    let mut state = SimState::load(&session.config.state_path)?;
    let ctx = session.call_context()?;
    let to = to.unwrap_or(ctx.sender);
    let side = side_of(&state.pair, &asset_in)?;

    let reserves = state.pair.reserves();
    let fee = state.pair.params().fee();
    let (reserve_in, reserve_out) = match side {
        Side::ZeroForOne => (reserves.reserve0, reserves.reserve1),
        Side::OneForZero => (reserves.reserve1, reserves.reserve0),
    };
    let amount_out = get_amount_out(amount_in, reserve_in, reserve_out, fee).map_err(PairError::from)?;
    if amount_out < min_out {
        anyhow::bail!("Slippage: would receive {}, minimum is {}", amount_out, min_out);
    }

    let pair_address = state.pair.address();
    state
        .ledger
        .transfer(&asset_in, &ctx.sender, &pair_address, amount_in)
        .context("Failed to send input to the pair")?;

    let (amount0_out, amount1_out) = match side {
        Side::ZeroForOne => (0, amount_out),
        Side::OneForZero => (amount_out, 0),
    };
    state
        .pair
        .swap(&mut state.ledger, &ctx, amount0_out, amount1_out, to, &[], &mut NoCallback)
        .context("swap failed")?;

    println!("{}", "=== Swap ===".bright_green().bold());
    println!("{} {} of {}", "In:".bright_cyan(), amount_in, asset_in.short());
    println!("{} {} to {}", "Out:".bright_cyan(), amount_out, to);
    print_events(&state.pair.drain_events()?);
    state.save(&session.config.state_path)
}

/// Price a trade against the current reserves without executing it
pub fn quote(session: &Session, asset_in: Address, amount: u128, exact_out: bool) -> Result<()> {
    let state = SimState::load(&session.config.state_path)?;
    let side = side_of(&state.pair, &asset_in)?;
    let reserves = state.pair.reserves();
    let fee = state.pair.params().fee();
    let (reserve_in, reserve_out) = match side {
        Side::ZeroForOne => (reserves.reserve0, reserves.reserve1),
        Side::OneForZero => (reserves.reserve1, reserves.reserve0),
    };

    println!("{}", "=== Quote ===".bright_green().bold());
    if exact_out {
        let amount_in = get_amount_in(amount, reserve_in, reserve_out, fee).map_err(PairError::from)?;
        println!("{} {}", "Output:".bright_cyan(), amount);
        println!("{} {} of {}", "Required input:".bright_cyan(), amount_in, asset_in.short());
    } else {
        let amount_out = get_amount_out(amount, reserve_in, reserve_out, fee).map_err(PairError::from)?;
        println!("{} {} of {}", "Input:".bright_cyan(), amount, asset_in.short());
        println!("{} {}", "Output:".bright_cyan(), amount_out);
        if amount_out > 0 {
            println!(
                "{} {:.6}",
                "Execution price:".bright_cyan(),
                amount_out as f64 / amount as f64
            );
        }
    }
    Ok(())
}

// ============================================================================
// Flash Borrow
// ============================================================================

/// Smallest same-asset repayment that covers borrowing `amount_out`:
/// `ceil(out·D / (D-N))`
pub fn flash_repayment(amount_out: u128, fee: FeeRate) -> Result<u128> {
    let denominator = u128::from(fee.denominator);
    let kept = denominator
        .checked_sub(u128::from(fee.numerator))
        .filter(|k| *k > 0)
        .ok_or(PairError::InvalidParams)?;
    let scaled = amount_out.checked_mul(denominator).ok_or(PairError::Overflow)?;
    Ok(scaled.div_ceil(kept))
}

/// Repays a flash borrow in the borrowed asset from the borrower's balance
struct Repay {
    asset: Address,
    from: Address,
    amount: u128,
}

impl<L: AssetLedger> SwapCallee<L> for Repay {
    fn on_swap(&mut self, pair: &mut Pair, ledger: &mut L, call: &FlashSwap<'_>) -> duopool::Result<()> {
        log::debug!(
            "flash callback: out {} / {}, repaying {} of {}",
            call.amount0_out,
            call.amount1_out,
            self.amount,
            self.asset
        );
        ledger
            .transfer(&self.asset, &self.from, &pair.address(), self.amount)
            .map_err(|e| {
                log::debug!("flash repayment failed: {}", e);
                PairError::TransferFailed
            })
    }
}

/// Borrow `amount` of `asset` and repay it (plus fee, or `repay` if given)
/// within the same swap
pub fn flash(session: &Session, asset: Address, amount: u128, repay: Option<u128>) -> Result<()> {
    let mut state = SimState::load(&session.config.state_path)?;
    let ctx = session.call_context()?;
    let side = side_of(&state.pair, &asset)?;

    let repay = match repay {
        Some(r) => r,
        None => flash_repayment(amount, state.pair.params().fee())?,
    };
    let (amount0_out, amount1_out) = match side {
        Side::ZeroForOne => (amount, 0),
        Side::OneForZero => (0, amount),
    };
    let mut callee = Repay {
        asset,
        from: ctx.sender,
        amount: repay,
    };
    state
        .pair
        .swap(&mut state.ledger, &ctx, amount0_out, amount1_out, ctx.sender, b"flash", &mut callee)
        .context("flash swap failed")?;

    println!("{}", "=== Flash Borrow ===".bright_green().bold());
    println!("{} {} of {}", "Borrowed:".bright_cyan(), amount, asset.short());
    println!("{} {}", "Repaid:".bright_cyan(), repay);
    println!("{} {}", "Fee paid:".bright_cyan(), repay.saturating_sub(amount));
    print_events(&state.pair.drain_events()?);
    state.save(&session.config.state_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_repayment_rounds_up() {
        // 1000 * 10000 / 9981 = 1001.90...
        assert_eq!(flash_repayment(1_000, FeeRate::DEFAULT).unwrap(), 1_002);
        assert_eq!(flash_repayment(9_981, FeeRate::DEFAULT).unwrap(), 10_000);
        assert_eq!(flash_repayment(0, FeeRate::DEFAULT).unwrap(), 0);
    }

    #[test]
    fn test_flash_repayment_satisfies_invariant() {
        let fee = FeeRate::DEFAULT;
        let (n, d) = (u128::from(fee.numerator), u128::from(fee.denominator));
        for out in [1u128, 7, 1_000, 123_456_789, 10u128.pow(24)] {
            let repay = flash_repayment(out, fee).unwrap();
            // Same-asset flash: adjusted balance (r - out + repay)·D - repay·N >= r·D
            assert!(repay * (d - n) >= out * d, "out {}", out);
            assert!((repay - 1) * (d - n) < out * d, "not minimal for {}", out);
        }
    }
}
