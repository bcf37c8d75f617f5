//! Liquidity provider operations
//!
//! Each command deposits into (or pulls claims back to) the pair and calls
//! the core in the same invocation. State is only written on success, so a
//! failed command leaves the file as it was.

use anyhow::{Context, Result};
use colored::Colorize;
use duopool::{Address, AssetLedger, PairError};
use pair_math::math::quote;

use crate::config::Session;
use crate::pool::print_events;
use crate::state::SimState;

/// Amounts actually deposited for a desired pair of amounts: the full
/// desired amounts into an empty pair, otherwise the largest pair at the
/// current ratio that fits inside both.
pub fn optimal_deposit(desired0: u128, desired1: u128, reserve0: u128, reserve1: u128) -> Result<(u128, u128)> {
    if reserve0 == 0 && reserve1 == 0 {
        return Ok((desired0, desired1));
    }
    let matched1 = quote(desired0, reserve0, reserve1).map_err(PairError::from)?;
    if matched1 <= desired1 {
        return Ok((desired0, matched1));
    }
    let matched0 = quote(desired1, reserve1, reserve0).map_err(PairError::from)?;
    Ok((matched0, desired1))
}

pub fn add_liquidity(session: &Session, amount0: u128, amount1: u128, to: Option<Address>) -> Result<()> {
    let mut state = SimState::load(&session.config.state_path)?;
    let ctx = session.call_context()?;
    let to = to.unwrap_or(ctx.sender);
    let (token0, token1, pair_address) = (state.pair.token0(), state.pair.token1(), state.pair.address());

    let reserves = state.pair.reserves();
    let (deposit0, deposit1) = optimal_deposit(amount0, amount1, reserves.reserve0, reserves.reserve1)?;
    log::debug!("deposit {} / {} for desired {} / {}", deposit0, deposit1, amount0, amount1);

    state
        .ledger
        .transfer(&token0, &ctx.sender, &pair_address, deposit0)
        .context("Failed to deposit token0")?;
    state
        .ledger
        .transfer(&token1, &ctx.sender, &pair_address, deposit1)
        .context("Failed to deposit token1")?;

    let registry = state.fee_to;
    let liquidity = state
        .pair
        .mint(&mut state.ledger, &registry, &ctx, to)
        .context("mint failed")?;

    println!("{}", "=== Add Liquidity ===".bright_green().bold());
    println!("{} {}", "Deposited token0:".bright_cyan(), deposit0);
    println!("{} {}", "Deposited token1:".bright_cyan(), deposit1);
    println!("{} {} to {}", "Claims minted:".bright_cyan(), liquidity, to);
    print_events(&state.pair.drain_events()?);
    state.save(&session.config.state_path)
}

pub fn remove_liquidity(session: &Session, liquidity: u128, to: Option<Address>) -> Result<()> {
    let mut state = SimState::load(&session.config.state_path)?;
    let ctx = session.call_context()?;
    let to = to.unwrap_or(ctx.sender);

    let held = state.pair.balance_of(&ctx.sender);
    if liquidity > held {
        anyhow::bail!("{} holds {} claims, cannot remove {}", ctx.sender, held, liquidity);
    }

    let pair_address = state.pair.address();
    state
        .pair
        .transfer(&ctx, pair_address, liquidity)
        .context("Failed to return claims to the pair")?;
    let registry = state.fee_to;
    let (amount0, amount1) = state
        .pair
        .burn(&mut state.ledger, &registry, &ctx, to)
        .context("burn failed")?;

    println!("{}", "=== Remove Liquidity ===".bright_green().bold());
    println!("{} {}", "Claims burned:".bright_cyan(), liquidity);
    println!("{} {} to {}", "Token0 out:".bright_cyan(), amount0, to);
    println!("{} {} to {}", "Token1 out:".bright_cyan(), amount1, to);
    print_events(&state.pair.drain_events()?);
    state.save(&session.config.state_path)
}
