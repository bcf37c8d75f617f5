//! Pair lifecycle and reconciliation commands

use anyhow::{Context, Result};
use colored::Colorize;
use duopool::{sort_assets, Address, AssetLedger, Pair, PairEvent};

use crate::config::Session;
use crate::state::SimState;

/// Default custody address for a pair: the bytewise XOR of its assets.
/// Non-zero and distinct from both assets whenever the assets are distinct
/// and non-zero.
pub fn default_pair_address(asset_a: &Address, asset_b: &Address) -> Address {
    let mut bytes = [0u8; 32];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = asset_a.0[i] ^ asset_b.0[i];
    }
    Address::new(bytes)
}

pub fn init(session: &Session, token_a: Address, token_b: Address, pair_address: Option<Address>, force: bool) -> Result<()> {
    let path = &session.config.state_path;
    if path.exists() && !force {
        anyhow::bail!("State already exists at {} (use --force to overwrite)", path.display());
    }

    let (token0, token1) = sort_assets(token_a, token_b)?;
    let address = pair_address.unwrap_or_else(|| default_pair_address(&token0, &token1));
    let pair = Pair::new(address, token0, token1, session.config.params)?;
    let state = SimState::new(pair, session.config.fee_to);
    state.save(path)?;

    println!("{}", "=== Pair Initialized ===".bright_green().bold());
    println!("{} {}", "Pair:".bright_cyan(), address);
    println!("{} {}", "Token0:".bright_cyan(), token0);
    println!("{} {}", "Token1:".bright_cyan(), token1);
    let params = session.config.params;
    println!(
        "{} {}/{} ({:.2}%)",
        "Fee:".bright_cyan(),
        params.fee_numerator,
        params.fee_denominator,
        params.fee_numerator as f64 * 100.0 / params.fee_denominator as f64
    );
    println!("{} 1/{}", "Protocol share:".bright_cyan(), params.protocol_fee_divisor + 1);
    match state.fee_to {
        Some(to) => println!("{} {}", "Fee to:".bright_cyan(), to),
        None => println!("{} {}", "Fee to:".bright_cyan(), "off".dimmed()),
    }
    println!("{} {}", "State:".bright_cyan(), path.display());
    Ok(())
}

/// Mint test units of an asset to a holder
pub fn faucet(session: &Session, asset: Address, amount: u128, to: Option<Address>) -> Result<()> {
    let mut state = SimState::load(&session.config.state_path)?;
    let to = match to {
        Some(to) => to,
        None => session.sender()?,
    };
    if asset != state.pair.token0() && asset != state.pair.token1() {
        log::warn!("{} is not one of the pair's assets", asset);
    }
    state.ledger.issue(&asset, &to, amount)?;
    state.save(&session.config.state_path)?;

    println!(
        "{} {} of {} to {}",
        "Issued".bright_green(),
        amount,
        asset.short(),
        to
    );
    println!("{} {}", "Balance:".bright_cyan(), state.ledger.balance_of(&asset, &to));
    Ok(())
}

pub fn sync(session: &Session) -> Result<()> {
    let mut state = SimState::load(&session.config.state_path)?;
    let ctx = session.call_context()?;
    state.pair.sync(&mut state.ledger, &ctx).context("sync failed")?;

    println!("{}", "=== Sync ===".bright_green().bold());
    print_events(&state.pair.drain_events()?);
    state.save(&session.config.state_path)
}

pub fn skim(session: &Session, to: Option<Address>) -> Result<()> {
    let mut state = SimState::load(&session.config.state_path)?;
    let ctx = session.call_context()?;
    let to = to.unwrap_or(ctx.sender);
    let (token0, token1) = (state.pair.token0(), state.pair.token1());
    let before = (state.ledger.balance_of(&token0, &to), state.ledger.balance_of(&token1, &to));

    state.pair.skim(&mut state.ledger, &ctx, to).context("skim failed")?;

    println!("{}", "=== Skim ===".bright_green().bold());
    println!("{} {}", "Recipient:".bright_cyan(), to);
    println!("{} {}", "Token0:".bright_cyan(), state.ledger.balance_of(&token0, &to) - before.0);
    println!("{} {}", "Token1:".bright_cyan(), state.ledger.balance_of(&token1, &to) - before.1);
    state.save(&session.config.state_path)
}

/// Switch the protocol fee on (`Some`) or off (`None`)
pub fn set_fee_to(session: &Session, fee_to: Option<Address>) -> Result<()> {
    let mut state = SimState::load(&session.config.state_path)?;
    state.fee_to = fee_to;
    state.save(&session.config.state_path)?;

    match fee_to {
        Some(to) => println!("{} {}", "Protocol fee on, recipient:".bright_green(), to),
        None => println!("{}", "Protocol fee off".yellow()),
    }
    Ok(())
}

pub fn show(session: &Session, holder: Option<Address>) -> Result<()> {
    let state = SimState::load(&session.config.state_path)?;
    let pair = &state.pair;
    let reserves = pair.reserves();

    println!("{}", "=== Pair ===".bright_green().bold());
    println!("{} {}", "Address:".bright_cyan(), pair.address());
    println!("{} {}", "Token0:".bright_cyan(), pair.token0());
    println!("{} {}", "Token1:".bright_cyan(), pair.token1());
    println!("{} {}", "Reserve0:".bright_cyan(), reserves.reserve0);
    println!("{} {}", "Reserve1:".bright_cyan(), reserves.reserve1);
    println!(
        "{} {} ({})",
        "Last update:".bright_cyan(),
        reserves.block_timestamp_last,
        format_timestamp(reserves.block_timestamp_last as i64)
    );
    if reserves.reserve0 > 0 && reserves.reserve1 > 0 {
        let (price0, price1) = pair.spot_prices()?;
        println!("{} {:.6} token1 per token0", "Price0:".bright_cyan(), price0);
        println!("{} {:.6} token0 per token1", "Price1:".bright_cyan(), price1);
    }
    println!("{} {}", "Price0 cumulative:".bright_cyan(), pair.price0_cumulative_last());
    println!("{} {}", "Price1 cumulative:".bright_cyan(), pair.price1_cumulative_last());
    println!("{} {}", "k_last:".bright_cyan(), pair.k_last());
    println!("{} {}", "Total claims:".bright_cyan(), pair.total_supply());
    match state.fee_to {
        Some(to) => println!("{} {}", "Fee to:".bright_cyan(), to),
        None => println!("{} {}", "Fee to:".bright_cyan(), "off".dimmed()),
    }

    let custody = (
        state.ledger.balance_of(&pair.token0(), &pair.address()),
        state.ledger.balance_of(&pair.token1(), &pair.address()),
    );
    if custody != (reserves.reserve0, reserves.reserve1) {
        println!(
            "{} custody ({}, {}) differs from reserves; run sync or skim",
            "!".yellow().bold(),
            custody.0,
            custody.1
        );
    }

    println!("\n{}", "Claim holders:".bright_cyan());
    for (who, amount) in pair.claims().holders() {
        let tag = if who.is_zero() { " (locked)".dimmed().to_string() } else { String::new() };
        println!("  {} {}{}", who, amount, tag);
    }

    if let Some(holder) = holder {
        println!("\n{} {}", "Holder:".bright_cyan(), holder);
        println!("  token0 {}", state.ledger.balance_of(&pair.token0(), &holder));
        println!("  token1 {}", state.ledger.balance_of(&pair.token1(), &holder));
        println!("  claims {}", pair.balance_of(&holder));
    }
    Ok(())
}

pub fn format_timestamp(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "invalid".to_string())
}

pub fn print_events(events: &[PairEvent]) {
    for event in events {
        let line = match event {
            PairEvent::Transfer { from, to, amount } => {
                format!("Transfer {} -> {}: {}", from.short(), to.short(), amount)
            }
            PairEvent::Mint { sender, amount0, amount1 } => {
                format!("Mint by {}: {} / {}", sender.short(), amount0, amount1)
            }
            PairEvent::Burn { sender, amount0, amount1, to } => {
                format!("Burn by {}: {} / {} to {}", sender.short(), amount0, amount1, to.short())
            }
            PairEvent::Swap { sender, amount0_in, amount1_in, amount0_out, amount1_out, to } => format!(
                "Swap by {}: in {} / {}, out {} / {} to {}",
                sender.short(),
                amount0_in,
                amount1_in,
                amount0_out,
                amount1_out,
                to.short()
            ),
            PairEvent::Sync { reserve0, reserve1 } => format!("Sync: {} / {}", reserve0, reserve1),
        };
        println!("  {} {}", "•".bright_blue(), line);
    }
}
