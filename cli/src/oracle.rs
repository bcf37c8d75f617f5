//! Time-weighted average prices from recorded observations

use anyhow::{Context, Result};
use colored::Colorize;
use duopool::{average_prices, AveragePrices, Observation};

use crate::config::Session;
use crate::pool::format_timestamp;
use crate::state::SimState;

/// Print the counterfactual cumulative prices at the session time and the
/// average over every recorded window ending now. With `record`, the
/// reading is appended to the state's observations.
pub fn twap(session: &Session, record: bool) -> Result<()> {
    let mut state = SimState::load(&session.config.state_path)?;
    let now = state
        .pair
        .current_cumulative_prices(session.now)
        .context("Failed to read cumulative prices")?;

    println!("{}", "=== TWAP ===".bright_green().bold());
    println!(
        "{} {} ({})",
        "Observed at:".bright_cyan(),
        now.timestamp,
        format_timestamp(session.now as i64)
    );
    println!("{} {}", "Price0 cumulative:".bright_cyan(), now.price0_cumulative);
    println!("{} {}", "Price1 cumulative:".bright_cyan(), now.price1_cumulative);

    if state.observations.is_empty() {
        println!("\n{}", "No recorded observations (use --record)".dimmed());
    }
    for older in &state.observations {
        match average_prices(older, &now) {
            Ok(avg) => print_window(older, &avg),
            Err(e) => log::debug!("skipping observation at {}: {}", older.timestamp, e),
        }
    }

    if record {
        if state.observations.last().map(|o| o.timestamp) == Some(now.timestamp) {
            println!("\n{}", "Observation at this timestamp already recorded".yellow());
            return Ok(());
        }
        state.observations.push(now);
        state.save(&session.config.state_path)?;
        println!(
            "\n{} ({} total)",
            "Observation recorded".bright_green(),
            state.observations.len()
        );
    }
    Ok(())
}

fn print_window(older: &Observation, avg: &AveragePrices) {
    println!(
        "\n{} {}s since {}",
        "Window:".bright_cyan(),
        avg.elapsed,
        older.timestamp
    );
    println!("  price0 {:.6} ({})", avg.price0.to_f64(), avg.price0.0);
    println!("  price1 {:.6} ({})", avg.price1.to_f64(), avg.price1.0);
}
