//! Duopool CLI - local simulator for a two-asset constant product pair
//!
//! Keeps a pair and the asset ledger it custodies through in a JSON state
//! file, and drives every pair operation against it: liquidity, swaps,
//! flash borrows, reconciliation and TWAP readings.

use clap::{Parser, Subcommand};
use colored::Colorize;
use duopool::Address;
use std::path::PathBuf;

mod config;
mod liquidity;
mod oracle;
mod pool;
mod state;
mod trading;

use config::{CliConfig, Session};

#[derive(Parser)]
#[command(name = "duopool")]
#[command(about = "Duopool CLI - simulate a constant product pair", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: ./duopool.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Calling address (overrides `sender` in the config file)
    #[arg(short, long, global = true)]
    sender: Option<Address>,

    /// Block time in unix seconds (default: now)
    #[arg(long, global = true)]
    at: Option<u64>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new pair state
    Init {
        /// First asset
        token_a: Address,

        /// Second asset
        token_b: Address,

        /// Pair custody address (default: derived from the assets)
        #[arg(long)]
        pair: Option<Address>,

        /// Overwrite an existing state file
        #[arg(long)]
        force: bool,
    },

    /// Issue test units of an asset
    Faucet {
        /// Asset to issue
        asset: Address,

        /// Amount in base units
        amount: u128,

        /// Recipient (default: sender)
        #[arg(long)]
        to: Option<Address>,
    },

    /// Deposit both assets and mint claims
    AddLiquidity {
        /// Desired token0 amount
        amount0: u128,

        /// Desired token1 amount
        amount1: u128,

        /// Claim recipient (default: sender)
        #[arg(long)]
        to: Option<Address>,
    },

    /// Burn claims for a pro-rata share of both assets
    RemoveLiquidity {
        /// Claims to burn
        liquidity: u128,

        /// Asset recipient (default: sender)
        #[arg(long)]
        to: Option<Address>,
    },

    /// Swap an exact input amount
    Swap {
        /// Asset sent to the pair
        #[arg(long)]
        asset_in: Address,

        /// Input amount in base units
        amount_in: u128,

        /// Fail if the output would be smaller
        #[arg(long, default_value = "0")]
        min_out: u128,

        /// Output recipient (default: sender)
        #[arg(long)]
        to: Option<Address>,
    },

    /// Borrow one asset and repay it within the same swap
    Flash {
        /// Asset to borrow
        asset: Address,

        /// Amount to borrow
        amount: u128,

        /// Repayment (default: the minimum the fee allows)
        #[arg(long)]
        repay: Option<u128>,
    },

    /// Price a trade without executing it
    Quote {
        /// Asset sent to the pair
        asset_in: Address,

        /// Input amount, or the output amount with --exact-out
        amount: u128,

        /// Treat AMOUNT as the desired output
        #[arg(long)]
        exact_out: bool,
    },

    /// Force reserves to match custody balances
    Sync,

    /// Send custody balances above the reserves to a recipient
    Skim {
        /// Recipient (default: sender)
        #[arg(long)]
        to: Option<Address>,
    },

    /// Show pair state
    Show {
        /// Also show this holder's balances
        holder: Option<Address>,
    },

    /// Time-weighted average prices
    Twap {
        /// Record the current reading as an observation
        #[arg(long)]
        record: bool,
    },

    /// Set the protocol fee recipient (omit to switch the fee off)
    SetFeeTo {
        /// Recipient address
        fee_to: Option<Address>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let config = CliConfig::load(cli.config.as_deref())?;

    if cli.verbose {
        match &config.source {
            Some(path) => println!("{} {}", "Config:".bright_cyan(), path.display()),
            None => println!("{} {}", "Config:".bright_cyan(), "defaults".dimmed()),
        }
        println!("{} {}", "State:".bright_cyan(), config.state_path.display());
    }

    let session = Session::new(config, cli.sender, cli.at);

    if cli.verbose {
        println!("{} {}", "Time:".bright_cyan(), session.now);
        if let Ok(sender) = session.sender() {
            println!("{} {}", "Sender:".bright_cyan(), sender);
        }
        println!();
    }

    // Execute command
    match cli.command {
        Commands::Init { token_a, token_b, pair, force } => {
            pool::init(&session, token_a, token_b, pair, force)?;
        }
        Commands::Faucet { asset, amount, to } => {
            pool::faucet(&session, asset, amount, to)?;
        }
        Commands::AddLiquidity { amount0, amount1, to } => {
            liquidity::add_liquidity(&session, amount0, amount1, to)?;
        }
        Commands::RemoveLiquidity { liquidity, to } => {
            liquidity::remove_liquidity(&session, liquidity, to)?;
        }
        Commands::Swap { asset_in, amount_in, min_out, to } => {
            trading::swap(&session, asset_in, amount_in, min_out, to)?;
        }
        Commands::Flash { asset, amount, repay } => {
            trading::flash(&session, asset, amount, repay)?;
        }
        Commands::Quote { asset_in, amount, exact_out } => {
            trading::quote(&session, asset_in, amount, exact_out)?;
        }
        Commands::Sync => {
            pool::sync(&session)?;
        }
        Commands::Skim { to } => {
            pool::skim(&session, to)?;
        }
        Commands::Show { holder } => {
            pool::show(&session, holder)?;
        }
        Commands::Twap { record } => {
            oracle::twap(&session, record)?;
        }
        Commands::SetFeeTo { fee_to } => {
            pool::set_fee_to(&session, fee_to)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_swap_with_global_flags() {
        let token = Address::new([0x10; 32]);
        let sender = Address::new([0x01; 32]);
        let cli = Cli::try_parse_from([
            "duopool".to_string(),
            "swap".to_string(),
            "--asset-in".to_string(),
            token.to_string(),
            "1000".to_string(),
            "--min-out".to_string(),
            "900".to_string(),
            "--sender".to_string(),
            sender.to_string(),
            "--at".to_string(),
            "42".to_string(),
        ])
        .unwrap();

        assert_eq!(cli.sender, Some(sender));
        assert_eq!(cli.at, Some(42));
        match cli.command {
            Commands::Swap { asset_in, amount_in, min_out, to } => {
                assert_eq!(asset_in, token);
                assert_eq!(amount_in, 1000);
                assert_eq!(min_out, 900);
                assert_eq!(to, None);
            }
            _ => panic!("expected swap"),
        }
    }
}
