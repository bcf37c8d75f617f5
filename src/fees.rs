//! Protocol fee minter
//!
//! The protocol's cut of trading fees is collected lazily: instead of
//! skimming every swap, each mint and burn compares `√k` against `√k_last`
//! and issues the recipient enough new claims to own its share of the
//! growth since the last liquidity event.

use pair_math::{protocol_fee_liquidity, ProtocolFeeShare, U256};

use crate::address::Address;
use crate::claims::ClaimLedger;
use crate::error::Result;
use crate::events::EventLog;

/// Source of the protocol fee recipient, consulted on every mint and burn
pub trait FeeRegistry {
    /// Current fee recipient, `None` when the protocol fee is off
    fn fee_to(&self) -> Option<Address>;
}

impl FeeRegistry for Option<Address> {
    fn fee_to(&self) -> Option<Address> {
        *self
    }
}

/// Registry with the protocol fee switched off
#[derive(Clone, Copy, Debug, Default)]
pub struct FeeOff;

impl FeeRegistry for FeeOff {
    fn fee_to(&self) -> Option<Address> {
        None
    }
}

/// Mint the protocol's share of invariant growth to `fee_to`
///
/// # Arguments
/// * `fee_to` - Recipient from the registry, if any
/// * `share` - Fraction of growth owed to the recipient
/// * `reserve0`, `reserve1` - Reserves before the current operation
/// * `k_last` - Product recorded after the last liquidity event; cleared
///   when the fee is off
///
/// # Returns
/// * `Ok(true)` if the fee is on, meaning the caller must record `k_last`
///   once reserves are updated
pub fn mint_fee(
    fee_to: Option<Address>,
    share: ProtocolFeeShare,
    reserve0: u128,
    reserve1: u128,
    k_last: &mut U256,
    claims: &mut ClaimLedger,
    log: &mut EventLog,
) -> Result<bool> {
    let Some(recipient) = fee_to else {
        if !k_last.is_zero() {
            *k_last = U256::zero();
        }
        return Ok(false);
    };

    if !k_last.is_zero() {
        let liquidity = protocol_fee_liquidity(claims.total_supply(), reserve0, reserve1, *k_last, share)?;
        if liquidity > 0 {
            claims.mint(&recipient, liquidity, log)?;
            log::info!("protocol fee: minted {} claims to {}", liquidity, recipient);
        }
    }
    Ok(true)
}
