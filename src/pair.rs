//! Constant product pair engine
//!
//! The pair custodies two assets through an [`AssetLedger`], issues claims
//! against them and trades one for the other under the fee-adjusted
//! `x·y=k` invariant. Callers push assets to [`Pair::address`] first and
//! then call `mint` or `swap`; the pair infers what arrived by diffing
//! custody balances against its reserves.
//!
//! Every mutating operation is atomic. It runs under the reentrancy guard
//! against a checkpoint of pair state, event log and asset ledger, and any
//! error restores all three before it is returned.

use pair_math::{
    fee_adjusted_invariant_holds, initial_liquidity, pro_rata_share, proportional_liquidity,
    U256, MINIMUM_LIQUIDITY,
};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::claims::ClaimLedger;
use crate::custody::AssetLedger;
use crate::error::{PairError, Result};
use crate::events::{EventLog, PairEvent};
use crate::fees::{mint_fee, FeeRegistry};
use crate::guard::ReentrancyGuard;
use crate::oracle::{spot_prices, Observation, PriceAccumulator};
use crate::params::PairParams;
use crate::reserves::{block_timestamp, ReserveLedger, Reserves};

// ============================================================================
// Call Context
// ============================================================================

/// Who is calling and when
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    pub sender: Address,
    /// Unix seconds; stored truncated to 32 bits
    pub timestamp: u64,
}

impl CallContext {
    pub fn new(sender: Address, timestamp: u64) -> Self {
        Self { sender, timestamp }
    }
}

// ============================================================================
// Flash Swap Callback
// ============================================================================

/// Arguments handed to the swap callee after outputs were sent
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlashSwap<'a> {
    pub sender: Address,
    pub amount0_out: u128,
    pub amount1_out: u128,
    pub to: Address,
    pub data: &'a [u8],
}

/// Trait for flash swap receivers
///
/// Invoked by `Pair::swap` when the call carries non-empty data, after the
/// requested outputs have been transferred and before the invariant is
/// checked. The callee repays by transferring input to `pair.address()`
/// through `ledger`.
pub trait SwapCallee<L: AssetLedger> {
    /// Handle a flash swap
    ///
    /// # Arguments
    /// * `pair` - The pair, still locked: any mutating call fails with `Reentrancy`
    /// * `ledger` - Asset ledger the outputs were paid through
    /// * `call` - Output amounts and the caller's data
    ///
    /// # Returns
    /// * `Err(PairError)` aborts the swap and rolls it back
    fn on_swap(&mut self, pair: &mut Pair, ledger: &mut L, call: &FlashSwap<'_>) -> Result<()>;
}

/// Callee for plain swaps (never invoked when `data` is empty)
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCallback;

impl<L: AssetLedger> SwapCallee<L> for NoCallback {
    fn on_swap(&mut self, _pair: &mut Pair, _ledger: &mut L, _call: &FlashSwap<'_>) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Pair State
// ============================================================================

/// Everything a failed operation must restore
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairState {
    token0: Address,
    token1: Address,
    params: PairParams,
    reserves: ReserveLedger,
    oracle: PriceAccumulator,
    #[serde(with = "crate::serde_u256")]
    k_last: U256,
    claims: ClaimLedger,
}

/// A two-asset constant product pair
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pair {
    address: Address,
    state: PairState,
    #[serde(default)]
    log: EventLog,
    #[serde(skip)]
    guard: ReentrancyGuard,
}

/// Canonical ordering of two distinct, non-zero assets
pub fn sort_assets(asset_a: Address, asset_b: Address) -> Result<(Address, Address)> {
    if asset_a == asset_b {
        return Err(PairError::IdenticalAssets);
    }
    let (token0, token1) = if asset_a < asset_b { (asset_a, asset_b) } else { (asset_b, asset_a) };
    if token0.is_zero() {
        return Err(PairError::ZeroAddress);
    }
    Ok((token0, token1))
}

impl Pair {
    /// Create an empty pair custodying `asset_a` and `asset_b` at `address`
    pub fn new(address: Address, asset_a: Address, asset_b: Address, params: PairParams) -> Result<Self> {
        let (token0, token1) = sort_assets(asset_a, asset_b)?;
        if address.is_zero() {
            return Err(PairError::ZeroAddress);
        }
        if address == token0 || address == token1 {
            return Err(PairError::InvalidPairAddress);
        }
        params.validate()?;

        log::debug!("pair {} created for {} / {}", address, token0, token1);
        Ok(Self {
            address,
            state: PairState {
                token0,
                token1,
                params,
                reserves: ReserveLedger::default(),
                oracle: PriceAccumulator::default(),
                k_last: U256::zero(),
                claims: ClaimLedger::new(),
            },
            log: EventLog::new(),
            guard: ReentrancyGuard::new(),
        })
    }

    // ========================================
    // Accessors
    // ========================================

    /// Custody address assets and claims are pushed to
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn token0(&self) -> Address {
        self.state.token0
    }

    pub fn token1(&self) -> Address {
        self.state.token1
    }

    pub fn params(&self) -> &PairParams {
        &self.state.params
    }

    pub fn reserves(&self) -> Reserves {
        self.state.reserves.reserves()
    }

    pub fn price0_cumulative_last(&self) -> U256 {
        self.state.oracle.price0_cumulative_last
    }

    pub fn price1_cumulative_last(&self) -> U256 {
        self.state.oracle.price1_cumulative_last
    }

    pub fn k_last(&self) -> U256 {
        self.state.k_last
    }

    pub fn total_supply(&self) -> u128 {
        self.state.claims.total_supply()
    }

    pub fn balance_of(&self, holder: &Address) -> u128 {
        self.state.claims.balance_of(holder)
    }

    pub fn claims(&self) -> &ClaimLedger {
        &self.state.claims
    }

    pub fn is_locked(&self) -> bool {
        self.guard.is_locked()
    }

    pub fn events(&self) -> &[PairEvent] {
        self.log.as_slice()
    }

    /// Take every event raised so far. Fails with `Reentrancy` while an
    /// operation holds the lock, so a flash callee cannot consume events
    /// that a rollback would have to restore.
    pub fn drain_events(&mut self) -> Result<Vec<PairEvent>> {
        if self.guard.is_locked() {
            return Err(PairError::Reentrancy);
        }
        Ok(self.log.drain())
    }

    /// Cumulative prices as a `sync` at `now` would leave them, without
    /// mutating anything
    pub fn current_cumulative_prices(&self, now: u64) -> Result<Observation> {
        let timestamp = block_timestamp(now);
        let reserves = self.reserves();
        let mut oracle = self.state.oracle;
        let elapsed = timestamp.wrapping_sub(reserves.block_timestamp_last);
        if elapsed > 0 && reserves.reserve0 != 0 && reserves.reserve1 != 0 {
            oracle.accumulate(reserves.reserve0, reserves.reserve1, elapsed)?;
        }
        Ok(Observation {
            timestamp,
            price0_cumulative: oracle.price0_cumulative_last,
            price1_cumulative: oracle.price1_cumulative_last,
        })
    }

    /// Spot prices `(reserve1 / reserve0, reserve0 / reserve1)` as floats
    pub fn spot_prices(&self) -> Result<(f64, f64)> {
        let reserves = self.reserves();
        let (price0, price1) = spot_prices(reserves.reserve0, reserves.reserve1)?;
        Ok((price0.to_f64(), price1.to_f64()))
    }

    // ========================================
    // Atomicity
    // ========================================

    /// Run `op` under the guard; restore pair state and events on error
    fn locked<T, F>(&mut self, name: &str, op: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        self.guard.acquire()?;
        let mut scope = LockScope {
            snapshot: Some(self.state.clone()),
            mark: self.log.len(),
            pair: self,
        };

        let result = op(&mut *scope.pair);
        match &result {
            Ok(_) => scope.commit(),
            Err(err) => log::warn!("{} on pair {} rolled back: {}", name, scope.pair.address, err),
        }
        result
    }

    /// `locked`, plus a ledger checkpoint so transfers made by `op` (and
    /// by a flash callee) are undone too
    fn transact<L, T, F>(&mut self, ledger: &mut L, name: &str, op: F) -> Result<T>
    where
        L: AssetLedger,
        F: FnOnce(&mut Self, &mut L) -> Result<T>,
    {
        if self.guard.is_locked() {
            return Err(PairError::Reentrancy);
        }
        let mut scope = LedgerScope {
            checkpoint: Some(ledger.checkpoint()),
            ledger,
        };
        let result = self.locked(name, |pair| op(pair, &mut *scope.ledger));
        if result.is_ok() {
            scope.commit();
        }
        result
    }

    // ========================================
    // Internal Helpers
    // ========================================

    fn custody_balances<L: AssetLedger>(&self, ledger: &L) -> (u128, u128) {
        (
            ledger.balance_of(&self.state.token0, &self.address),
            ledger.balance_of(&self.state.token1, &self.address),
        )
    }

    fn pay<L: AssetLedger>(&self, ledger: &mut L, asset: Address, to: &Address, amount: u128) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        ledger.transfer(&asset, &self.address, to, amount).map_err(|err| {
            log::debug!("transfer out of pair {} failed: {}", self.address, err);
            PairError::TransferFailed
        })
    }

    fn update(&mut self, balance0: u128, balance1: u128, timestamp: u64) -> Result<()> {
        let PairState { reserves, oracle, .. } = &mut self.state;
        reserves.update(oracle, balance0, balance1, timestamp, &mut self.log)
    }

    fn mint_fee<R: FeeRegistry + ?Sized>(&mut self, registry: &R, reserve0: u128, reserve1: u128) -> Result<bool> {
        let share = self.state.params.protocol_fee();
        let PairState { k_last, claims, .. } = &mut self.state;
        mint_fee(registry.fee_to(), share, reserve0, reserve1, k_last, claims, &mut self.log)
    }

    fn record_k_last(&mut self) -> Result<()> {
        let reserves = self.reserves();
        self.state.k_last = U256::from(reserves.reserve0)
            .checked_mul(U256::from(reserves.reserve1))
            .ok_or(PairError::Overflow)?;
        Ok(())
    }

    // ========================================
    // Liquidity
    // ========================================

    /// Issue claims for the assets pushed to the pair since the last update
    ///
    /// # Arguments
    /// * `ledger` - Asset ledger holding the pair's custody
    /// * `registry` - Source of the protocol fee recipient
    /// * `ctx` - Caller and block time
    /// * `to` - Recipient of the new claims
    ///
    /// # Returns
    /// * Claims minted to `to`
    pub fn mint<L, R>(&mut self, ledger: &mut L, registry: &R, ctx: &CallContext, to: Address) -> Result<u128>
    where
        L: AssetLedger,
        R: FeeRegistry + ?Sized,
    {
        self.transact(ledger, "mint", |pair, ledger| {
            let reserves = pair.reserves();
            let (balance0, balance1) = pair.custody_balances(ledger);
            let amount0 = balance0.checked_sub(reserves.reserve0).ok_or(PairError::Overflow)?;
            let amount1 = balance1.checked_sub(reserves.reserve1).ok_or(PairError::Overflow)?;

            let fee_on = pair.mint_fee(registry, reserves.reserve0, reserves.reserve1)?;
            let total_supply = pair.total_supply();
            let liquidity = if total_supply == 0 {
                let liquidity = initial_liquidity(amount0, amount1, MINIMUM_LIQUIDITY)?;
                if liquidity == 0 {
                    return Err(PairError::InsufficientLiquidityMinted);
                }
                pair.state.claims.mint(&Address::ZERO, MINIMUM_LIQUIDITY, &mut pair.log)?;
                log::info!(
                    "pair {} bootstrapped: {} claims locked, {} to {}",
                    pair.address,
                    MINIMUM_LIQUIDITY,
                    liquidity,
                    to
                );
                liquidity
            } else {
                proportional_liquidity(amount0, amount1, reserves.reserve0, reserves.reserve1, total_supply)?
            };
            if liquidity == 0 {
                return Err(PairError::InsufficientLiquidityMinted);
            }
            pair.state.claims.mint(&to, liquidity, &mut pair.log)?;

            pair.update(balance0, balance1, ctx.timestamp)?;
            if fee_on {
                pair.record_k_last()?;
            }
            pair.log.emit(PairEvent::Mint {
                sender: ctx.sender,
                amount0,
                amount1,
            });
            log::debug!("mint: {} + {} -> {} claims for {}", amount0, amount1, liquidity, to);
            Ok(liquidity)
        })
    }

    /// Redeem the claims held by the pair itself for a pro-rata share of
    /// both custody balances
    ///
    /// # Returns
    /// * `(amount0, amount1)` sent to `to`
    pub fn burn<L, R>(
        &mut self,
        ledger: &mut L,
        registry: &R,
        ctx: &CallContext,
        to: Address,
    ) -> Result<(u128, u128)>
    where
        L: AssetLedger,
        R: FeeRegistry + ?Sized,
    {
        self.transact(ledger, "burn", |pair, ledger| {
            let reserves = pair.reserves();
            let (token0, token1) = (pair.token0(), pair.token1());
            let (balance0, balance1) = pair.custody_balances(ledger);
            let liquidity = pair.balance_of(&pair.address);

            let fee_on = pair.mint_fee(registry, reserves.reserve0, reserves.reserve1)?;
            // Fee claims count toward the supply being divided
            let total_supply = pair.total_supply();
            if liquidity == 0 || total_supply == 0 {
                return Err(PairError::InsufficientLiquidityBurned);
            }
            let amount0 = pro_rata_share(liquidity, balance0, total_supply)?;
            let amount1 = pro_rata_share(liquidity, balance1, total_supply)?;
            if amount0 == 0 || amount1 == 0 {
                return Err(PairError::InsufficientLiquidityBurned);
            }

            let own = pair.address;
            pair.state.claims.burn(&own, liquidity, &mut pair.log)?;
            pair.pay(ledger, token0, &to, amount0)?;
            pair.pay(ledger, token1, &to, amount1)?;

            let (balance0, balance1) = pair.custody_balances(ledger);
            pair.update(balance0, balance1, ctx.timestamp)?;
            if fee_on {
                pair.record_k_last()?;
            }
            pair.log.emit(PairEvent::Burn {
                sender: ctx.sender,
                amount0,
                amount1,
                to,
            });
            log::debug!("burn: {} claims -> {} + {} to {}", liquidity, amount0, amount1, to);
            Ok((amount0, amount1))
        })
    }

    // ========================================
    // Trading
    // ========================================

    /// Send the requested outputs to `to`, optionally call back into
    /// `callee`, then require the fee-adjusted invariant to hold on the
    /// resulting custody balances
    ///
    /// # Arguments
    /// * `amount0_out`, `amount1_out` - Requested outputs; at least one non-zero
    /// * `to` - Output recipient, never one of the pair's assets
    /// * `data` - Non-empty data turns this into a flash swap
    /// * `callee` - Invoked with `data` before the invariant check
    #[allow(clippy::too_many_arguments)]
    pub fn swap<L, C>(
        &mut self,
        ledger: &mut L,
        ctx: &CallContext,
        amount0_out: u128,
        amount1_out: u128,
        to: Address,
        data: &[u8],
        callee: &mut C,
    ) -> Result<()>
    where
        L: AssetLedger,
        C: SwapCallee<L> + ?Sized,
    {
        self.transact(ledger, "swap", |pair, ledger| {
            if amount0_out == 0 && amount1_out == 0 {
                return Err(PairError::InsufficientOutputAmount);
            }
            let reserves = pair.reserves();
            if amount0_out >= reserves.reserve0 || amount1_out >= reserves.reserve1 {
                return Err(PairError::InsufficientLiquidity);
            }
            let (token0, token1) = (pair.token0(), pair.token1());
            if to == token0 || to == token1 {
                return Err(PairError::InvalidRecipient);
            }

            // Optimistic transfer, validated below
            pair.pay(ledger, token0, &to, amount0_out)?;
            pair.pay(ledger, token1, &to, amount1_out)?;
            if !data.is_empty() {
                let call = FlashSwap {
                    sender: ctx.sender,
                    amount0_out,
                    amount1_out,
                    to,
                    data,
                };
                callee.on_swap(pair, ledger, &call)?;
            }

            let (balance0, balance1) = pair.custody_balances(ledger);
            // Outputs are below reserves, so these never underflow
            let amount0_in = balance0.saturating_sub(reserves.reserve0 - amount0_out);
            let amount1_in = balance1.saturating_sub(reserves.reserve1 - amount1_out);
            if amount0_in == 0 && amount1_in == 0 {
                return Err(PairError::InsufficientInputAmount);
            }

            let holds = fee_adjusted_invariant_holds(
                balance0,
                balance1,
                amount0_in,
                amount1_in,
                reserves.reserve0,
                reserves.reserve1,
                pair.state.params.fee(),
            )?;
            if !holds {
                return Err(PairError::InvariantViolation);
            }

            pair.update(balance0, balance1, ctx.timestamp)?;
            pair.log.emit(PairEvent::Swap {
                sender: ctx.sender,
                amount0_in,
                amount1_in,
                amount0_out,
                amount1_out,
                to,
            });
            log::debug!(
                "swap: in ({}, {}) out ({}, {}) to {}",
                amount0_in,
                amount1_in,
                amount0_out,
                amount1_out,
                to
            );
            Ok(())
        })
    }

    // ========================================
    // Reconciliation
    // ========================================

    /// Send any custody balance above the reserves to `to`
    pub fn skim<L: AssetLedger>(&mut self, ledger: &mut L, ctx: &CallContext, to: Address) -> Result<()> {
        self.transact(ledger, "skim", |pair, ledger| {
            let reserves = pair.reserves();
            let (balance0, balance1) = pair.custody_balances(ledger);
            let excess0 = balance0.checked_sub(reserves.reserve0).ok_or(PairError::Overflow)?;
            let excess1 = balance1.checked_sub(reserves.reserve1).ok_or(PairError::Overflow)?;
            pair.pay(ledger, pair.token0(), &to, excess0)?;
            pair.pay(ledger, pair.token1(), &to, excess1)?;
            log::debug!("skim by {}: {} + {} to {}", ctx.sender, excess0, excess1, to);
            Ok(())
        })
    }

    /// Force reserves to match custody balances
    pub fn sync<L: AssetLedger>(&mut self, ledger: &mut L, ctx: &CallContext) -> Result<()> {
        self.transact(ledger, "sync", |pair, ledger| {
            let (balance0, balance1) = pair.custody_balances(ledger);
            pair.update(balance0, balance1, ctx.timestamp)?;
            log::debug!("sync: reserves ({}, {})", balance0, balance1);
            Ok(())
        })
    }

    // ========================================
    // Claims
    // ========================================

    /// Move claims from `ctx.sender` to `to`. Burning is a transfer to
    /// `address()` followed by `burn`.
    pub fn transfer(&mut self, ctx: &CallContext, to: Address, amount: u128) -> Result<()> {
        self.locked("transfer", |pair| {
            pair.state.claims.transfer(&ctx.sender, &to, amount, &mut pair.log)?;
            log::debug!("claims: {} from {} to {}", amount, ctx.sender, to);
            Ok(())
        })
    }
}

// ============================================================================
// Rollback Scopes
// ============================================================================

/// Holds the pair's lock for one operation. Dropping it uncommitted (an
/// error, or a panic unwinding out of a callee) restores the snapshot and
/// truncates the events; the lock is released either way.
struct LockScope<'a> {
    pair: &'a mut Pair,
    snapshot: Option<PairState>,
    mark: usize,
}

impl LockScope<'_> {
    fn commit(&mut self) {
        self.snapshot = None;
    }
}

impl Drop for LockScope<'_> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.pair.state = snapshot;
            self.pair.log.truncate(self.mark);
        }
        self.pair.guard.release();
    }
}

/// Reverts the asset ledger to its checkpoint unless committed
struct LedgerScope<'a, L: AssetLedger> {
    ledger: &'a mut L,
    checkpoint: Option<L::Checkpoint>,
}

impl<L: AssetLedger> LedgerScope<'_, L> {
    fn commit(&mut self) {
        self.checkpoint = None;
    }
}

impl<L: AssetLedger> Drop for LedgerScope<'_, L> {
    fn drop(&mut self) {
        if let Some(checkpoint) = self.checkpoint.take() {
            self.ledger.revert(checkpoint);
        }
    }
}
