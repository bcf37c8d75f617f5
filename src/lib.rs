//! Two-asset constant product pair
//!
//! A pair holds custody of two fungible assets, issues liquidity claims
//! against them and swaps one for the other while the fee-adjusted product
//! of its reserves never decreases. Alongside the trading core it keeps a
//! time-weighted price accumulator and mints the protocol's share of fee
//! growth to a configurable recipient.
//!
//! Guarantees:
//! 1. Every operation is atomic: a failure leaves pair state, events and the
//!    asset ledger exactly as they were
//! 2. No operation can re-enter another, including from a flash swap callee
//! 3. The first 1000 claims are locked with the sink forever
//! 4. Reserves never exceed 112 bits
//!
//! All arithmetic lives in the `pair_math` crate; this crate is the state
//! machine around it.

#![forbid(unsafe_code)]

pub mod address;
pub mod claims;
pub mod custody;
pub mod error;
pub mod events;
pub mod fees;
pub mod guard;
pub mod oracle;
pub mod pair;
pub mod params;
pub mod reserves;
mod serde_u256;

pub use address::{Address, AddressParseError};
pub use claims::ClaimLedger;
pub use custody::{AssetLedger, LedgerError, MemoryLedger};
pub use error::{PairError, Result};
pub use events::{EventLog, PairEvent};
pub use fees::{FeeOff, FeeRegistry};
pub use oracle::{average_prices, AveragePrices, Observation, PriceAccumulator};
pub use pair::{sort_assets, CallContext, FlashSwap, NoCallback, Pair, PairState, SwapCallee};
pub use params::PairParams;
pub use reserves::Reserves;

pub use pair_math::{FeeRate, ProtocolFeeShare, UQ112x112, MAX_RESERVE, MINIMUM_LIQUIDITY, U256};
