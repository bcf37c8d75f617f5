//! Error taxonomy for pair operations

use pair_math::MathError;
use thiserror::Error;

/// Every failure a pair operation can surface.
///
/// All variants are terminal: the operation that produced one has been
/// rolled back in full before the error reaches the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PairError {
    /// Deposit too small to mint any claims
    #[error("insufficient liquidity minted")]
    InsufficientLiquidityMinted,

    /// Burn would return zero of an asset
    #[error("insufficient liquidity burned")]
    InsufficientLiquidityBurned,

    /// Swap requested no output
    #[error("insufficient output amount")]
    InsufficientOutputAmount,

    /// Swap received no input
    #[error("insufficient input amount")]
    InsufficientInputAmount,

    /// Requested output meets or exceeds the reserve
    #[error("insufficient liquidity")]
    InsufficientLiquidity,

    /// Swap recipient is one of the pair's own assets
    #[error("invalid recipient")]
    InvalidRecipient,

    /// Fee-adjusted product of balances fell below the reserve product
    #[error("K")]
    InvariantViolation,

    /// Operation entered while another one holds the lock
    #[error("locked")]
    Reentrancy,

    /// Value does not fit its representation (112-bit reserves, 256-bit products)
    #[error("overflow")]
    Overflow,

    /// Claim balance too small for a transfer or burn
    #[error("insufficient claim balance")]
    InsufficientBalance,

    /// Claims held by the sink can never move
    #[error("claims held by the sink are locked")]
    SinkLocked,

    /// Pair created from a single asset
    #[error("identical assets")]
    IdenticalAssets,

    /// Zero address used as an asset
    #[error("zero address")]
    ZeroAddress,

    /// Pair custody address equals one of its assets
    #[error("pair address collides with an asset")]
    InvalidPairAddress,

    /// Asset ledger refused a transfer out of custody
    #[error("asset transfer failed")]
    TransferFailed,

    /// TWAP requested over a zero-length window
    #[error("oracle window is empty")]
    OracleWindowEmpty,

    /// Pair parameters are not usable (fee rate outside [0, 1))
    #[error("invalid pair parameters")]
    InvalidParams,
}

pub type Result<T> = core::result::Result<T, PairError>;

impl From<MathError> for PairError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::Overflow => PairError::Overflow,
            MathError::InsufficientLiquidity => PairError::InsufficientLiquidity,
            MathError::InsufficientInputAmount => PairError::InsufficientInputAmount,
            MathError::InsufficientOutputAmount => PairError::InsufficientOutputAmount,
            // Only reachable through an empty supply or reserve
            MathError::DivisionByZero => PairError::InsufficientLiquidity,
            MathError::InvalidFee => PairError::InvalidParams,
        }
    }
}
