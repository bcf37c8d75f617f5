//! Pair parameters

use pair_math::{FeeRate, ProtocolFeeShare};
use serde::{Deserialize, Serialize};

use crate::error::{PairError, Result};

/// Pair parameters, fixed at creation.
///
/// Stored as plain integers so the CLI can read them from a `[params]`
/// TOML table; `fee()` and `protocol_fee()` lift them into the math types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairParams {
    /// Trading fee numerator (19 with denominator 10_000 = 0.19%)
    pub fee_numerator: u32,

    /// Trading fee denominator
    pub fee_denominator: u32,

    /// Protocol fee divisor M: the fee recipient earns 1/(M+1) of
    /// invariant growth
    pub protocol_fee_divisor: u32,
}

impl Default for PairParams {
    fn default() -> Self {
        let fee = FeeRate::DEFAULT;
        Self {
            fee_numerator: fee.numerator,
            fee_denominator: fee.denominator,
            protocol_fee_divisor: ProtocolFeeShare::default().divisor,
        }
    }
}

impl PairParams {
    pub fn fee(&self) -> FeeRate {
        FeeRate {
            numerator: self.fee_numerator,
            denominator: self.fee_denominator,
        }
    }

    pub fn protocol_fee(&self) -> ProtocolFeeShare {
        ProtocolFeeShare {
            divisor: self.protocol_fee_divisor,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.fee().is_valid() {
            return Err(PairError::InvalidParams);
        }
        // M = 0 would hand the whole growth to the recipient
        if self.protocol_fee_divisor == 0 {
            return Err(PairError::InvalidParams);
        }
        Ok(())
    }
}
