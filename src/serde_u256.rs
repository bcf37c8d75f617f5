//! Decimal-string serde representation for `U256`
//!
//! JSON numbers cannot carry 256 bits, so accumulators and `k_last` are
//! written as base-10 strings.

use pair_math::U256;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
    let s = String::deserialize(deserializer)?;
    U256::from_dec_str(&s).map_err(|e| serde::de::Error::custom(format!("{:?}", e)))
}
