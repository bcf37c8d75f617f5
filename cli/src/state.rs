//! Persistent simulation state (JSON)
//!
//! One file holds the pair, the asset ledger it custodies through, the
//! protocol fee switch and the TWAP observations recorded so far.

use anyhow::{Context, Result};
use duopool::{Address, MemoryLedger, Observation, Pair};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
pub struct SimState {
    pub pair: Pair,
    pub ledger: MemoryLedger,
    /// Protocol fee recipient; stands in for the factory's `feeTo`
    pub fee_to: Option<Address>,
    /// Observations recorded with `duopool twap --record`, oldest first
    #[serde(default)]
    pub observations: Vec<Observation>,
}

impl SimState {
    pub fn new(pair: Pair, fee_to: Option<Address>) -> Self {
        Self {
            pair,
            ledger: MemoryLedger::new(),
            fee_to,
            observations: Vec::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "No pair state at {}\n\
                 Create one with: duopool init <TOKEN_A> <TOKEN_B>",
                path.display()
            );
        }
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| format!("Failed to parse state file: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        let data = serde_json::to_string_pretty(self).context("Failed to serialize state")?;
        // Write then rename so an interrupted save never truncates the state
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, data).with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| format!("Failed to replace state file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duopool::{AssetLedger, CallContext, PairParams};

    const TOKEN_A: Address = Address::new([0x10; 32]);
    const TOKEN_B: Address = Address::new([0x20; 32]);
    const PAIR: Address = Address::new([0x30; 32]);
    const ALICE: Address = Address::new([0x01; 32]);

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let pair = Pair::new(PAIR, TOKEN_A, TOKEN_B, PairParams::default()).unwrap();
        let mut state = SimState::new(pair, Some(ALICE));
        state.ledger.issue(&TOKEN_A, &PAIR, 50_000).unwrap();
        state.ledger.issue(&TOKEN_B, &PAIR, 20_000).unwrap();
        let registry = state.fee_to;
        state
            .pair
            .mint(&mut state.ledger, &registry, &CallContext::new(ALICE, 10), ALICE)
            .unwrap();
        state.save(&path).unwrap();

        let loaded = SimState::load(&path).unwrap();
        assert_eq!(loaded.fee_to, Some(ALICE));
        assert_eq!(loaded.pair.reserves(), state.pair.reserves());
        assert_eq!(loaded.pair.k_last(), state.pair.k_last());
        assert_eq!(loaded.pair.balance_of(&ALICE), state.pair.balance_of(&ALICE));
        assert_eq!(loaded.ledger.balance_of(&TOKEN_A, &PAIR), 50_000);
    }

    #[test]
    fn test_missing_state_mentions_init() {
        let dir = tempfile::tempdir().unwrap();
        let err = SimState::load(&dir.path().join("state.json")).err().unwrap();
        assert!(err.to_string().contains("duopool init"));
    }
}
