//! CLI configuration and per-invocation session

use anyhow::{Context, Result};
use duopool::{Address, CallContext, PairParams};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "duopool.toml";

const DEFAULT_STATE_PATH: &str = "~/.duopool/state.json";

/// On-disk shape of `duopool.toml`
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    state_path: String,
    sender: Option<Address>,
    fee_to: Option<Address>,
    params: PairParams,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            state_path: DEFAULT_STATE_PATH.to_string(),
            sender: None,
            fee_to: None,
            params: PairParams::default(),
        }
    }
}

pub struct CliConfig {
    /// File the settings came from, if one existed
    pub source: Option<PathBuf>,
    pub state_path: PathBuf,
    /// Default caller when `--sender` is absent
    pub sender: Option<Address>,
    /// Fee recipient written into a freshly initialised state
    pub fee_to: Option<Address>,
    pub params: PairParams,
}

impl CliConfig {
    /// Load `path`, or `duopool.toml` from the working directory if it
    /// exists. An explicit path that does not exist is an error; a missing
    /// default file means built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (candidate, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !candidate.exists() {
            if explicit {
                anyhow::bail!("Config file not found: {}", candidate.display());
            }
            return Self::from_file(ConfigFile::default(), None);
        }

        let text = fs::read_to_string(&candidate)
            .with_context(|| format!("Failed to read config file: {}", candidate.display()))?;
        let file: ConfigFile = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", candidate.display()))?;
        Self::from_file(file, Some(candidate))
    }

    fn from_file(file: ConfigFile, source: Option<PathBuf>) -> Result<Self> {
        file.params
            .validate()
            .context("Invalid [params] in config")?;

        let mut state_path = expand_path(&file.state_path)?;
        // Relative state paths are relative to the config file
        if state_path.is_relative() {
            if let Some(dir) = source.as_deref().and_then(Path::parent) {
                state_path = dir.join(state_path);
            }
        }

        Ok(Self {
            source,
            state_path,
            sender: file.sender,
            fee_to: file.fee_to,
            params: file.params,
        })
    }
}

/// Expand `~` and environment variables in a path
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw).with_context(|| format!("Failed to expand path: {}", raw))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Everything a command needs besides its own arguments
pub struct Session {
    pub config: CliConfig,
    sender: Option<Address>,
    /// Block time for this invocation (unix seconds)
    pub now: u64,
}

impl Session {
    pub fn new(config: CliConfig, sender: Option<Address>, at: Option<u64>) -> Self {
        let now = at.unwrap_or_else(|| chrono::Utc::now().timestamp().max(0) as u64);
        Self { config, sender, now }
    }

    /// `--sender`, falling back to the config file
    pub fn sender(&self) -> Result<Address> {
        self.sender
            .or(self.config.sender)
            .context("No sender: pass --sender <ADDRESS> or set `sender` in the config file")
    }

    pub fn call_context(&self) -> Result<CallContext> {
        Ok(CallContext::new(self.sender()?, self.now))
    }
}
