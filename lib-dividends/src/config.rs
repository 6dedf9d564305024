//! Ledger Configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! payout_policy = "abort"
//!
//! [token]
//! name = "Dividend Token"
//! symbol = "DIV"
//! decimals = 18
//!
//! [[genesis]]
//! address = "0101010101010101010101010101010101010101010101010101010101010101"
//! amount = 50
//! ```

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use lib_types::{address_hex, Address};

use crate::gateway::PayoutPolicy;

/// Token metadata (display only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self {
            name: "Dividend Token".to_string(),
            symbol: "DIV".to_string(),
            decimals: 18,
        }
    }
}

/// Initial balance minted at ledger construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAllocation {
    #[serde(with = "address_hex")]
    pub address: Address,
    /// TOML integers are 64-bit
    pub amount: u64,
}

/// Complete ledger configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub payout_policy: PayoutPolicy,
    #[serde(default)]
    pub token: TokenMetadata,
    #[serde(default)]
    pub genesis: Vec<GenesisAllocation>,
}

impl LedgerConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: LedgerConfig = toml::from_str(text).context("Failed to parse ledger config")?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize ledger config")
    }

    /// Check cross-field consistency
    pub fn validate(&self) -> Result<()> {
        if self.token.name.trim().is_empty() {
            bail!("Token name must not be empty");
        }
        if self.token.symbol.trim().is_empty() {
            bail!("Token symbol must not be empty");
        }

        let mut seen = HashSet::new();
        for allocation in &self.genesis {
            if allocation.address.is_zero() {
                bail!("Genesis allocation to the null identity");
            }
            if !seen.insert(allocation.address) {
                bail!("Duplicate genesis allocation for {}", allocation.address);
            }
        }
        Ok(())
    }
}

/// Load and validate a ledger configuration file
pub fn load_config(path: &Path) -> Result<LedgerConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = LedgerConfig::from_toml_str(&text)
        .with_context(|| format!("Invalid config file {}", path.display()))?;

    tracing::info!(
        "Loaded ledger config: {} ({}), {} genesis allocations, {:?} payout policy",
        config.token.name,
        config.token.symbol,
        config.genesis.len(),
        config.payout_policy
    );
    Ok(config)
}
