//! TOML-loadable engine parameters with validation.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};
use crate::fees::FeeSplit;
use crate::types::{AssetId, BPS_DENOM};

/// Tunable engine parameters. All basis-point fields are validated on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultParams {
    /// Per-asset drift tolerated before (and required after) a rebalance.
    #[serde(default = "default_drift_tolerance")]
    pub drift_tolerance_bps: u32,
    /// Maximum tolerated drop in total vault value from one rebalance.
    #[serde(default = "default_max_value_loss")]
    pub max_value_loss_bps: u32,
    /// Minimum accepted fraction of a winning quote's output.
    #[serde(default = "default_min_out")]
    pub min_out_bps: u32,
    /// Manager stake threshold for the accountability gate.
    #[serde(default = "default_min_owner")]
    pub min_owner_bps: u32,
    #[serde(default)]
    pub fee: FeeSplit,
    /// Wrapped form of the native currency; enables `deposit_native`.
    #[serde(default)]
    pub wrapped_native: Option<AssetId>,
}

fn default_drift_tolerance() -> u32 {
    200 // ±2pp
}
fn default_max_value_loss() -> u32 {
    50 // 0.5%
}
fn default_min_out() -> u32 {
    9_500 // accept >= 95% of quote
}
fn default_min_owner() -> u32 {
    100 // manager must hold >= 1% of supply
}

impl Default for VaultParams {
    fn default() -> Self {
        Self {
            drift_tolerance_bps: default_drift_tolerance(),
            max_value_loss_bps: default_max_value_loss(),
            min_out_bps: default_min_out(),
            min_owner_bps: default_min_owner(),
            fee: FeeSplit::default(),
            wrapped_native: None,
        }
    }
}

impl VaultParams {
    /// Load parameters from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| VaultError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let params: VaultParams = toml::from_str(&contents)?;
        params.validate()?;
        Ok(params)
    }

    /// Parse from a TOML string (useful for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let params: VaultParams = toml::from_str(toml_str)?;
        params.validate()?;
        Ok(params)
    }

    /// Validate parameter invariants.
    pub fn validate(&self) -> Result<()> {
        if self.drift_tolerance_bps as u128 >= BPS_DENOM {
            return Err(VaultError::Config(
                "drift_tolerance_bps must be < 10000".into(),
            ));
        }
        if self.max_value_loss_bps as u128 >= BPS_DENOM {
            return Err(VaultError::Config(
                "max_value_loss_bps must be < 10000".into(),
            ));
        }
        if self.min_out_bps == 0 || self.min_out_bps as u128 > BPS_DENOM {
            return Err(VaultError::Config(
                "min_out_bps must be in (0, 10000]".into(),
            ));
        }
        if self.min_owner_bps as u128 > BPS_DENOM {
            return Err(VaultError::Config("min_owner_bps must be <= 10000".into()));
        }
        self.fee.validate()?;
        Ok(())
    }
}
