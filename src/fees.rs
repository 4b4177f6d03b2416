//! Gain/loss fee and penalty settlement.
//!
//! On a rebalance gain the platform takes its policy fee, an accountable
//! manager earns `owner_fee_bps`, and the triggering caller always earns
//! `caller_fee_bps` — the incentive that funds permissionless triggering. On
//! a loss an accountable manager is penalized `owner_fee_bps +
//! caller_fee_bps` of the loss, capped at their actual holding. All
//! conversions use the post-operation share price so stale-price rounding is
//! not compounded.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};
use crate::types::{BPS_DENOM, SHARE_SCALE, Shares, Usd};

/// Manager/caller fee split in basis points of the realized gain or loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    pub owner_fee_bps: u32,
    pub caller_fee_bps: u32,
}

impl Default for FeeSplit {
    fn default() -> Self {
        Self {
            owner_fee_bps: 100,
            caller_fee_bps: 50,
        }
    }
}

impl FeeSplit {
    pub fn new(owner_fee_bps: u32, caller_fee_bps: u32) -> Result<Self> {
        let split = Self {
            owner_fee_bps,
            caller_fee_bps,
        };
        split.validate()?;
        Ok(split)
    }

    pub fn validate(&self) -> Result<()> {
        let sum = self.owner_fee_bps as u128 + self.caller_fee_bps as u128;
        if sum > BPS_DENOM {
            return Err(VaultError::Config(format!(
                "fee split sums to {sum} bps (> {BPS_DENOM})"
            )));
        }
        Ok(())
    }
}

/// Share mints and burns resulting from one settlement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub gain: Usd,
    pub loss: Usd,
    pub platform_shares: Shares,
    pub owner_shares: Shares,
    pub caller_shares: Shares,
    /// Penalty burned from the manager's own balance (already capped).
    pub manager_burn: Shares,
}

impl Settlement {
    pub fn is_noop(&self) -> bool {
        self.platform_shares == 0
            && self.owner_shares == 0
            && self.caller_shares == 0
            && self.manager_burn == 0
    }
}

/// USD value to shares at the given share price, rounding down.
pub fn usd_to_shares(value: Usd, share_price: Usd) -> Shares {
    if share_price.is_zero() {
        return 0;
    }
    value.0 * SHARE_SCALE / share_price.0
}

/// Compute the settlement for a `value_before` → `value_after` move.
///
/// `platform_fee` is the external fee policy's cut of the gain (zero on a
/// loss). `manager_balance` caps the loss penalty.
pub fn settle(
    value_before: Usd,
    value_after: Usd,
    share_price_after: Usd,
    platform_fee: Usd,
    split: &FeeSplit,
    manager_accountable: bool,
    manager_balance: Shares,
) -> Settlement {
    if value_after > value_before {
        let gain = Usd(value_after.0 - value_before.0);
        let owner_cut = if manager_accountable {
            gain.bps(split.owner_fee_bps)
        } else {
            Usd::ZERO
        };
        let caller_cut = gain.bps(split.caller_fee_bps);
        Settlement {
            gain,
            loss: Usd::ZERO,
            platform_shares: usd_to_shares(platform_fee, share_price_after),
            owner_shares: usd_to_shares(owner_cut, share_price_after),
            caller_shares: usd_to_shares(caller_cut, share_price_after),
            manager_burn: 0,
        }
    } else if value_after < value_before {
        let loss = Usd(value_before.0 - value_after.0);
        let penalty = if manager_accountable {
            let penalty_value = loss.bps(split.owner_fee_bps + split.caller_fee_bps);
            usd_to_shares(penalty_value, share_price_after).min(manager_balance)
        } else {
            0
        };
        Settlement {
            gain: Usd::ZERO,
            loss,
            platform_shares: 0,
            owner_shares: 0,
            caller_shares: 0,
            manager_burn: penalty,
        }
    } else {
        Settlement::default()
    }
}
