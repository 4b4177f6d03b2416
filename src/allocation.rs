//! Target allocation and drift classification.
//!
//! The drift engine compares actual per-asset weights against the target
//! table and turns the deviation into a set of planned trades: overweight
//! assets become sellers (excess in native units), underweight assets become
//! buyers (deficit in USD), and every seller×buyer pair trades a deficit-
//! proportional slice of the seller's excess. Single-pass and not globally
//! optimal; leftover drift is corrected on a subsequent call.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};
use crate::oracle::usd_to_amount;
use crate::types::{AssetId, BPS_DENOM, Usd, WEIGHT_SUM_BPS};

/// One target entry: asset + weight in basis points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetWeight {
    pub asset: AssetId,
    pub weight_bps: u32,
}

/// Desired percentage-of-value split across assets.
///
/// Invariant (enforced at construction): non-empty, no duplicate assets, no
/// zero weights, weights sum to exactly [`WEIGHT_SUM_BPS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetAllocation {
    entries: Vec<TargetWeight>,
}

impl TargetAllocation {
    /// Validate and build an allocation table; rejected wholesale on any
    /// violation.
    pub fn new(entries: Vec<TargetWeight>) -> Result<Self> {
        if entries.is_empty() {
            return Err(VaultError::AllocationInvalid("empty target table".into()));
        }

        let mut seen = std::collections::HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.asset) {
                return Err(VaultError::AllocationInvalid(format!(
                    "duplicate asset: {}",
                    entry.asset
                )));
            }
            if entry.weight_bps == 0 {
                return Err(VaultError::AllocationInvalid(format!(
                    "zero weight for {} — omit instead",
                    entry.asset
                )));
            }
        }

        let sum: u64 = entries.iter().map(|e| e.weight_bps as u64).sum();
        if sum != WEIGHT_SUM_BPS as u64 {
            return Err(VaultError::AllocationInvalid(format!(
                "weights sum to {sum} bps, expected {WEIGHT_SUM_BPS}"
            )));
        }

        Ok(Self { entries })
    }

    /// Convenience constructor from `(asset, weight_bps)` pairs.
    pub fn from_pairs(pairs: &[(AssetId, u32)]) -> Result<Self> {
        Self::new(
            pairs
                .iter()
                .map(|&(asset, weight_bps)| TargetWeight { asset, weight_bps })
                .collect(),
        )
    }

    pub fn entries(&self) -> &[TargetWeight] {
        &self.entries
    }

    /// Target weight for an asset; assets outside the table target 0 bps.
    pub fn weight_bps(&self, asset: &AssetId) -> u32 {
        self.entries
            .iter()
            .find(|e| e.asset == *asset)
            .map(|e| e.weight_bps)
            .unwrap_or(0)
    }
}

/// One asset's valuation snapshot used by the drift engine.
#[derive(Debug, Clone, Copy)]
pub struct AssetValuation {
    pub asset: AssetId,
    /// Vault balance in native units.
    pub balance: u128,
    /// Unit price (micro-USD per whole unit); nonzero for any held asset.
    pub price: Usd,
    pub decimals: u32,
    /// `balance * price / 10^decimals`.
    pub value: Usd,
}

/// Actual weight of one value slice against the total, in basis points.
pub fn weight_bps(value: Usd, total: Usd) -> u32 {
    if total.is_zero() {
        return 0;
    }
    (value.0 * BPS_DENOM / total.0) as u32
}

/// Current per-asset weights in basis points (only nonzero-value assets).
pub fn current_weights(valuations: &[AssetValuation], total: Usd) -> Vec<(AssetId, u32)> {
    valuations
        .iter()
        .filter(|v| !v.value.is_zero())
        .map(|v| (v.asset, weight_bps(v.value, total)))
        .collect()
}

/// First asset whose weight deviates from target by more than
/// `tolerance_bps`, or `None` if every asset is within tolerance.
pub fn first_out_of_tolerance(
    valuations: &[AssetValuation],
    total: Usd,
    target: &TargetAllocation,
    tolerance_bps: u32,
) -> Option<(AssetId, u32, u32)> {
    if total.is_zero() {
        return None;
    }
    for v in valuations {
        let actual = weight_bps(v.value, total);
        let wanted = target.weight_bps(&v.asset);
        if actual.abs_diff(wanted) > tolerance_bps {
            return Some((v.asset, actual, wanted));
        }
    }
    None
}

/// An overweight asset: how much to shed, in native units.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SellLeg {
    pub asset: AssetId,
    /// Excess above target, converted to native units at the oracle price.
    pub excess_amount: u128,
    pub excess_value: Usd,
}

/// An underweight asset: how much is missing, in USD.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BuyLeg {
    pub asset: AssetId,
    pub deficit: Usd,
}

/// The classified over/underweight sets for one rebalance pass.
#[derive(Debug, Clone, Serialize)]
pub struct DriftPlan {
    pub sells: Vec<SellLeg>,
    pub buys: Vec<BuyLeg>,
    pub total_deficit: Usd,
}

impl DriftPlan {
    pub fn is_empty(&self) -> bool {
        self.sells.is_empty() || self.buys.is_empty() || self.total_deficit.is_zero()
    }
}

/// Classify every asset as seller (overweight), buyer (underweight), or
/// on-target. Assets held but absent from the target table are fully
/// overweight (target 0 bps).
pub fn classify_drift(
    valuations: &[AssetValuation],
    total: Usd,
    target: &TargetAllocation,
) -> DriftPlan {
    let mut sells = Vec::new();
    let mut buys = Vec::new();
    let mut total_deficit = Usd::ZERO;

    for v in valuations {
        let target_value = total.bps(target.weight_bps(&v.asset));
        if v.value > target_value {
            let excess_value = Usd(v.value.0 - target_value.0);
            let excess_amount = usd_to_amount(excess_value, v.price, v.decimals);
            if excess_amount > 0 {
                sells.push(SellLeg {
                    asset: v.asset,
                    excess_amount,
                    excess_value,
                });
            }
        } else if v.value < target_value {
            let deficit = Usd(target_value.0 - v.value.0);
            total_deficit.0 += deficit.0;
            buys.push(BuyLeg {
                asset: v.asset,
                deficit,
            });
        }
    }

    DriftPlan {
        sells,
        buys,
        total_deficit,
    }
}

/// One planned swap leg: sell `amount_in` of `asset_in` for `asset_out`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PlannedTrade {
    pub asset_in: AssetId,
    pub asset_out: AssetId,
    pub amount_in: u128,
}

/// Pair every seller with every buyer, trading
/// `seller_excess * buyer_deficit / total_deficit` per pair.
///
/// Floor division guarantees no seller exceeds its excess and the buy legs
/// never exceed the total deficit.
pub fn pair_trades(plan: &DriftPlan) -> Vec<PlannedTrade> {
    if plan.is_empty() {
        return Vec::new();
    }

    let mut trades = Vec::with_capacity(plan.sells.len() * plan.buys.len());
    for sell in &plan.sells {
        for buy in &plan.buys {
            let amount_in = sell.excess_amount * buy.deficit.0 / plan.total_deficit.0;
            if amount_in == 0 {
                continue;
            }
            trades.push(PlannedTrade {
                asset_in: sell.asset,
                asset_out: buy.asset,
                amount_in,
            });
        }
    }
    trades
}
