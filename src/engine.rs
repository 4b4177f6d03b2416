//! The vault accounting engine: share-fair deposits and redemptions, the
//! drift-correction rebalance, fee settlement, and the manager
//! accountability gate.
//!
//! One generic engine replaces the near-duplicate vault variants of older
//! designs: the target allocation and the accountability policy are both
//! optional and chosen at construction. Every state-changing call is
//! all-or-nothing — internal state is snapshotted and restored on any abort.

use log::{info, warn};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::allocation::{self, AssetValuation, TargetAllocation};
use crate::audit::AuditLog;
use crate::config::VaultParams;
use crate::error::{Result, VaultError};
use crate::fees::{self, FeeSplit, Settlement};
use crate::ledger::ShareLedger;
use crate::oracle::{PriceOracle, asset_value};
use crate::quote::{self, TradeExecution};
use crate::types::{
    AssetId, BPS_DENOM, HolderId, INITIAL_SHARE_PRICE, SHARE_SCALE, Shares, Usd,
};
use crate::venue::{RouteExecutor, VenueConfig};

/// Mutable per-vault bookkeeping.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VaultState {
    /// Last recorded share price; re-initialized at zero supply.
    pub share_price: Usd,
    pub lifetime_deposits: Usd,
    pub lifetime_withdrawals: Usd,
    pub paused: bool,
    pub rebalance_paused: bool,
}

impl Default for VaultState {
    fn default() -> Self {
        Self {
            share_price: INITIAL_SHARE_PRICE,
            lifetime_deposits: Usd::ZERO,
            lifetime_withdrawals: Usd::ZERO,
            paused: false,
            rebalance_paused: false,
        }
    }
}

/// Manager-accountability policy: the stake fraction (bps of supply) the
/// manager must hold to keep privileged rights and fee/penalty exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AccountabilityPolicy {
    pub min_owner_bps: u32,
}

/// One asset paid out by a redeem or sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Payout {
    pub asset: AssetId,
    pub amount: u128,
}

/// Outcome of one rebalance invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RebalanceReport {
    pub value_before: Usd,
    pub value_after: Usd,
    /// Executed swaps (empty for route-based rebalances and skipped passes).
    pub trades: Vec<TradeExecution>,
    pub settlement: Settlement,
    /// True when every weight was already within tolerance and no trading
    /// happened; fees still settled against externally-driven drift.
    pub skipped: bool,
}

enum TradePath<'a> {
    BestQuote,
    Route(&'a dyn RouteExecutor),
}

/// Share price for a value/supply pair: floored division, clamped to one
/// micro-dollar while supply is outstanding. A vault can crash to near-zero
/// value, but a stored price of zero would make the next deposit's
/// shares-minted division undefined.
fn price_for(value: Usd, supply: Shares) -> Usd {
    if supply == 0 {
        INITIAL_SHARE_PRICE
    } else {
        Usd((value.0 * SHARE_SCALE / supply).max(1))
    }
}

/// The vault engine. Exclusively owns the vault state, holdings, and target
/// allocation; the share ledger is mutated only through engine-issued
/// mint/burn.
pub struct VaultEngine<O: PriceOracle> {
    oracle: O,
    manager: HolderId,
    platform: HolderId,
    params: VaultParams,
    accountability: Option<AccountabilityPolicy>,
    target: Option<TargetAllocation>,
    venues: Vec<VenueConfig>,
    ledger: ShareLedger,
    holdings: FxHashMap<AssetId, u128>,
    state: VaultState,
    audit: Option<AuditLog>,
    entered: bool,
}

impl<O: PriceOracle> std::fmt::Debug for VaultEngine<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultEngine")
            .field("manager", &self.manager)
            .field("platform", &self.platform)
            .field("params", &self.params)
            .field("accountability", &self.accountability)
            .field("target", &self.target)
            .field("ledger", &self.ledger)
            .field("holdings", &self.holdings)
            .field("state", &self.state)
            .field("entered", &self.entered)
            .finish_non_exhaustive()
    }
}

impl<O: PriceOracle> VaultEngine<O> {
    pub fn new(oracle: O, manager: HolderId, platform: HolderId, params: VaultParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            oracle,
            manager,
            platform,
            params,
            accountability: None,
            target: None,
            venues: Vec::new(),
            ledger: ShareLedger::new(),
            holdings: FxHashMap::default(),
            state: VaultState::default(),
            audit: None,
            entered: false,
        })
    }

    /// Attach a target allocation at construction time.
    pub fn with_target(mut self, target: TargetAllocation) -> Self {
        self.target = Some(target);
        self
    }

    /// Enable the accountability gate at construction time.
    pub fn with_accountability(mut self, policy: AccountabilityPolicy) -> Self {
        self.accountability = Some(policy);
        self
    }

    /// Attach a JSONL audit trail. Write failures are logged, never fatal to
    /// the financial operation they describe.
    pub fn attach_audit(&mut self, log: AuditLog) {
        self.audit = Some(log);
    }

    // === Views ===

    pub fn manager(&self) -> HolderId {
        self.manager
    }

    pub fn params(&self) -> &VaultParams {
        &self.params
    }

    pub fn state(&self) -> &VaultState {
        &self.state
    }

    pub fn target(&self) -> Option<&TargetAllocation> {
        self.target.as_ref()
    }

    pub fn share_price(&self) -> Usd {
        self.state.share_price
    }

    pub fn total_supply(&self) -> Shares {
        self.ledger.total_supply()
    }

    pub fn balance_of(&self, holder: &HolderId) -> Shares {
        self.ledger.balance_of(holder)
    }

    pub fn holdings_of(&self, asset: &AssetId) -> u128 {
        self.holdings.get(asset).copied().unwrap_or(0)
    }

    /// Current total vault value across accepted assets.
    pub fn total_value(&self) -> Result<Usd> {
        Ok(self.valuations()?.1)
    }

    /// Current per-asset weights in basis points.
    pub fn current_allocation(&self) -> Result<Vec<(AssetId, u32)>> {
        let (vals, total) = self.valuations()?;
        Ok(allocation::current_weights(&vals, total))
    }

    /// Manager stake as bps of supply (whole denominator at zero supply).
    pub fn manager_stake_bps(&self) -> u32 {
        let supply = self.ledger.total_supply();
        if supply == 0 {
            return BPS_DENOM as u32;
        }
        (self.ledger.balance_of(&self.manager) * BPS_DENOM / supply) as u32
    }

    /// Whether the manager currently passes the accountability gate.
    /// Vacuously true at zero supply, and always true without a policy.
    pub fn is_manager_accountable(&self) -> bool {
        match self.accountability {
            None => true,
            Some(policy) => {
                self.ledger.total_supply() == 0
                    || self.manager_stake_bps() >= policy.min_owner_bps
            }
        }
    }

    // === Holder operations ===

    /// Deposit `amount` native units of `asset` for newly minted shares.
    ///
    /// Custody transfer is atomic with the call: on any error the vault's
    /// holdings and ledger are unchanged.
    pub fn deposit(&mut self, holder: HolderId, asset: AssetId, amount: u128) -> Result<Shares> {
        self.guarded(|eng| eng.deposit_inner(holder, asset, amount))
    }

    /// Deposit the native currency; it is wrapped into the configured
    /// wrapped asset transparently.
    pub fn deposit_native(&mut self, holder: HolderId, amount: u128) -> Result<Shares> {
        let wrapped = self
            .params
            .wrapped_native
            .ok_or(VaultError::InvalidAsset {
                asset: AssetId::new("NATIVE"),
            })?;
        self.deposit(holder, wrapped, amount)
    }

    /// Redeem shares for a strict pro-rata slice of *physical* holdings.
    ///
    /// Every oracle-accepted asset participates, residual holdings included,
    /// and no fresh price read happens on exit — so a redeemer's payout value
    /// can diverge from nominal share value while the vault is off-target.
    /// That asymmetry is intended. Shares burn before any payout leaves the
    /// holdings, which blocks reentrant ratio corruption for a second
    /// concurrent redeemer.
    pub fn redeem(&mut self, holder: HolderId, share_amount: Shares) -> Result<Vec<Payout>> {
        self.guarded(|eng| eng.redeem_inner(holder, share_amount))
    }

    /// Correct allocation drift by trading through the best-quoted venue.
    /// Any holder with a nonzero balance may trigger. Success is
    /// probabilistic — callers must be prepared to retry.
    pub fn rebalance_by_best_quote(&mut self, caller: HolderId) -> Result<RebalanceReport> {
        self.guarded(|eng| eng.rebalance_inner(caller, TradePath::BestQuote))
    }

    /// Rebalance through a caller-supplied opaque route (e.g. an external
    /// aggregator), subject to the same value-loss and allocation checks.
    pub fn rebalance_by_route(
        &mut self,
        caller: HolderId,
        route: &dyn RouteExecutor,
    ) -> Result<RebalanceReport> {
        self.guarded(|eng| eng.rebalance_inner(caller, TradePath::Route(route)))
    }

    // === Manager operations ===

    /// Replace the target allocation wholesale. Accountable manager only.
    pub fn update_target_allocation(
        &mut self,
        caller: HolderId,
        target: TargetAllocation,
    ) -> Result<()> {
        self.guarded(|eng| {
            eng.require_manager(caller)?;
            eng.require_accountable()?;
            eng.audit_event(
                "target_updated",
                serde_json::json!({ "entries": target.entries() }),
            );
            eng.target = Some(target);
            Ok(())
        })
    }

    /// Set the owner/caller fee split. Manager only.
    pub fn set_fee_split(&mut self, caller: HolderId, owner_bps: u32, caller_bps: u32) -> Result<()> {
        self.guarded(|eng| {
            eng.require_manager(caller)?;
            eng.params.fee = FeeSplit::new(owner_bps, caller_bps)?;
            eng.audit_event(
                "fee_split_updated",
                serde_json::json!({ "owner_bps": owner_bps, "caller_bps": caller_bps }),
            );
            Ok(())
        })
    }

    /// Append a venue to the table. Manager only, mutable anytime.
    pub fn add_venue(&mut self, caller: HolderId, venue: VenueConfig) -> Result<usize> {
        self.guarded(|eng| {
            eng.require_manager(caller)?;
            eng.venues.push(venue);
            let index = eng.venues.len() - 1;
            eng.audit_event("venue_added", serde_json::json!({ "index": index }));
            Ok(index)
        })
    }

    /// Replace one venue's configuration. Manager only.
    pub fn configure_venue(&mut self, caller: HolderId, index: usize, venue: VenueConfig) -> Result<()> {
        self.guarded(|eng| {
            eng.require_manager(caller)?;
            let slot = eng
                .venues
                .get_mut(index)
                .ok_or_else(|| VaultError::Config(format!("no venue at index {index}")))?;
            *slot = venue;
            eng.audit_event("venue_configured", serde_json::json!({ "index": index }));
            Ok(())
        })
    }

    pub fn set_venue_enabled(&mut self, caller: HolderId, index: usize, enabled: bool) -> Result<()> {
        self.guarded(|eng| {
            eng.require_manager(caller)?;
            let slot = eng
                .venues
                .get_mut(index)
                .ok_or_else(|| VaultError::Config(format!("no venue at index {index}")))?;
            slot.enabled = enabled;
            eng.audit_event(
                "venue_enabled",
                serde_json::json!({ "index": index, "enabled": enabled }),
            );
            Ok(())
        })
    }

    /// Pause all holder operations. Accountable manager only.
    pub fn pause(&mut self, caller: HolderId) -> Result<()> {
        self.set_pause_flag(caller, |state, v| state.paused = v, true, "paused")
    }

    pub fn unpause(&mut self, caller: HolderId) -> Result<()> {
        self.set_pause_flag(caller, |state, v| state.paused = v, false, "unpaused")
    }

    /// Pause rebalancing only; deposits and redeems continue.
    pub fn pause_rebalancing(&mut self, caller: HolderId) -> Result<()> {
        self.set_pause_flag(
            caller,
            |state, v| state.rebalance_paused = v,
            true,
            "rebalancing_paused",
        )
    }

    pub fn unpause_rebalancing(&mut self, caller: HolderId) -> Result<()> {
        self.set_pause_flag(
            caller,
            |state, v| state.rebalance_paused = v,
            false,
            "rebalancing_unpaused",
        )
    }

    /// Transfer out an asset the oracle does not accept (dust, delisted
    /// tokens). Disallowed for any accepted asset.
    pub fn sweep(&mut self, caller: HolderId, asset: AssetId, amount: u128, to: HolderId) -> Result<Payout> {
        self.guarded(|eng| {
            eng.require_manager(caller)?;
            if eng.oracle.is_asset_accepted(&asset) {
                return Err(VaultError::SweepNotAllowed { asset });
            }
            let available = eng.holdings_of(&asset);
            if amount == 0 {
                return Err(VaultError::ZeroAmount);
            }
            if available < amount {
                return Err(VaultError::InsufficientHoldings {
                    asset,
                    requested: amount,
                    available,
                });
            }
            eng.set_holding(asset, available - amount);
            eng.audit_event(
                "sweep",
                serde_json::json!({
                    "asset": asset.as_str(),
                    "amount": amount.to_string(),
                    "to": format!("{to}"),
                }),
            );
            Ok(Payout { asset, amount })
        })
    }

    // === Internals ===

    /// Operational check, reentrancy guard, and guaranteed guard release.
    ///
    /// `&mut self` entry points already serialize calls within safe Rust;
    /// the flag covers embedders that hand the engine to venue adapters
    /// through shared mutability (a `RefCell`, a lock held across the
    /// callback), where an adapter could call back mid-operation. Such a
    /// reentry fails with [`VaultError::ReentrantCall`] instead of
    /// corrupting the share ratio.
    fn guarded<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if !self.oracle.is_operational() {
            return Err(VaultError::PlatformHalted);
        }
        if self.entered {
            return Err(VaultError::ReentrantCall);
        }
        self.entered = true;
        let result = f(self);
        self.entered = false;
        result
    }

    fn require_manager(&self, caller: HolderId) -> Result<()> {
        if caller != self.manager {
            return Err(VaultError::NotManager);
        }
        Ok(())
    }

    fn require_accountable(&self) -> Result<()> {
        if !self.is_manager_accountable() {
            return Err(VaultError::Unaccountable {
                holder_bps: self.manager_stake_bps(),
                required_bps: self
                    .accountability
                    .map(|p| p.min_owner_bps)
                    .unwrap_or(0),
            });
        }
        Ok(())
    }

    fn require_not_paused(&self) -> Result<()> {
        if self.state.paused {
            return Err(VaultError::Paused);
        }
        Ok(())
    }

    fn set_holding(&mut self, asset: AssetId, amount: u128) {
        if amount == 0 {
            self.holdings.remove(&asset);
        } else {
            self.holdings.insert(asset, amount);
        }
    }

    /// Valuation pass over every accepted asset. A zero oracle price is a
    /// hard failure for any asset that is held or targeted, never silently
    /// skipped.
    fn valuations(&self) -> Result<(Vec<AssetValuation>, Usd)> {
        let mut vals = Vec::new();
        let mut total = Usd::ZERO;

        for asset in self.oracle.accepted_assets() {
            let balance = self.holdings_of(&asset);
            let targeted = self
                .target
                .as_ref()
                .is_some_and(|t| t.weight_bps(&asset) > 0);
            if balance == 0 && !targeted {
                continue;
            }

            let price = self.oracle.price(&asset);
            if price.is_zero() {
                return Err(VaultError::InvalidAsset { asset });
            }
            let decimals = self.oracle.decimals(&asset);
            let value = asset_value(balance, price, decimals);
            total.0 += value.0;
            vals.push(AssetValuation {
                asset,
                balance,
                price,
                decimals,
                value,
            });
        }

        Ok((vals, total))
    }

    /// Nominal vault value at the last recorded share price. The fee
    /// settlement baseline: externally-driven drift since the last mutation
    /// realizes into gain/loss here.
    fn nominal_value(&self) -> Usd {
        Usd(self.ledger.total_supply() * self.state.share_price.0 / SHARE_SCALE)
    }

    /// Recompute and store the share price from current valuations.
    /// Initial price applies only at zero supply.
    fn refresh_share_price(&mut self) -> Result<()> {
        let supply = self.ledger.total_supply();
        self.state.share_price = if supply == 0 {
            INITIAL_SHARE_PRICE
        } else {
            let (_, total) = self.valuations()?;
            price_for(total, supply)
        };
        Ok(())
    }

    fn deposit_inner(&mut self, holder: HolderId, asset: AssetId, amount: u128) -> Result<Shares> {
        self.require_not_paused()?;
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        if !self.oracle.is_asset_accepted(&asset) {
            return Err(VaultError::InvalidAsset { asset });
        }
        let price = self.oracle.price(&asset);
        if price.is_zero() {
            return Err(VaultError::InvalidAsset { asset });
        }

        let value = asset_value(amount, price, self.oracle.decimals(&asset));

        // Lazy price initialization on the vault's first deposit (and after
        // supply has returned to zero).
        if self.ledger.total_supply() == 0 {
            self.state.share_price = INITIAL_SHARE_PRICE;
        }
        let minted = value.0 * SHARE_SCALE / self.state.share_price.0;
        if minted == 0 {
            return Err(VaultError::ZeroShares {
                value,
                share_price: self.state.share_price,
            });
        }

        let balance = self.holdings_of(&asset);
        self.set_holding(asset, balance + amount);
        self.state.lifetime_deposits.0 += value.0;
        self.ledger.mint(holder, minted);
        self.refresh_share_price()?;

        info!("{holder} deposited {amount} {asset} ({value}) for {minted} shares");
        self.audit_event(
            "deposit",
            serde_json::json!({
                "holder": format!("{holder}"),
                "asset": asset.as_str(),
                "amount": amount.to_string(),
                "value": format!("{value}"),
                "shares": minted.to_string(),
            }),
        );
        Ok(minted)
    }

    fn redeem_inner(&mut self, holder: HolderId, share_amount: Shares) -> Result<Vec<Payout>> {
        self.require_not_paused()?;
        if share_amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let balance = self.ledger.balance_of(&holder);
        if balance < share_amount {
            return Err(VaultError::InsufficientBalance {
                holder,
                requested: share_amount,
                available: balance,
            });
        }

        let supply_before = self.ledger.total_supply();
        let nominal = Usd(share_amount * self.state.share_price.0 / SHARE_SCALE);

        // Burn before any payout leaves the holdings.
        self.ledger.burn(holder, share_amount)?;

        let mut payouts = Vec::new();
        for asset in self.oracle.accepted_assets() {
            let held = self.holdings_of(&asset);
            if held == 0 {
                continue;
            }
            let amount = held * share_amount / supply_before;
            if amount == 0 {
                continue;
            }
            self.set_holding(asset, held - amount);
            payouts.push(Payout { asset, amount });
        }

        self.state.lifetime_withdrawals.0 += nominal.0;
        self.refresh_share_price()?;

        info!("{holder} redeemed {share_amount} shares for {} assets", payouts.len());
        self.audit_event(
            "redeem",
            serde_json::json!({
                "holder": format!("{holder}"),
                "shares": share_amount.to_string(),
                "payouts": payouts
                    .iter()
                    .map(|p| serde_json::json!({
                        "asset": p.asset.as_str(),
                        "amount": p.amount.to_string(),
                    }))
                    .collect::<Vec<_>>(),
            }),
        );
        Ok(payouts)
    }

    fn rebalance_inner(&mut self, caller: HolderId, path: TradePath<'_>) -> Result<RebalanceReport> {
        self.require_not_paused()?;
        if self.state.rebalance_paused {
            return Err(VaultError::RebalancingPaused);
        }
        if self.ledger.balance_of(&caller) == 0 {
            return Err(VaultError::NotAHolder);
        }
        if self.target.is_none() {
            return Err(VaultError::NoTargetAllocation);
        }

        // All-or-nothing: any abort below restores the full internal state.
        let snapshot = (
            self.ledger.clone(),
            self.holdings.clone(),
            self.state.clone(),
        );
        match self.rebalance_attempt(caller, path) {
            Ok(report) => Ok(report),
            Err(e) => {
                let (ledger, holdings, state) = snapshot;
                self.ledger = ledger;
                self.holdings = holdings;
                self.state = state;
                warn!("rebalance aborted: {e}");
                self.audit_event(
                    "rebalance_aborted",
                    serde_json::json!({ "reason": format!("{e}") }),
                );
                Err(e)
            }
        }
    }

    fn rebalance_attempt(&mut self, caller: HolderId, path: TradePath<'_>) -> Result<RebalanceReport> {
        let target = self.target.clone().ok_or(VaultError::NoTargetAllocation)?;
        let tolerance = self.params.drift_tolerance_bps;

        let (vals, value_before) = self.valuations()?;
        // Fee baseline: nominal value at the last recorded price, so that
        // externally-driven drift settles even when no trading happens.
        let baseline = self.nominal_value();

        self.audit_event(
            "rebalance_started",
            serde_json::json!({
                "caller": format!("{caller}"),
                "value_before": format!("{value_before}"),
            }),
        );

        let skipped = allocation::first_out_of_tolerance(&vals, value_before, &target, tolerance)
            .is_none();

        let mut trades = Vec::new();
        if !skipped {
            match path {
                TradePath::BestQuote => {
                    let plan = allocation::classify_drift(&vals, value_before, &target);
                    for planned in allocation::pair_trades(&plan) {
                        let exec = quote::execute_best(
                            &self.venues,
                            &planned.asset_in,
                            &planned.asset_out,
                            planned.amount_in,
                            self.params.min_out_bps,
                        )?;
                        self.apply_trade(&exec)?;
                        self.audit_event(
                            "trade_executed",
                            serde_json::json!({
                                "venue": exec.venue_index,
                                "asset_in": exec.asset_in.as_str(),
                                "asset_out": exec.asset_out.as_str(),
                                "amount_in": exec.amount_in.to_string(),
                                "amount_out": exec.amount_out.to_string(),
                            }),
                        );
                        trades.push(exec);
                    }
                }
                TradePath::Route(route) => {
                    let current: Vec<(AssetId, u128)> = self
                        .holdings
                        .iter()
                        .map(|(a, b)| (*a, *b))
                        .collect();
                    let after = route
                        .execute_route(&current)
                        .map_err(|source| VaultError::Venue { index: 0, source })?;
                    self.holdings = after.into_iter().filter(|(_, b)| *b > 0).collect();
                }
            }
        }

        let (vals_after, value_after) = self.valuations()?;

        // Value-loss budget relative to the pre-trade total.
        if value_after < value_before {
            let budget = value_before.bps(self.params.max_value_loss_bps);
            if value_before.0 - value_after.0 > budget.0 {
                return Err(VaultError::ValueLossExceeded {
                    before: value_before,
                    after: value_after,
                    budget_bps: self.params.max_value_loss_bps,
                });
            }
        }

        // Post-trade weights must land inside tolerance.
        if let Some((asset, weight_bps, target_bps)) =
            allocation::first_out_of_tolerance(&vals_after, value_after, &target, tolerance)
        {
            return Err(VaultError::AllocationOutOfTolerance {
                asset,
                weight_bps,
                target_bps,
            });
        }

        let settlement = self.settle_fees(caller, baseline, value_after)?;

        // Final stored price over the post-settlement supply.
        self.state.share_price = price_for(value_after, self.ledger.total_supply());

        info!(
            "rebalance by {caller}: {value_before} -> {value_after}, {} trades{}",
            trades.len(),
            if skipped { " (within tolerance)" } else { "" },
        );
        self.audit_event(
            "rebalance_completed",
            serde_json::json!({
                "value_after": format!("{value_after}"),
                "trades": trades.len(),
                "skipped": skipped,
            }),
        );

        Ok(RebalanceReport {
            value_before,
            value_after,
            trades,
            settlement,
            skipped,
        })
    }

    fn apply_trade(&mut self, exec: &TradeExecution) -> Result<()> {
        let held_in = self.holdings_of(&exec.asset_in);
        debug_assert!(
            held_in >= exec.amount_in,
            "planned trade exceeds holdings of {}",
            exec.asset_in
        );
        if held_in < exec.amount_in {
            return Err(VaultError::InsufficientHoldings {
                asset: exec.asset_in,
                requested: exec.amount_in,
                available: held_in,
            });
        }
        self.set_holding(exec.asset_in, held_in - exec.amount_in);
        let held_out = self.holdings_of(&exec.asset_out);
        self.set_holding(exec.asset_out, held_out + exec.amount_out);
        Ok(())
    }

    /// Settle gain/loss between platform, manager, and caller at the
    /// post-operation share price.
    fn settle_fees(&mut self, caller: HolderId, baseline: Usd, value_after: Usd) -> Result<Settlement> {
        let price_after = price_for(value_after, self.ledger.total_supply());

        let platform_fee = if value_after > baseline {
            self.oracle.compute_fee(value_after.saturating_sub(baseline))
        } else {
            Usd::ZERO
        };

        let settlement = fees::settle(
            baseline,
            value_after,
            price_after,
            platform_fee,
            &self.params.fee,
            self.is_manager_accountable(),
            self.ledger.balance_of(&self.manager),
        );

        self.ledger.mint(self.platform, settlement.platform_shares);
        self.ledger.mint(self.manager, settlement.owner_shares);
        self.ledger.mint(caller, settlement.caller_shares);
        self.ledger.burn_up_to(self.manager, settlement.manager_burn);

        if !settlement.is_noop() {
            self.audit_event(
                "fees_settled",
                serde_json::json!({
                    "gain": format!("{}", settlement.gain),
                    "loss": format!("{}", settlement.loss),
                    "platform_shares": settlement.platform_shares.to_string(),
                    "owner_shares": settlement.owner_shares.to_string(),
                    "caller_shares": settlement.caller_shares.to_string(),
                    "manager_burn": settlement.manager_burn.to_string(),
                }),
            );
        }
        Ok(settlement)
    }

    fn set_pause_flag(
        &mut self,
        caller: HolderId,
        set: impl FnOnce(&mut VaultState, bool),
        value: bool,
        event: &'static str,
    ) -> Result<()> {
        self.guarded(|eng| {
            eng.require_manager(caller)?;
            eng.require_accountable()?;
            set(&mut eng.state, value);
            eng.audit_event(event, serde_json::json!({}));
            Ok(())
        })
    }

    fn audit_event(&mut self, event: &'static str, data: serde_json::Value) {
        if let Some(log) = &mut self.audit {
            if let Err(e) = log.log(event, data) {
                warn!("audit write failed: {e}");
            }
        }
    }

    // Snapshot plumbing lives in `persist`; these expose the pieces.

    pub(crate) fn snapshot_parts(
        &self,
    ) -> (
        &ShareLedger,
        &FxHashMap<AssetId, u128>,
        &VaultState,
        Option<&TargetAllocation>,
        Option<AccountabilityPolicy>,
        HolderId,
        HolderId,
        &VaultParams,
    ) {
        (
            &self.ledger,
            &self.holdings,
            &self.state,
            self.target.as_ref(),
            self.accountability,
            self.manager,
            self.platform,
            &self.params,
        )
    }

    pub(crate) fn restore_parts(
        oracle: O,
        ledger: ShareLedger,
        holdings: FxHashMap<AssetId, u128>,
        state: VaultState,
        target: Option<TargetAllocation>,
        accountability: Option<AccountabilityPolicy>,
        manager: HolderId,
        platform: HolderId,
        params: VaultParams,
    ) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            oracle,
            manager,
            platform,
            params,
            accountability,
            target,
            venues: Vec::new(),
            ledger,
            holdings,
            state,
            audit: None,
            entered: false,
        })
    }
}
