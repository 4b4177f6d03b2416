// Allow our dollar.micros digit grouping convention (e.g., 1000_000000 = $1000)
#![allow(clippy::inconsistent_digit_grouping)]

//! End-to-end vault scenarios: deposits, redemptions, drift-correcting
//! rebalances, venue failover, and fee settlement, run against mock oracle
//! and venues.

use std::sync::Arc;

use nanovault::mock::{MockOracle, MockVenue};
use nanovault::{
    AccountabilityPolicy, AssetId, AuditLog, HolderId, RouteExecutor, TargetAllocation, Usd,
    VaultEngine, VaultError, VaultParams, VenueConfig, VenueError, shares,
};

fn weth() -> AssetId {
    AssetId::new("WETH")
}
fn usdc() -> AssetId {
    AssetId::new("USDC")
}

fn manager() -> HolderId {
    HolderId(1)
}
fn platform() -> HolderId {
    HolderId(0)
}
fn alice() -> HolderId {
    HolderId(10)
}
fn bob() -> HolderId {
    HolderId(11)
}

/// Both assets at $1.00 with 6 decimals, so native units read as micro-USD.
fn dollar_oracle() -> MockOracle {
    MockOracle::builder()
        .with_asset(weth(), Usd::dollars(1), 6)
        .with_asset(usdc(), Usd::dollars(1), 6)
        .build()
}

fn fifty_fifty() -> TargetAllocation {
    TargetAllocation::from_pairs(&[(weth(), 5000), (usdc(), 5000)]).unwrap()
}

fn dollar_venue(haircut_bps: u32) -> Arc<MockVenue> {
    Arc::new(
        MockVenue::builder()
            .with_asset(weth(), Usd::dollars(1), 6)
            .with_asset(usdc(), Usd::dollars(1), 6)
            .haircut_bps(haircut_bps)
            .build(),
    )
}

fn attach(vault: &mut VaultEngine<&MockOracle>, venue: &Arc<MockVenue>) -> usize {
    vault
        .add_venue(
            manager(),
            VenueConfig::new(Box::new(Arc::clone(venue)), Box::new(Arc::clone(venue))),
        )
        .unwrap()
}

// ============================================================================
// Share fairness
// ============================================================================

#[test]
fn two_depositors_split_the_vault_proportionally() {
    let oracle = dollar_oracle();
    let mut vault =
        VaultEngine::new(&oracle, manager(), platform(), VaultParams::default()).unwrap();

    vault.deposit(alice(), weth(), 750_000000).unwrap();
    vault.deposit(bob(), usdc(), 250_000000).unwrap();

    assert_eq!(vault.total_supply(), shares(1000));
    assert_eq!(vault.balance_of(&alice()), shares(750));
    assert_eq!(vault.balance_of(&bob()), shares(250));

    // Bob exits with a quarter of each physical holding
    let payouts = vault.redeem(bob(), shares(250)).unwrap();
    let weth_out: u128 = payouts
        .iter()
        .filter(|p| p.asset == weth())
        .map(|p| p.amount)
        .sum();
    let usdc_out: u128 = payouts
        .iter()
        .filter(|p| p.asset == usdc())
        .map(|p| p.amount)
        .sum();
    assert_eq!(weth_out, 187_500000);
    assert_eq!(usdc_out, 62_500000);
    assert_eq!(vault.total_supply(), shares(750));
}

#[test]
fn later_depositor_pays_the_current_share_price() {
    let oracle = dollar_oracle();
    let mut vault =
        VaultEngine::new(&oracle, manager(), platform(), VaultParams::default()).unwrap();

    vault.deposit(alice(), weth(), 1000_000000).unwrap();

    // WETH doubles; an interim deposit records the new price
    oracle.set_price(weth(), Usd::dollars(2));
    vault.deposit(bob(), usdc(), 1_000000).unwrap();
    assert!(vault.share_price() > Usd::dollars(1));

    // Bob's next $1001 buys fewer than 1001 shares
    let price = vault.share_price();
    let minted = vault.deposit(bob(), usdc(), 1001_000000).unwrap();
    assert_eq!(minted, 1001_000000 * 1_000000 / price.0);
    assert!(minted < shares(1001));
}

// ============================================================================
// Drift correction through venues
// ============================================================================

#[test]
fn seventy_thirty_rebalances_to_target_through_lossy_venue() {
    let oracle = dollar_oracle();
    let mut vault = VaultEngine::new(&oracle, manager(), platform(), VaultParams::default())
        .unwrap()
        .with_target(fifty_fifty())
        .with_accountability(AccountabilityPolicy { min_owner_bps: 100 });

    vault.deposit(manager(), weth(), 100_000000).unwrap();
    vault.deposit(alice(), weth(), 600_000000).unwrap();
    vault.deposit(alice(), usdc(), 300_000000).unwrap();

    // Venue quotes A->B at 0.98: the $200 correction loses $4 (40 bps),
    // inside the default 50 bps budget
    let venue = dollar_venue(200);
    attach(&mut vault, &venue);

    let report = vault.rebalance_by_best_quote(alice()).unwrap();
    assert!(!report.skipped);
    assert_eq!(report.trades.len(), 1);
    assert_eq!(report.trades[0].amount_in, 200_000000);
    assert_eq!(report.trades[0].amount_out, 196_000000);
    assert_eq!(vault.holdings_of(&weth()), 500_000000);
    assert_eq!(vault.holdings_of(&usdc()), 496_000000);

    // The $4 loss penalizes the accountable manager: 1.5% of the loss,
    // converted at the post-trade price of $0.996
    assert_eq!(report.settlement.loss, Usd::dollars(4));
    assert_eq!(report.settlement.manager_burn, 60_240);
    assert_eq!(vault.balance_of(&manager()), shares(100) - 60_240);

    // Everything landed within tolerance
    for (asset, weight) in vault.current_allocation().unwrap() {
        let target = fifty_fifty().weight_bps(&asset);
        assert!(weight.abs_diff(target) <= 200, "{asset} at {weight} bps");
    }
}

#[test]
fn best_quote_wins_across_venues_and_failures_are_skipped() {
    let oracle = dollar_oracle();
    let mut vault = VaultEngine::new(&oracle, manager(), platform(), VaultParams::default())
        .unwrap()
        .with_target(fifty_fifty());

    vault.deposit(alice(), weth(), 700_000000).unwrap();
    vault.deposit(alice(), usdc(), 300_000000).unwrap();

    let broken = Arc::new(
        MockVenue::builder()
            .with_asset(weth(), Usd::dollars(1), 6)
            .with_asset(usdc(), Usd::dollars(1), 6)
            .quote_fails()
            .build(),
    );
    let lossy = dollar_venue(100);
    let lossless = dollar_venue(0);
    attach(&mut vault, &broken);
    attach(&mut vault, &lossy);
    let winner_index = attach(&mut vault, &lossless);

    let report = vault.rebalance_by_best_quote(alice()).unwrap();
    assert_eq!(report.trades[0].venue_index, winner_index);
    assert!(lossy.executed_trades().is_empty());
    assert_eq!(lossless.executed_trades().len(), 1);
    assert_eq!(vault.holdings_of(&usdc()), 500_000000);
}

#[test]
fn rebalance_within_tolerance_is_a_trade_free_pass() {
    let oracle = dollar_oracle();
    let mut vault = VaultEngine::new(&oracle, manager(), platform(), VaultParams::default())
        .unwrap()
        .with_target(fifty_fifty());

    // 51/49: within the ±200 bps tolerance
    vault.deposit(alice(), weth(), 510_000000).unwrap();
    vault.deposit(alice(), usdc(), 490_000000).unwrap();

    // No venues attached at all — a skipped pass never needs a quote
    let report = vault.rebalance_by_best_quote(alice()).unwrap();
    assert!(report.skipped);
    assert!(report.trades.is_empty());
    assert_eq!(vault.holdings_of(&weth()), 510_000000);
}

#[test]
fn second_rebalance_right_after_the_first_skips() {
    let oracle = dollar_oracle();
    let mut vault = VaultEngine::new(&oracle, manager(), platform(), VaultParams::default())
        .unwrap()
        .with_target(fifty_fifty());
    vault.deposit(alice(), weth(), 700_000000).unwrap();
    vault.deposit(alice(), usdc(), 300_000000).unwrap();
    let venue = dollar_venue(0);
    attach(&mut vault, &venue);

    let first = vault.rebalance_by_best_quote(alice()).unwrap();
    assert!(!first.skipped);

    let second = vault.rebalance_by_best_quote(alice()).unwrap();
    assert!(second.skipped);
    assert_eq!(venue.executed_trades().len(), 1);
}

// ============================================================================
// All-or-nothing aborts
// ============================================================================

#[test]
fn value_loss_over_budget_reverts_everything() {
    let oracle = dollar_oracle();
    let mut vault = VaultEngine::new(&oracle, manager(), platform(), VaultParams::default())
        .unwrap()
        .with_target(fifty_fifty());

    vault.deposit(alice(), weth(), 700_000000).unwrap();
    vault.deposit(alice(), usdc(), 300_000000).unwrap();

    // 5% haircut: the $200 correction loses $10 (100 bps > 50 bps budget)
    let venue = dollar_venue(500);
    attach(&mut vault, &venue);

    let err = vault.rebalance_by_best_quote(alice()).unwrap_err();
    assert!(matches!(err, VaultError::ValueLossExceeded { .. }));

    // Holdings, supply, and price are exactly as before the attempt
    assert_eq!(vault.holdings_of(&weth()), 700_000000);
    assert_eq!(vault.holdings_of(&usdc()), 300_000000);
    assert_eq!(vault.total_supply(), shares(1000));
    assert_eq!(vault.share_price(), Usd::dollars(1));
}

#[test]
fn residual_drift_after_trading_reverts_even_on_a_gain() {
    let oracle = dollar_oracle();
    let mut vault = VaultEngine::new(&oracle, manager(), platform(), VaultParams::default())
        .unwrap()
        .with_target(fifty_fifty());

    vault.deposit(alice(), weth(), 700_000000).unwrap();
    vault.deposit(alice(), usdc(), 300_000000).unwrap();

    // The venue prices WETH at double the oracle: selling $200 of WETH
    // delivers $400 of USDC. Total value grows, but USDC overshoots to
    // 700/1200 = 58% — still out of tolerance, so the pass reverts.
    let venue = Arc::new(
        MockVenue::builder()
            .with_asset(weth(), Usd::dollars(2), 6)
            .with_asset(usdc(), Usd::dollars(1), 6)
            .build(),
    );
    attach(&mut vault, &venue);

    let err = vault.rebalance_by_best_quote(alice()).unwrap_err();
    assert!(matches!(err, VaultError::AllocationOutOfTolerance { .. }));
    assert_eq!(vault.holdings_of(&weth()), 700_000000);
    assert_eq!(vault.holdings_of(&usdc()), 300_000000);
}

#[test]
fn all_venues_down_aborts_cleanly() {
    let oracle = dollar_oracle();
    let mut vault = VaultEngine::new(&oracle, manager(), platform(), VaultParams::default())
        .unwrap()
        .with_target(fifty_fifty());
    vault.deposit(alice(), weth(), 700_000000).unwrap();
    vault.deposit(alice(), usdc(), 300_000000).unwrap();

    let broken = Arc::new(
        MockVenue::builder()
            .with_asset(weth(), Usd::dollars(1), 6)
            .with_asset(usdc(), Usd::dollars(1), 6)
            .quote_fails()
            .build(),
    );
    attach(&mut vault, &broken);

    let err = vault.rebalance_by_best_quote(alice()).unwrap_err();
    assert!(matches!(err, VaultError::NoQuoteAvailable { .. }));
    assert_eq!(vault.holdings_of(&weth()), 700_000000);
    assert_eq!(vault.total_supply(), shares(1000));
}

// ============================================================================
// Route-based rebalancing
// ============================================================================

/// Opaque aggregator stand-in: hands back a fixed post-trade book.
struct FixedRoute {
    result: Vec<(AssetId, u128)>,
}

impl RouteExecutor for FixedRoute {
    fn execute_route(
        &self,
        _holdings: &[(AssetId, u128)],
    ) -> Result<Vec<(AssetId, u128)>, VenueError> {
        Ok(self.result.clone())
    }
}

#[test]
fn route_rebalance_is_subject_to_the_same_checks() {
    let oracle = dollar_oracle();
    let mut vault = VaultEngine::new(&oracle, manager(), platform(), VaultParams::default())
        .unwrap()
        .with_target(fifty_fifty());
    vault.deposit(alice(), weth(), 700_000000).unwrap();
    vault.deposit(alice(), usdc(), 300_000000).unwrap();

    // A good route lands on target with no value loss
    let good = FixedRoute {
        result: vec![(weth(), 500_000000), (usdc(), 500_000000)],
    };
    let report = vault.rebalance_by_route(alice(), &good).unwrap();
    assert!(!report.skipped);
    assert!(report.trades.is_empty());
    assert_eq!(vault.holdings_of(&weth()), 500_000000);

    // Drift back out, then a route that burns 10% of the vault must revert
    oracle.set_price(weth(), Usd::dollars(2));
    let bad = FixedRoute {
        result: vec![(weth(), 300_000000), (usdc(), 500_000000)],
    };
    let err = vault.rebalance_by_route(alice(), &bad).unwrap_err();
    assert!(matches!(err, VaultError::ValueLossExceeded { .. }));
    assert_eq!(vault.holdings_of(&weth()), 500_000000);
    assert_eq!(vault.holdings_of(&usdc()), 500_000000);
}

// ============================================================================
// Fee settlement
// ============================================================================

#[test]
fn external_gain_settles_fees_even_without_trading() {
    let oracle = MockOracle::builder()
        .with_asset(usdc(), Usd::dollars(1), 6)
        .platform_fee_bps(100)
        .build();
    let target = TargetAllocation::from_pairs(&[(usdc(), 10_000)]).unwrap();
    let mut vault = VaultEngine::new(&oracle, manager(), platform(), VaultParams::default())
        .unwrap()
        .with_target(target);

    vault.deposit(alice(), usdc(), 1000_000000).unwrap();

    // USDC drifts to $1.10: $100 of gain since the last recorded price
    oracle.set_price(usdc(), Usd(1_100000));
    let report = vault.rebalance_by_best_quote(alice()).unwrap();
    assert!(report.skipped);
    assert_eq!(report.settlement.gain, Usd::dollars(100));

    // $1 platform fee, $1 manager fee, $0.50 caller fee, all converted at
    // the post-operation price of $1.10
    assert_eq!(report.settlement.platform_shares, 909_090);
    assert_eq!(report.settlement.owner_shares, 909_090);
    assert_eq!(report.settlement.caller_shares, 454_545);
    assert_eq!(vault.balance_of(&platform()), 909_090);
    assert_eq!(vault.balance_of(&manager()), 909_090);
    assert_eq!(vault.balance_of(&alice()), shares(1000) + 454_545);
}

#[test]
fn unaccountable_manager_forfeits_the_gain_fee() {
    let oracle = MockOracle::builder()
        .with_asset(usdc(), Usd::dollars(1), 6)
        .build();
    let target = TargetAllocation::from_pairs(&[(usdc(), 10_000)]).unwrap();
    let mut vault = VaultEngine::new(&oracle, manager(), platform(), VaultParams::default())
        .unwrap()
        .with_target(target)
        .with_accountability(AccountabilityPolicy { min_owner_bps: 100 });

    // Manager holds nothing: not accountable once supply exists
    vault.deposit(alice(), usdc(), 1000_000000).unwrap();
    assert!(!vault.is_manager_accountable());

    oracle.set_price(usdc(), Usd(1_100000));
    let report = vault.rebalance_by_best_quote(alice()).unwrap();
    assert_eq!(report.settlement.owner_shares, 0);
    assert!(report.settlement.caller_shares > 0);
    assert_eq!(vault.balance_of(&manager()), 0);
}

// ============================================================================
// Pause controls
// ============================================================================

#[test]
fn rebalance_pause_blocks_only_rebalancing() {
    let oracle = dollar_oracle();
    let mut vault = VaultEngine::new(&oracle, manager(), platform(), VaultParams::default())
        .unwrap()
        .with_target(fifty_fifty());
    vault.deposit(alice(), weth(), 700_000000).unwrap();
    vault.deposit(alice(), usdc(), 300_000000).unwrap();

    vault.pause_rebalancing(manager()).unwrap();
    assert!(matches!(
        vault.rebalance_by_best_quote(alice()),
        Err(VaultError::RebalancingPaused)
    ));

    // Deposits and redemptions keep flowing
    vault.deposit(bob(), usdc(), 10_000000).unwrap();
    vault.redeem(bob(), shares(10)).unwrap();

    vault.unpause_rebalancing(manager()).unwrap();
    let venue = dollar_venue(0);
    attach(&mut vault, &venue);
    vault.rebalance_by_best_quote(alice()).unwrap();
}

// ============================================================================
// Audit trail
// ============================================================================

#[test]
fn audit_trail_records_the_event_sequence() {
    let oracle = dollar_oracle();
    let mut vault = VaultEngine::new(&oracle, manager(), platform(), VaultParams::default())
        .unwrap()
        .with_target(fifty_fifty());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    vault.attach_audit(AuditLog::open(&path).unwrap());

    vault.deposit(alice(), weth(), 700_000000).unwrap();
    vault.deposit(alice(), usdc(), 300_000000).unwrap();
    let venue = dollar_venue(0);
    attach(&mut vault, &venue);
    vault.rebalance_by_best_quote(alice()).unwrap();

    // Drift out again, then a pass so lossy it must revert
    oracle.set_price(weth(), Usd::dollars(2));
    venue.set_haircut_bps(500);
    assert!(matches!(
        vault.rebalance_by_best_quote(alice()),
        Err(VaultError::ValueLossExceeded { .. })
    ));

    let contents = std::fs::read_to_string(&path).unwrap();
    let events: Vec<String> = contents
        .lines()
        .map(|line| {
            let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
            parsed["event"].as_str().unwrap().to_owned()
        })
        .collect();
    assert_eq!(
        events,
        vec![
            "deposit",
            "deposit",
            "venue_added",
            "rebalance_started",
            "trade_executed",
            "rebalance_completed",
            "rebalance_started",
            "trade_executed",
            "rebalance_aborted",
        ]
    );

    // The aborted pass recorded its reason alongside the event
    let last: serde_json::Value =
        serde_json::from_str(contents.lines().last().unwrap()).unwrap();
    assert!(last["reason"].as_str().unwrap().contains("value loss"));
}

#[test]
fn disabled_venue_is_ignored_until_reenabled() {
    let oracle = dollar_oracle();
    let mut vault = VaultEngine::new(&oracle, manager(), platform(), VaultParams::default())
        .unwrap()
        .with_target(fifty_fifty());
    vault.deposit(alice(), weth(), 700_000000).unwrap();
    vault.deposit(alice(), usdc(), 300_000000).unwrap();

    let venue = dollar_venue(0);
    let index = attach(&mut vault, &venue);
    vault.set_venue_enabled(manager(), index, false).unwrap();

    assert!(matches!(
        vault.rebalance_by_best_quote(alice()),
        Err(VaultError::NoQuoteAvailable { .. })
    ));

    vault.set_venue_enabled(manager(), index, true).unwrap();
    vault.rebalance_by_best_quote(alice()).unwrap();
}
