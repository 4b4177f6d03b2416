//! Vault snapshots: serialize the full accounting state to JSON and restore
//! it against a live oracle.
//!
//! Snapshots are deterministic — ledger balances and holdings are written as
//! sorted pairs — so two snapshots of the same state are byte-identical
//! except for the timestamp. Venue tables and audit handles are runtime
//! wiring and are not captured; re-attach them after a restore.

use std::path::Path;

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::allocation::TargetAllocation;
use crate::config::VaultParams;
use crate::engine::{AccountabilityPolicy, VaultEngine, VaultState};
use crate::error::{Result, VaultError};
use crate::ledger::ShareLedger;
use crate::oracle::PriceOracle;
use crate::types::{AssetId, HolderId};

const SNAPSHOT_VERSION: u32 = 1;

/// A point-in-time capture of one vault's accounting state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultSnapshot {
    pub version: u32,
    pub taken_at: DateTime<Utc>,
    pub manager: HolderId,
    pub platform: HolderId,
    pub params: VaultParams,
    pub accountability: Option<AccountabilityPolicy>,
    pub target: Option<TargetAllocation>,
    pub ledger: ShareLedger,
    /// Holdings as sorted `(asset, amount)` pairs.
    pub holdings: Vec<(AssetId, u128)>,
    pub state: VaultState,
}

/// Capture the engine's current state.
pub fn take_snapshot<O: PriceOracle>(engine: &VaultEngine<O>) -> VaultSnapshot {
    let (ledger, holdings, state, target, accountability, manager, platform, params) =
        engine.snapshot_parts();

    let mut pairs: Vec<(AssetId, u128)> = holdings.iter().map(|(a, b)| (*a, *b)).collect();
    pairs.sort_by_key(|(a, _)| *a);

    VaultSnapshot {
        version: SNAPSHOT_VERSION,
        taken_at: Utc::now(),
        manager,
        platform,
        params: params.clone(),
        accountability,
        target: target.cloned(),
        ledger: ledger.clone(),
        holdings: pairs,
        state: state.clone(),
    }
}

/// Rebuild an engine from a snapshot against a live oracle. Venues and audit
/// logging start empty.
pub fn restore<O: PriceOracle>(oracle: O, snapshot: VaultSnapshot) -> Result<VaultEngine<O>> {
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(VaultError::Snapshot(format!(
            "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
            snapshot.version
        )));
    }

    let holdings: FxHashMap<AssetId, u128> = snapshot
        .holdings
        .into_iter()
        .filter(|(_, amount)| *amount > 0)
        .collect();

    VaultEngine::restore_parts(
        oracle,
        snapshot.ledger,
        holdings,
        snapshot.state,
        snapshot.target,
        snapshot.accountability,
        snapshot.manager,
        snapshot.platform,
        snapshot.params,
    )
}

/// Write a snapshot as pretty-printed JSON.
pub fn save_json(snapshot: &VaultSnapshot, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Read a snapshot back from JSON.
pub fn load_json(path: &Path) -> Result<VaultSnapshot> {
    let contents = std::fs::read_to_string(path)?;
    let snapshot: VaultSnapshot = serde_json::from_str(&contents)?;
    Ok(snapshot)
}
