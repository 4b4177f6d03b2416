//! Error types for the vault engine.
//!
//! Every failure is an atomic rollback: nothing partially commits, and there
//! are no internal retries. Variants carry enough structured detail (asset,
//! before/after values) for the caller to decide whether a retry with
//! different parameters is worthwhile.

use std::path::PathBuf;

use crate::types::{AssetId, HolderId, Usd};

/// All errors that can surface from vault operations.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// The external platform registry reports a halt; checked first in every
    /// mutating call.
    #[error("platform halted")]
    PlatformHalted,

    #[error("vault is paused")]
    Paused,

    #[error("rebalancing is paused")]
    RebalancingPaused,

    /// A top-level call re-entered the engine while another was in flight.
    #[error("reentrant call rejected")]
    ReentrantCall,

    /// Asset is not oracle-accepted, or its quoted price is zero.
    #[error("invalid asset: {asset}")]
    InvalidAsset { asset: AssetId },

    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// The deposit value rounds to zero shares at the current share price.
    #[error("deposit of {value} mints zero shares at price {share_price}")]
    ZeroShares { value: Usd, share_price: Usd },

    #[error("{holder} has {available} shares, requested {requested}")]
    InsufficientBalance {
        holder: HolderId,
        requested: u128,
        available: u128,
    },

    /// Bad weight sum, duplicate asset, zero weight, or empty table; the
    /// whole allocation is rejected.
    #[error("invalid target allocation: {0}")]
    AllocationInvalid(String),

    /// No enabled venue produced a positive quote for this trade.
    #[error("no quote available for {amount_in} {asset_in} -> {asset_out}")]
    NoQuoteAvailable {
        asset_in: AssetId,
        asset_out: AssetId,
        amount_in: u128,
    },

    /// The rebalance dropped total value past the slippage budget.
    #[error("value loss exceeded: {before} -> {after} (budget {budget_bps} bps)")]
    ValueLossExceeded {
        before: Usd,
        after: Usd,
        budget_bps: u32,
    },

    /// Post-trade weights are still outside tolerance; the rebalance reverted.
    #[error("{asset} still at {weight_bps} bps vs target {target_bps} bps after rebalance")]
    AllocationOutOfTolerance {
        asset: AssetId,
        weight_bps: u32,
        target_bps: u32,
    },

    /// Privileged call while the manager's stake is under threshold.
    #[error("manager holds {holder_bps} bps of supply, {required_bps} bps required")]
    Unaccountable { holder_bps: u32, required_bps: u32 },

    /// Sweep attempted on an oracle-accepted asset.
    #[error("sweep not allowed for accepted asset {asset}")]
    SweepNotAllowed { asset: AssetId },

    #[error("vault holds {available} {asset}, requested {requested}")]
    InsufficientHoldings {
        asset: AssetId,
        requested: u128,
        available: u128,
    },

    /// Rebalance requested on an engine constructed without a target table.
    #[error("no target allocation configured")]
    NoTargetAllocation,

    #[error("caller is not the vault manager")]
    NotManager,

    #[error("caller holds no shares")]
    NotAHolder,

    #[error("venue {index} error: {source}")]
    Venue {
        index: usize,
        source: crate::venue::VenueError,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("snapshot serialization: {0}")]
    SnapshotJson(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VaultError>;
