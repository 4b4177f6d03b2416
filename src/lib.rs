// Allow our dollar.micros digit grouping convention (e.g., 1000_000000 = $1000)
#![allow(clippy::inconsistent_digit_grouping)]

//! # nanovault
//!
//! A deterministic share-accounting and drift-correction engine for
//! multi-asset vaults.
//!
//! ## Features
//!
//! - **Proportional shares**: deposits mint, redemptions burn, and every
//!   holder's claim is their share fraction of the vault — fair at any price
//! - **Drift correction**: overweight assets fund underweight ones through
//!   deficit-proportional pairwise trades
//! - **Best-quote routing**: every enabled venue is quoted, failures are
//!   skipped, the best price wins under a minimum-output guard
//! - **Bounded loss**: a rebalance that costs more than the configured
//!   budget reverts in full — all-or-nothing, no partial commits
//! - **Fee settlement**: realized gain pays platform, manager, and caller;
//!   realized loss burns the manager's own stake
//! - **Fixed-point accounting**: integer micro-USD and micro-shares, no
//!   floating point anywhere in the money path
//!
//! ## Quick Start
//!
//! ```
//! use nanovault::mock::MockOracle;
//! use nanovault::{AssetId, HolderId, Usd, VaultEngine, VaultParams, shares};
//!
//! let oracle = MockOracle::builder()
//!     .with_asset(AssetId::new("WETH"), Usd::dollars(2000), 6)
//!     .with_asset(AssetId::new("USDC"), Usd::dollars(1), 6)
//!     .build();
//!
//! let manager = HolderId(1);
//! let platform = HolderId(0);
//! let mut vault = VaultEngine::new(&oracle, manager, platform, VaultParams::default()).unwrap();
//!
//! // First deposit mints at the initial $1.00 share price:
//! // 1.000000 WETH at $2000 is worth $2000 -> 2000 shares
//! let minted = vault.deposit(HolderId(10), AssetId::new("WETH"), 1_000000).unwrap();
//! assert_eq!(minted, shares(2000));
//! assert_eq!(vault.share_price(), Usd::dollars(1));
//! ```
//!
//! ## Rebalancing
//!
//! Give the engine a target allocation and at least one venue, and any
//! shareholder can trigger a drift correction:
//!
//! ```
//! use std::sync::Arc;
//! use nanovault::mock::{MockOracle, MockVenue};
//! use nanovault::{
//!     AssetId, HolderId, TargetAllocation, Usd, VaultEngine, VaultParams, VenueConfig,
//! };
//!
//! let weth = AssetId::new("WETH");
//! let usdc = AssetId::new("USDC");
//! let oracle = MockOracle::builder()
//!     .with_asset(weth, Usd::dollars(1), 6)
//!     .with_asset(usdc, Usd::dollars(1), 6)
//!     .build();
//!
//! let target = TargetAllocation::from_pairs(&[(weth, 5000), (usdc, 5000)]).unwrap();
//! let mut vault = VaultEngine::new(&oracle, HolderId(1), HolderId(0), VaultParams::default())
//!     .unwrap()
//!     .with_target(target);
//!
//! let venue = Arc::new(
//!     MockVenue::builder()
//!         .with_asset(weth, Usd::dollars(1), 6)
//!         .with_asset(usdc, Usd::dollars(1), 6)
//!         .build(),
//! );
//! vault
//!     .add_venue(
//!         HolderId(1),
//!         VenueConfig::new(Box::new(Arc::clone(&venue)), Box::new(Arc::clone(&venue))),
//!     )
//!     .unwrap();
//!
//! // 70/30 deposit against a 50/50 target
//! let alice = HolderId(10);
//! vault.deposit(alice, weth, 700_000000).unwrap();
//! vault.deposit(alice, usdc, 300_000000).unwrap();
//!
//! let report = vault.rebalance_by_best_quote(alice).unwrap();
//! assert!(!report.skipped);
//! assert_eq!(report.trades.len(), 1);
//! assert_eq!(vault.holdings_of(&weth), 500_000000);
//! assert_eq!(vault.holdings_of(&usdc), 500_000000);
//! ```
//!
//! ## Money Representation
//!
//! USD values are [`u128`] micro-dollars and shares are `u128` micro-shares:
//!
//! ```
//! use nanovault::Usd;
//!
//! let price = Usd(1_500000); // $1.50
//! assert_eq!(format!("{}", price), "$1.50");
//! ```

pub mod allocation;
pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod fees;
pub mod ledger;
pub mod mock;
pub mod oracle;
pub mod persist;
pub mod quote;
pub mod types;
pub mod venue;

pub use allocation::{TargetAllocation, TargetWeight};
pub use audit::AuditLog;
pub use config::VaultParams;
pub use engine::{AccountabilityPolicy, Payout, RebalanceReport, VaultEngine, VaultState};
pub use error::{Result, VaultError};
pub use fees::{FeeSplit, Settlement};
pub use ledger::ShareLedger;
pub use oracle::PriceOracle;
pub use persist::{VaultSnapshot, load_json, restore, save_json, take_snapshot};
pub use quote::{BestQuote, TradeExecution};
pub use types::{
    AssetId, BPS_DENOM, HolderId, INITIAL_SHARE_PRICE, SHARE_SCALE, Shares, USD_SCALE, Usd,
    WEIGHT_SUM_BPS, shares,
};
pub use venue::{RouteExecutor, VenueConfig, VenueError, VenueExecutor, VenueQuoter};
