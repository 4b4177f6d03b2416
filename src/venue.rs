//! Trading venue seams: quoter and executor traits, per-engine venue table.
//!
//! Each venue is an opaque external counterparty offering best-effort quotes
//! and trade execution. Venue configuration is owned by the engine instance
//! (never process-wide) so multiple vaults can run side by side.

use std::sync::Arc;

use crate::types::AssetId;

/// Errors surfaced by a venue adapter.
#[derive(Debug, thiserror::Error)]
pub enum VenueError {
    /// The quoter could not produce a quote (network, unsupported pair, ...).
    /// Best-quote selection skips the venue; this never aborts the call.
    #[error("quote unavailable: {0}")]
    QuoteUnavailable(String),

    #[error("execution failed: {0}")]
    Execution(String),

    /// The venue delivered less than the agreed minimum output.
    #[error("output {actual} below minimum {min_out}")]
    MinOutNotMet { min_out: u128, actual: u128 },
}

/// Best-effort price quoter for one venue.
pub trait VenueQuoter {
    /// Expected output amount (native units of `asset_out`) for swapping
    /// `amount_in` of `asset_in`. Errors are treated as "no quote".
    fn quote(
        &self,
        asset_in: &AssetId,
        asset_out: &AssetId,
        amount_in: u128,
    ) -> Result<u128, VenueError>;
}

/// Trade executor for one venue.
///
/// Takes `&self`: adapters needing mutation use interior mutability, the same
/// contract a live exchange connection has. An executor is expected to be
/// transactional per call — either the full swap happens or an error returns
/// with no effect.
pub trait VenueExecutor {
    /// Execute the swap, enforcing `min_amount_out`. Returns the delivered
    /// output amount. Any native-currency wrap/unwrap a venue needs is the
    /// adapter's concern; the engine only sees vault assets.
    fn execute(
        &self,
        asset_in: &AssetId,
        asset_out: &AssetId,
        amount_in: u128,
        min_amount_out: u128,
    ) -> Result<u128, VenueError>;
}

// Shared handles: lets one adapter object serve as both quoter and executor.
impl<T: VenueQuoter + ?Sized> VenueQuoter for Arc<T> {
    fn quote(
        &self,
        asset_in: &AssetId,
        asset_out: &AssetId,
        amount_in: u128,
    ) -> Result<u128, VenueError> {
        (**self).quote(asset_in, asset_out, amount_in)
    }
}

impl<T: VenueExecutor + ?Sized> VenueExecutor for Arc<T> {
    fn execute(
        &self,
        asset_in: &AssetId,
        asset_out: &AssetId,
        amount_in: u128,
        min_amount_out: u128,
    ) -> Result<u128, VenueError> {
        (**self).execute(asset_in, asset_out, amount_in, min_amount_out)
    }
}

/// One venue's entry in the engine's venue table. Owner-mutable at any time.
pub struct VenueConfig {
    pub quoter: Box<dyn VenueQuoter>,
    pub executor: Box<dyn VenueExecutor>,
    /// Venue fee-tier parameter, informational for adapters that need it.
    pub fee_tier_bps: u32,
    pub enabled: bool,
}

impl VenueConfig {
    pub fn new(quoter: Box<dyn VenueQuoter>, executor: Box<dyn VenueExecutor>) -> Self {
        Self {
            quoter,
            executor,
            fee_tier_bps: 0,
            enabled: true,
        }
    }

    pub fn with_fee_tier(mut self, fee_tier_bps: u32) -> Self {
        self.fee_tier_bps = fee_tier_bps;
        self
    }
}

impl std::fmt::Debug for VenueConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VenueConfig")
            .field("fee_tier_bps", &self.fee_tier_bps)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// Caller-supplied opaque trade route (e.g. an external aggregator path).
///
/// The route receives the vault's current holdings and returns the post-trade
/// holdings. The engine subjects the result to the same value-loss and
/// allocation-tolerance checks as best-quote rebalancing.
pub trait RouteExecutor {
    fn execute_route(
        &self,
        holdings: &[(AssetId, u128)],
    ) -> Result<Vec<(AssetId, u128)>, VenueError>;
}
