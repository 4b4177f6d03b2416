//! Mock oracle and venue for testing — configurable behavior, no network.
//!
//! ```
//! use nanovault::mock::{MockOracle, MockVenue};
//! use nanovault::{AssetId, PriceOracle, Usd, VenueQuoter};
//!
//! let usdc = AssetId::new("USDC");
//! let dai = AssetId::new("DAI");
//! let oracle = MockOracle::builder()
//!     .with_asset(usdc, Usd::dollars(1), 6)
//!     .build();
//! assert!(oracle.is_operational());
//!
//! let venue = MockVenue::builder()
//!     .with_asset(usdc, Usd::dollars(1), 6)
//!     .with_asset(dai, Usd::dollars(1), 6)
//!     .haircut_bps(30)
//!     .build();
//! assert_eq!(venue.quote(&usdc, &dai, 100_000000).unwrap(), 99_700000);
//! ```

use std::sync::Mutex;

use crate::oracle::PriceOracle;
use crate::types::{AssetId, Usd};
use crate::venue::{VenueError, VenueExecutor, VenueQuoter};

#[derive(Clone, Copy)]
struct AssetEntry {
    price: Usd,
    decimals: u32,
}

struct OracleInner {
    operational: bool,
    assets: Vec<(AssetId, AssetEntry)>,
    fee_bps: u32,
}

/// Builder for [`MockOracle`].
pub struct MockOracleBuilder {
    inner: OracleInner,
}

impl MockOracleBuilder {
    pub fn with_asset(mut self, asset: AssetId, price: Usd, decimals: u32) -> Self {
        self.inner.assets.push((asset, AssetEntry { price, decimals }));
        self
    }

    pub fn operational(mut self, operational: bool) -> Self {
        self.inner.operational = operational;
        self
    }

    /// Platform fee policy: this many bps of any gain.
    pub fn platform_fee_bps(mut self, fee_bps: u32) -> Self {
        self.inner.fee_bps = fee_bps;
        self
    }

    pub fn build(self) -> MockOracle {
        MockOracle {
            inner: Mutex::new(self.inner),
        }
    }
}

/// A mock price oracle / registry with mutable prices and halt flag.
pub struct MockOracle {
    inner: Mutex<OracleInner>,
}

impl MockOracle {
    pub fn builder() -> MockOracleBuilder {
        MockOracleBuilder {
            inner: OracleInner {
                operational: true,
                assets: Vec::new(),
                fee_bps: 0,
            },
        }
    }

    pub fn set_price(&self, asset: AssetId, price: Usd) {
        let mut inner = self.inner.lock().unwrap();
        if let Some((_, entry)) = inner.assets.iter_mut().find(|(a, _)| *a == asset) {
            entry.price = price;
        }
    }

    pub fn set_operational(&self, operational: bool) {
        self.inner.lock().unwrap().operational = operational;
    }

    /// Drop an asset from the whitelist (it becomes sweepable residue).
    pub fn remove_asset(&self, asset: AssetId) {
        self.inner.lock().unwrap().assets.retain(|(a, _)| *a != asset);
    }

    fn entry(&self, asset: &AssetId) -> Option<AssetEntry> {
        self.inner
            .lock()
            .unwrap()
            .assets
            .iter()
            .find(|(a, _)| a == asset)
            .map(|(_, e)| *e)
    }
}

impl PriceOracle for MockOracle {
    fn is_operational(&self) -> bool {
        self.inner.lock().unwrap().operational
    }

    fn is_asset_accepted(&self, asset: &AssetId) -> bool {
        self.entry(asset).is_some()
    }

    fn price(&self, asset: &AssetId) -> Usd {
        self.entry(asset).map(|e| e.price).unwrap_or(Usd::ZERO)
    }

    fn decimals(&self, asset: &AssetId) -> u32 {
        self.entry(asset).map(|e| e.decimals).unwrap_or(0)
    }

    fn accepted_assets(&self) -> Vec<AssetId> {
        self.inner
            .lock()
            .unwrap()
            .assets
            .iter()
            .map(|(a, _)| *a)
            .collect()
    }

    fn compute_fee(&self, raw: Usd) -> Usd {
        raw.bps(self.inner.lock().unwrap().fee_bps)
    }
}

/// A swap recorded by [`MockVenue`] for assertion in tests.
#[derive(Debug, Clone)]
pub struct ExecutedTrade {
    pub asset_in: AssetId,
    pub asset_out: AssetId,
    pub amount_in: u128,
    pub amount_out: u128,
    pub min_out: u128,
}

struct VenueInner {
    assets: Vec<(AssetId, AssetEntry)>,
    haircut_bps: u32,
    quote_fails: bool,
    execute_fails: bool,
    executed: Vec<ExecutedTrade>,
}

/// Builder for [`MockVenue`].
pub struct MockVenueBuilder {
    inner: VenueInner,
}

impl MockVenueBuilder {
    pub fn with_asset(mut self, asset: AssetId, price: Usd, decimals: u32) -> Self {
        self.inner.assets.push((asset, AssetEntry { price, decimals }));
        self
    }

    /// Value lost per swap: `quote = value_in * (10000 - haircut) / 10000`.
    /// A 200 bps haircut quotes A→B at 0.98.
    pub fn haircut_bps(mut self, haircut_bps: u32) -> Self {
        self.inner.haircut_bps = haircut_bps;
        self
    }

    pub fn quote_fails(mut self) -> Self {
        self.inner.quote_fails = true;
        self
    }

    pub fn execute_fails(mut self) -> Self {
        self.inner.execute_fails = true;
        self
    }

    pub fn build(self) -> MockVenue {
        MockVenue {
            inner: Mutex::new(self.inner),
        }
    }
}

/// A mock venue serving as both quoter and executor. Quotes convert through
/// its own price table minus a flat haircut, and executions are recorded.
pub struct MockVenue {
    inner: Mutex<VenueInner>,
}

impl MockVenue {
    pub fn builder() -> MockVenueBuilder {
        MockVenueBuilder {
            inner: VenueInner {
                assets: Vec::new(),
                haircut_bps: 0,
                quote_fails: false,
                execute_fails: false,
                executed: Vec::new(),
            },
        }
    }

    pub fn set_haircut_bps(&self, haircut_bps: u32) {
        self.inner.lock().unwrap().haircut_bps = haircut_bps;
    }

    pub fn set_quote_fails(&self, fails: bool) {
        self.inner.lock().unwrap().quote_fails = fails;
    }

    /// All swaps executed so far (for assertion in tests).
    pub fn executed_trades(&self) -> Vec<ExecutedTrade> {
        self.inner.lock().unwrap().executed.clone()
    }

    fn convert(&self, asset_in: &AssetId, asset_out: &AssetId, amount_in: u128) -> Result<u128, VenueError> {
        let inner = self.inner.lock().unwrap();
        let lookup = |asset: &AssetId| {
            inner
                .assets
                .iter()
                .find(|(a, _)| a == asset)
                .map(|(_, e)| *e)
                .ok_or_else(|| VenueError::QuoteUnavailable(format!("unknown asset {asset}")))
        };
        let entry_in = lookup(asset_in)?;
        let entry_out = lookup(asset_out)?;
        if entry_out.price.is_zero() {
            return Err(VenueError::QuoteUnavailable(format!("no price for {asset_out}")));
        }

        let value_in = amount_in * entry_in.price.0 / 10u128.pow(entry_in.decimals);
        let value_out = value_in * (10_000 - inner.haircut_bps as u128) / 10_000;
        Ok(value_out * 10u128.pow(entry_out.decimals) / entry_out.price.0)
    }
}

impl VenueQuoter for MockVenue {
    fn quote(
        &self,
        asset_in: &AssetId,
        asset_out: &AssetId,
        amount_in: u128,
    ) -> Result<u128, VenueError> {
        if self.inner.lock().unwrap().quote_fails {
            return Err(VenueError::QuoteUnavailable("mock: quoter offline".into()));
        }
        self.convert(asset_in, asset_out, amount_in)
    }
}

impl VenueExecutor for MockVenue {
    fn execute(
        &self,
        asset_in: &AssetId,
        asset_out: &AssetId,
        amount_in: u128,
        min_amount_out: u128,
    ) -> Result<u128, VenueError> {
        if self.inner.lock().unwrap().execute_fails {
            return Err(VenueError::Execution("mock: execution rejected".into()));
        }
        let amount_out = self.convert(asset_in, asset_out, amount_in)?;
        if amount_out < min_amount_out {
            return Err(VenueError::MinOutNotMet {
                min_out: min_amount_out,
                actual: amount_out,
            });
        }
        self.inner.lock().unwrap().executed.push(ExecutedTrade {
            asset_in: *asset_in,
            asset_out: *asset_out,
            amount_in,
            amount_out,
            min_out: min_amount_out,
        });
        Ok(amount_out)
    }
}
