//! Price oracle and asset registry seam.
//!
//! The oracle is an external collaborator: it owns asset acceptance, unit
//! prices, the platform-halt flag, and the platform fee policy. The engine
//! only consumes this trait; [`crate::mock::MockOracle`] implements it for
//! tests.

use crate::types::{AssetId, Usd};

/// External price oracle and whitelist registry.
pub trait PriceOracle {
    /// Whether the platform is operational. Checked first in every mutating
    /// engine call.
    fn is_operational(&self) -> bool;

    /// Whether the registry accepts this asset for deposit and valuation.
    fn is_asset_accepted(&self, asset: &AssetId) -> bool;

    /// Unit price in micro-USD per whole unit of the asset. A zero price for
    /// a held asset is a hard failure upstream, never silently skipped.
    fn price(&self, asset: &AssetId) -> Usd;

    /// Decimal precision of the asset's native unit (e.g. 6 for USDC).
    fn decimals(&self, asset: &AssetId) -> u32;

    /// Every currently accepted asset. Redeem pays out pro-rata over this
    /// whole set, not just target-allocation members.
    fn accepted_assets(&self) -> Vec<AssetId>;

    /// Platform fee charged on a raw gain value.
    fn compute_fee(&self, raw: Usd) -> Usd;
}

// Allow tests (and embedders) to keep a handle on the oracle while the
// engine borrows it.
impl<O: PriceOracle + ?Sized> PriceOracle for &O {
    fn is_operational(&self) -> bool {
        (**self).is_operational()
    }

    fn is_asset_accepted(&self, asset: &AssetId) -> bool {
        (**self).is_asset_accepted(asset)
    }

    fn price(&self, asset: &AssetId) -> Usd {
        (**self).price(asset)
    }

    fn decimals(&self, asset: &AssetId) -> u32 {
        (**self).decimals(asset)
    }

    fn accepted_assets(&self) -> Vec<AssetId> {
        (**self).accepted_assets()
    }

    fn compute_fee(&self, raw: Usd) -> Usd {
        (**self).compute_fee(raw)
    }
}

/// Convert a native asset amount to micro-USD value:
/// `amount * price / 10^decimals`.
pub fn asset_value(amount: u128, price: Usd, decimals: u32) -> Usd {
    Usd(amount * price.0 / 10u128.pow(decimals))
}

/// Convert a micro-USD value to a native asset amount:
/// `value * 10^decimals / price`. Price must be nonzero.
pub fn usd_to_amount(value: Usd, price: Usd, decimals: u32) -> u128 {
    debug_assert!(price.0 > 0, "usd_to_amount with zero price");
    value.0 * 10u128.pow(decimals) / price.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_conversion() {
        // 1.5 WETH at $2000, 18 decimals
        let amount = 1_500_000_000_000_000_000u128;
        let value = asset_value(amount, Usd::dollars(2000), 18);
        assert_eq!(value, Usd::dollars(3000));
    }

    #[test]
    fn amount_conversion() {
        let amount = usd_to_amount(Usd::dollars(3000), Usd::dollars(2000), 18);
        assert_eq!(amount, 1_500_000_000_000_000_000);
    }

    #[test]
    fn zero_decimal_asset() {
        assert_eq!(asset_value(5, Usd::dollars(10), 0), Usd::dollars(50));
        assert_eq!(usd_to_amount(Usd::dollars(50), Usd::dollars(10), 0), 5);
    }

    #[test]
    fn conversion_roundtrip_floors() {
        // $10 at $3 per unit, 0 decimals: 3 units worth $9, floor not round
        let amount = usd_to_amount(Usd::dollars(10), Usd::dollars(3), 0);
        assert_eq!(amount, 3);
        assert_eq!(asset_value(amount, Usd::dollars(3), 0), Usd::dollars(9));
    }
}
