//! Core types: AssetId, HolderId, Usd fixed-point, Shares, scale constants.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Micro-USD per whole dollar. All USD values are fixed-point `u128` in
/// micro-dollars (`1_000000` = $1.00) to avoid floating-point errors in
/// share-price math.
pub const USD_SCALE: u128 = 1_000000;

/// Micro-shares per whole share. Shares carry the same 1e6 scale as USD so
/// sub-dollar deposits still mint a nonzero amount.
pub const SHARE_SCALE: u128 = 1_000000;

/// Basis-point denominator (10_000 bps = 100%).
pub const BPS_DENOM: u128 = 10_000;

/// Target-allocation weights are in basis points and must sum to exactly this.
pub const WEIGHT_SUM_BPS: u32 = 10_000;

/// Share price assigned on the first deposit and whenever supply returns to
/// zero: $1.00 per share.
pub const INITIAL_SHARE_PRICE: Usd = Usd(USD_SCALE);

/// A USD value in micro-dollars.
///
/// `Usd(1_500000)` represents $1.50.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Usd(pub u128);

impl Usd {
    pub const ZERO: Usd = Usd(0);

    /// Whole-dollar constructor: `Usd::dollars(1000)` = $1,000.00.
    pub const fn dollars(d: u128) -> Usd {
        Usd(d * USD_SCALE)
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// `self - other`, saturating at zero.
    pub fn saturating_sub(self, other: Usd) -> Usd {
        Usd(self.0.saturating_sub(other.0))
    }

    /// A basis-point fraction of this value, rounded down.
    pub fn bps(self, bps: u32) -> Usd {
        Usd(self.0 * bps as u128 / BPS_DENOM)
    }
}

impl fmt::Display for Usd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dollars = self.0 / USD_SCALE;
        // Display cents, not micros; micro precision is an accounting detail.
        let cents = (self.0 % USD_SCALE) / 10_000;
        write!(f, "${dollars}.{cents:02}")
    }
}

/// Share amount in micro-shares. Always non-negative.
pub type Shares = u128;

/// Whole-share constructor for literals: `shares(1000)` = 1000.000000 shares.
pub const fn shares(n: u128) -> Shares {
    n * SHARE_SCALE
}

/// Asset identifier: an inline, fixed-size symbol (max 12 bytes, e.g. "WETH",
/// "USDC"). Copyable and hashable, no heap allocation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId {
    bytes: [u8; 12],
    len: u8,
}

impl AssetId {
    /// Create an asset id from a string.
    ///
    /// # Panics
    /// Panics if the string is empty or longer than 12 bytes. Use
    /// [`AssetId::try_new`] for untrusted input.
    pub fn new(s: &str) -> Self {
        Self::try_new(s).expect("asset id must be 1..=12 bytes")
    }

    /// Fallible constructor for untrusted input (config files, snapshots).
    pub fn try_new(s: &str) -> Option<Self> {
        let raw = s.as_bytes();
        if raw.is_empty() || raw.len() > 12 {
            return None;
        }
        let mut bytes = [0u8; 12];
        bytes[..raw.len()].copy_from_slice(raw);
        Some(Self {
            bytes,
            len: raw.len() as u8,
        })
    }

    pub fn as_str(&self) -> &str {
        // Construction guarantees valid UTF-8 of this length.
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("?")
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({})", self.as_str())
    }
}

// Serialize as a plain string so snapshots and audit lines stay readable.
impl Serialize for AssetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AssetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        AssetId::try_new(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid asset id: {s:?}")))
    }
}

/// Holder (account) identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HolderId(pub u64);

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H{}", self.0)
    }
}
