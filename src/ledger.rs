//! Share ledger: per-holder balances and total supply.
//!
//! The ledger is mutated only through engine-issued mint/burn, never
//! independently. Invariant: the sum of all holder balances equals
//! `total_supply` after every operation.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};
use crate::types::{HolderId, Shares};

/// Fungible share balances for one vault instance.
#[derive(Clone, Debug, Default)]
pub struct ShareLedger {
    balances: FxHashMap<HolderId, Shares>,
    total_supply: Shares,
}

impl ShareLedger {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn total_supply(&self) -> Shares {
        self.total_supply
    }

    pub fn balance_of(&self, holder: &HolderId) -> Shares {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    /// Iterator over holders with nonzero balances.
    pub fn holders(&self) -> impl Iterator<Item = (&HolderId, &Shares)> {
        self.balances.iter().filter(|(_, bal)| **bal > 0)
    }

    /// Mint shares to a holder. Zero amounts are a no-op.
    pub fn mint(&mut self, holder: HolderId, amount: Shares) {
        if amount == 0 {
            return;
        }
        *self.balances.entry(holder).or_insert(0) += amount;
        self.total_supply += amount;
    }

    /// Burn shares from a holder; fails without state change if the balance
    /// is insufficient.
    pub fn burn(&mut self, holder: HolderId, amount: Shares) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let balance = self.balance_of(&holder);
        if balance < amount {
            return Err(VaultError::InsufficientBalance {
                holder,
                requested: amount,
                available: balance,
            });
        }
        let remaining = balance - amount;
        if remaining == 0 {
            self.balances.remove(&holder);
        } else {
            self.balances.insert(holder, remaining);
        }
        self.total_supply -= amount;
        Ok(())
    }

    /// Burn up to `amount`, capped at the holder's actual balance. Returns
    /// the amount actually burned. Used for loss penalties.
    pub fn burn_up_to(&mut self, holder: HolderId, amount: Shares) -> Shares {
        let capped = amount.min(self.balance_of(&holder));
        // Cannot fail: capped <= balance.
        let _ = self.burn(holder, capped);
        capped
    }

    /// Balances as sorted pairs for snapshots and audit lines.
    pub fn to_sorted_pairs(&self) -> Vec<(HolderId, Shares)> {
        let mut pairs: Vec<_> = self.balances.iter().map(|(h, s)| (*h, *s)).collect();
        pairs.sort_by_key(|(h, _)| *h);
        pairs
    }

    pub fn from_pairs(pairs: &[(HolderId, Shares)]) -> Self {
        let mut ledger = Self::new();
        for &(holder, amount) in pairs {
            ledger.mint(holder, amount);
        }
        ledger
    }
}

// Serialize as sorted pairs so snapshot output is deterministic.
impl Serialize for ShareLedger {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_sorted_pairs().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ShareLedger {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let pairs = Vec::<(HolderId, Shares)>::deserialize(deserializer)?;
        Ok(Self::from_pairs(&pairs))
    }
}
