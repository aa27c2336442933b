//! Supply conservation invariant checker.
//!
//! Value only enters the system through ledger minting, and every engine
//! operation only moves it between ledger accounts and coin custody:
//! ```text
//! ∀ asset: Σ(ledger balances) + Σ(engine custody) == Σ(minted)
//! ```

use std::collections::HashMap;

use settlecore_types::{Asset, Result, SettleError};

/// Tracks per-asset minted totals.
#[derive(Debug, Default)]
pub struct SupplyConservation {
    minted: HashMap<Asset, u64>,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record freshly minted units.
    ///
    /// # Errors
    /// Returns `ArithmeticOverflow` if the asset's supply would exceed `u64`.
    pub fn record_mint(&mut self, asset: &str, amount: u64) -> Result<()> {
        let total = self.minted.entry(asset.to_string()).or_insert(0);
        *total = total
            .checked_add(amount)
            .ok_or(SettleError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Expected total supply for an asset.
    #[must_use]
    pub fn expected_supply(&self, asset: &str) -> u64 {
        self.minted.get(asset).copied().unwrap_or(0)
    }

    /// Verify that `actual_supply` (balances + custody) matches minted supply.
    ///
    /// # Errors
    /// Returns [`SettleError::SupplyInvariantViolation`] if actual ≠ expected.
    pub fn verify(&self, asset: &str, actual_supply: u64) -> Result<()> {
        let expected = self.expected_supply(asset);
        if actual_supply != expected {
            return Err(SettleError::SupplyInvariantViolation {
                reason: format!(
                    "Asset {asset}: actual supply {actual_supply} != minted {expected}"
                ),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn tracked_assets(&self) -> Vec<Asset> {
        let mut assets: Vec<Asset> = self.minted.keys().cloned().collect();
        assets.sort();
        assets
    }
}
