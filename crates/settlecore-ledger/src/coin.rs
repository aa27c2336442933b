//! Exclusive custody of a fungible balance.
//!
//! A [`Coin`] is value that has left a ledger account and is now held by
//! whoever owns the `Coin`: a swap record, a pool reserve, or an operation
//! in flight. It is neither `Clone` nor `Copy`, so the same units can never
//! be held in two places. Value only moves through [`Coin::merge`] and
//! [`Coin::extract`], and non-zero coins are only created by ledger
//! withdrawals.

use std::fmt;

use settlecore_types::{Asset, Result, SettleError};

/// A quantity of one asset in exclusive custody.
#[must_use = "dropping a non-zero Coin destroys value"]
#[derive(Debug, PartialEq, Eq)]
pub struct Coin {
    asset: Asset,
    value: u64,
}

impl Coin {
    /// Only the ledger mints coins with value.
    pub(crate) fn new(asset: impl Into<Asset>, value: u64) -> Self {
        Self {
            asset: asset.into(),
            value,
        }
    }

    /// An empty coin of `asset`, e.g. the initial Y slot of a swap.
    pub fn zero(asset: impl Into<Asset>) -> Self {
        Self::new(asset, 0)
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.value
    }

    #[must_use]
    pub fn asset(&self) -> &str {
        &self.asset
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// Absorb `other` into this coin.
    ///
    /// # Errors
    /// On asset mismatch `other` is handed back inside the rejection.
    pub fn merge(&mut self, other: Coin) -> std::result::Result<(), CoinRejection> {
        if other.asset != self.asset {
            let error = SettleError::AssetMismatch {
                expected: self.asset.clone(),
                actual: other.asset.clone(),
            };
            return Err(CoinRejection::new(error, other));
        }
        // Total supply of an asset fits in u64, so two disjoint parts of it do too.
        self.value += other.value;
        Ok(())
    }

    /// Split `amount` off into a new coin.
    ///
    /// # Errors
    /// Returns `InsufficientBalance` if the coin holds less than `amount`.
    pub fn extract(&mut self, amount: u64) -> Result<Coin> {
        if amount > self.value {
            return Err(SettleError::InsufficientBalance {
                needed: amount,
                available: self.value,
            });
        }
        self.value -= amount;
        Ok(Self::new(self.asset.clone(), amount))
    }

    /// Move the whole balance out, leaving this coin empty.
    pub fn extract_all(&mut self) -> Coin {
        let value = std::mem::take(&mut self.value);
        Self::new(self.asset.clone(), value)
    }

    /// Consume an empty coin.
    ///
    /// # Errors
    /// Returns `Internal` if the coin still holds value.
    pub fn destroy_zero(self) -> Result<()> {
        if self.value != 0 {
            return Err(SettleError::Internal(format!(
                "cannot destroy coin holding {} {}",
                self.value, self.asset
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.asset)
    }
}

/// A coin-consuming operation refused its input and hands it back.
#[derive(Debug)]
pub struct CoinRejection {
    pub error: SettleError,
    pub refund: Coin,
}

impl CoinRejection {
    pub fn new(error: SettleError, refund: Coin) -> Self {
        Self { error, refund }
    }

    pub fn into_parts(self) -> (SettleError, Coin) {
        (self.error, self.refund)
    }
}

impl fmt::Display for CoinRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (refunding {})", self.error, self.refund)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_splits_value() {
        let mut coin = Coin::new("APT", 100);
        let part = coin.extract(30).unwrap();
        assert_eq!(part.value(), 30);
        assert_eq!(part.asset(), "APT");
        assert_eq!(coin.value(), 70);
    }

    #[test]
    fn extract_too_much_leaves_coin_unchanged() {
        let mut coin = Coin::new("APT", 10);
        let err = coin.extract(11).unwrap_err();
        assert!(matches!(
            err,
            SettleError::InsufficientBalance {
                needed: 11,
                available: 10
            }
        ));
        assert_eq!(coin.value(), 10);
    }

    #[test]
    fn merge_same_asset() {
        let mut coin = Coin::zero("USDC");
        coin.merge(Coin::new("USDC", 5)).unwrap();
        coin.merge(Coin::new("USDC", 7)).unwrap();
        assert_eq!(coin.value(), 12);
    }

    #[test]
    fn merge_wrong_asset_refunds() {
        let mut coin = Coin::new("USDC", 1);
        let rejection = coin.merge(Coin::new("APT", 9)).unwrap_err();
        let (err, refund) = rejection.into_parts();
        assert!(matches!(err, SettleError::AssetMismatch { .. }));
        assert_eq!(refund.value(), 9);
        assert_eq!(coin.value(), 1);
    }

    #[test]
    fn extract_all_empties() {
        let mut coin = Coin::new("APT", 42);
        let all = coin.extract_all();
        assert_eq!(all.value(), 42);
        assert!(coin.is_zero());
        coin.destroy_zero().unwrap();
    }

    #[test]
    fn destroy_non_zero_fails() {
        assert!(Coin::new("APT", 1).destroy_zero().is_err());
    }

    #[test]
    fn display_shows_value_and_asset() {
        assert_eq!(Coin::new("APT", 3).to_string(), "3 APT");
    }
}
