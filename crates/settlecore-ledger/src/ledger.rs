//! Account balances and the ledger port the engines move value through.
//!
//! The engines never touch balances directly. They withdraw a [`Coin`] from
//! an account, hold or split it, and deposit coins back. Each call is
//! atomic: a withdrawal either takes the full amount or leaves the balance
//! unchanged.

use std::collections::HashMap;

use parking_lot::Mutex;
use settlecore_types::{AccountId, Asset, Result, SettleError};

use crate::coin::Coin;
use crate::supply_conservation::SupplyConservation;

/// Exclusive-ownership transfer of value between accounts.
pub trait LedgerAccess: Send + Sync {
    /// Take `amount` of `asset` out of `account`.
    ///
    /// # Errors
    /// Returns `InsufficientBalance` if the account holds less than `amount`.
    fn withdraw(&self, account: AccountId, asset: &str, amount: u64) -> Result<Coin>;

    /// Credit the full value of `coin` to `account`.
    fn deposit(&self, account: AccountId, coin: Coin);

    /// Current balance of `asset` held by `account`.
    fn balance(&self, account: AccountId, asset: &str) -> u64;
}

/// In-process ledger keyed by `(account, asset)`.
///
/// Also the only place new value enters the system ([`InMemoryLedger::mint`]),
/// so it doubles as the supply-conservation reference.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: Mutex<HashMap<(AccountId, Asset), u64>>,
    supply: Mutex<SupplyConservation>,
}

impl InMemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fund `account` with newly created units.
    ///
    /// # Errors
    /// Returns `ArithmeticOverflow` if the asset's total supply would exceed `u64`.
    pub fn mint(&self, account: AccountId, asset: &str, amount: u64) -> Result<()> {
        self.supply.lock().record_mint(asset, amount)?;
        *self
            .balances
            .lock()
            .entry((account, asset.to_string()))
            .or_default() += amount;
        Ok(())
    }

    /// Sum of all account balances of `asset`.
    #[must_use]
    pub fn total_balances(&self, asset: &str) -> u64 {
        self.balances
            .lock()
            .iter()
            .filter(|((_, a), _)| a == asset)
            .map(|(_, v)| *v)
            .sum()
    }

    /// Check that balances plus `held_in_custody` still equal minted supply.
    ///
    /// # Errors
    /// Returns `SupplyInvariantViolation` on mismatch.
    pub fn verify_supply(&self, asset: &str, held_in_custody: u64) -> Result<()> {
        let actual = self
            .total_balances(asset)
            .checked_add(held_in_custody)
            .ok_or(SettleError::ArithmeticOverflow)?;
        self.supply.lock().verify(asset, actual)
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl InMemoryLedger {
    /// A ledger with each `(account, asset, amount)` already minted.
    ///
    /// # Panics
    /// If the minted supply of an asset overflows `u64`.
    pub fn funded(balances: &[(AccountId, &str, u64)]) -> Self {
        let ledger = Self::new();
        for &(account, asset, amount) in balances {
            ledger
                .mint(account, asset, amount)
                .expect("test supply fits in u64");
        }
        ledger
    }
}

impl LedgerAccess for InMemoryLedger {
    fn withdraw(&self, account: AccountId, asset: &str, amount: u64) -> Result<Coin> {
        let mut balances = self.balances.lock();
        let available = balances
            .get(&(account, asset.to_string()))
            .copied()
            .unwrap_or(0);
        if available < amount {
            return Err(SettleError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        if let Some(entry) = balances.get_mut(&(account, asset.to_string())) {
            *entry -= amount;
        }
        Ok(Coin::new(asset, amount))
    }

    fn deposit(&self, account: AccountId, coin: Coin) {
        let amount = coin.value();
        // Balances are bounded by minted supply, which fits in u64.
        *self
            .balances
            .lock()
            .entry((account, coin.asset().to_string()))
            .or_default() += amount;
    }

    fn balance(&self, account: AccountId, asset: &str) -> u64 {
        self.balances
            .lock()
            .get(&(account, asset.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_increases_balance() {
        let ledger = InMemoryLedger::new();
        let user = AccountId::new();
        ledger.mint(user, "USDC", 1000).unwrap();
        assert_eq!(ledger.balance(user, "USDC"), 1000);
        assert_eq!(ledger.total_balances("USDC"), 1000);
    }

    #[test]
    fn withdraw_moves_value_into_coin() {
        let ledger = InMemoryLedger::new();
        let user = AccountId::new();
        ledger.mint(user, "USDC", 1000).unwrap();
        let coin = ledger.withdraw(user, "USDC", 400).unwrap();
        assert_eq!(coin.value(), 400);
        assert_eq!(ledger.balance(user, "USDC"), 600);
        ledger.verify_supply("USDC", coin.value()).unwrap();
        ledger.deposit(user, coin);
    }

    #[test]
    fn withdraw_insufficient_leaves_balance() {
        let ledger = InMemoryLedger::new();
        let user = AccountId::new();
        ledger.mint(user, "USDC", 100).unwrap();
        let err = ledger.withdraw(user, "USDC", 200).unwrap_err();
        assert!(matches!(
            err,
            SettleError::InsufficientBalance {
                needed: 200,
                available: 100
            }
        ));
        assert_eq!(ledger.balance(user, "USDC"), 100);
    }

    #[test]
    fn withdraw_from_unknown_account_fails() {
        let ledger = InMemoryLedger::new();
        let err = ledger.withdraw(AccountId::new(), "APT", 1).unwrap_err();
        assert!(matches!(err, SettleError::InsufficientBalance { .. }));
    }

    #[test]
    fn deposit_credits_other_account() {
        let ledger = InMemoryLedger::new();
        let alice = AccountId::new();
        let bob = AccountId::new();
        ledger.mint(alice, "APT", 10).unwrap();
        let coin = ledger.withdraw(alice, "APT", 10).unwrap();
        ledger.deposit(bob, coin);
        assert_eq!(ledger.balance(alice, "APT"), 0);
        assert_eq!(ledger.balance(bob, "APT"), 10);
        ledger.verify_supply("APT", 0).unwrap();
    }

    #[test]
    fn verify_supply_detects_missing_custody() {
        let ledger = InMemoryLedger::new();
        let user = AccountId::new();
        ledger.mint(user, "APT", 10).unwrap();
        let coin = ledger.withdraw(user, "APT", 4).unwrap();
        let err = ledger.verify_supply("APT", 0).unwrap_err();
        assert!(matches!(err, SettleError::SupplyInvariantViolation { .. }));
        ledger.deposit(user, coin);
    }

    #[test]
    fn funded_mints_every_entry() {
        let alice = AccountId::new();
        let bob = AccountId::new();
        let ledger =
            InMemoryLedger::funded(&[(alice, "APT", 5), (bob, "APT", 7), (bob, "USDC", 1)]);
        assert_eq!(ledger.balance(bob, "APT"), 7);
        assert_eq!(ledger.total_balances("APT"), 12);
        ledger.verify_supply("USDC", 0).unwrap();
    }

    #[test]
    fn unknown_balance_is_zero() {
        let ledger = InMemoryLedger::new();
        assert_eq!(ledger.balance(AccountId::new(), "APT"), 0);
    }
}
