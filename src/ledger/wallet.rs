//! Wallet State
//!
//! Per-user balance with a locked portion committed to open escrow.
//! Invariant at every step: 0 <= locked <= balance.

use serde::{Deserialize, Serialize};

use crate::core::money::Money;

/// A single user's funds.
///
/// Mutators are total functions over valid states: each returns None
/// instead of breaking the locked/balance invariant, and the caller maps
/// that to its typed error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Total funds, including the locked portion.
    pub balance: Money,
    /// Portion committed to open escrow.
    pub locked: Money,
}

impl Wallet {
    /// Fresh empty wallet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Funds not committed to escrow: balance - locked.
    pub fn available(&self) -> Money {
        self.balance.checked_sub(self.locked).unwrap_or(Money::ZERO)
    }

    /// Add funds. None on balance overflow.
    pub fn credit(&mut self, amount: Money) -> Option<()> {
        self.balance = self.balance.checked_add(amount)?;
        Some(())
    }

    /// Remove available funds. None if available < amount.
    pub fn withdraw(&mut self, amount: Money) -> Option<()> {
        if self.available() < amount {
            return None;
        }
        self.balance = self.balance.checked_sub(amount)?;
        Some(())
    }

    /// Commit available funds to escrow. None if available < amount.
    pub fn lock(&mut self, amount: Money) -> Option<()> {
        if self.available() < amount {
            return None;
        }
        self.locked = self.locked.checked_add(amount)?;
        Some(())
    }

    /// Return locked funds to the available pool. None if locked < amount.
    pub fn release_locked(&mut self, amount: Money) -> Option<()> {
        self.locked = self.locked.checked_sub(amount)?;
        Some(())
    }

    /// Settle locked funds out of the wallet entirely.
    ///
    /// Reduces both locked and balance. None if locked < amount; the
    /// invariant then guarantees the balance side cannot fail.
    pub fn consume_locked(&mut self, amount: Money) -> Option<()> {
        let locked = self.locked.checked_sub(amount)?;
        let balance = self.balance.checked_sub(amount)?;
        self.locked = locked;
        self.balance = balance;
        Some(())
    }

    /// Invariant check: locked never exceeds balance.
    pub fn invariant_holds(&self) -> bool {
        self.locked <= self.balance
    }
}

// =============================================================================
// TESTS
// =============================================================================
