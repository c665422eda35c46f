//! Exact Money Arithmetic
//!
//! This module provides fixed-point money math for settlement.
//! All operations use integer arithmetic only - no floats in balance logic.
//!
//! ## Format: whole cents
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Representation: u64 count of cents                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  40.00  =  4000 cents                                       │
//! │   0.01  =     1 cent                                        │
//! │                                                             │
//! │  Range: 0 to ~184 quadrillion units                         │
//! │  Precision: exact to the cent, always                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Fee splits widen through u128 so `winnings + fee == pot` holds
//! exactly for every pot and every fee rate.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Cents per whole currency unit.
pub const CENTS_PER_UNIT: u64 = 100;

/// Basis points denominator (100% = 10_000 bps).
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Default platform fee: 5% of the total pot.
pub const DEFAULT_FEE_BPS: u16 = 500;

// =============================================================================
// MONEY
// =============================================================================

/// An exact, non-negative amount of money stored as whole cents.
///
/// Implements Ord for deterministic BTreeMap ordering. Arithmetic is
/// checked or saturating, never wrapping: balances must not overflow
/// silently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Zero constant.
    pub const ZERO: Self = Self(0);

    /// Create from a raw cent count.
    #[inline]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Create from whole currency units (saturates at the representable max).
    #[inline]
    pub const fn from_units(units: u64) -> Self {
        Self(units.saturating_mul(CENTS_PER_UNIT))
    }

    /// Raw cent count.
    #[inline]
    pub const fn cents(self) -> u64 {
        self.0
    }

    /// Whole-unit part (40.25 -> 40).
    #[inline]
    pub const fn whole_units(self) -> u64 {
        self.0 / CENTS_PER_UNIT
    }

    /// Fractional cent part (40.25 -> 25).
    #[inline]
    pub const fn fractional_cents(self) -> u64 {
        self.0 % CENTS_PER_UNIT
    }

    /// True for a zero amount.
    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Checked addition. None on overflow.
    #[inline]
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Checked subtraction. None if `rhs` exceeds `self`.
    #[inline]
    pub const fn checked_sub(self, rhs: Self) -> Option<Self> {
        match self.0.checked_sub(rhs.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Saturating addition, for aggregate display sums only.
    #[inline]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Parse "40", "40.5" or "40.25" into an exact amount.
    ///
    /// Rejects negatives, more than two fractional digits, and anything
    /// that is not a plain decimal number.
    pub fn parse(s: &str) -> Option<Self> {
        let (units_str, cents_str) = match s.split_once('.') {
            Some((u, c)) => (u, c),
            None => (s, ""),
        };
        if units_str.is_empty() || cents_str.len() > 2 {
            return None;
        }
        let units: u64 = units_str.parse().ok()?;
        let cents = match cents_str.len() {
            0 => 0,
            1 => cents_str.parse::<u64>().ok()? * 10,
            _ => cents_str.parse::<u64>().ok()?,
        };
        units
            .checked_mul(CENTS_PER_UNIT)
            .and_then(|v| v.checked_add(cents))
            .map(Self)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.whole_units(), self.fractional_cents())
    }
}

// =============================================================================
// POT SPLIT
// =============================================================================

/// Result of dividing a settled pot between winner and platform.
///
/// Built only through [`split_pot`], which guarantees
/// `winnings + fee == pot` exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PotSplit {
    /// Total pot: both stakes combined.
    pub pot: Money,
    /// Platform fee, floored.
    pub fee: Money,
    /// Amount credited to the winner.
    pub winnings: Money,
}

/// Fee owed on a pot at the given rate, floored to the cent.
///
/// Widens through u128 so `pot * bps` cannot overflow. The result never
/// exceeds the pot for any rate up to 10_000 bps.
#[inline]
pub fn fee_on(pot: Money, fee_bps: u16) -> Money {
    let wide = (pot.cents() as u128) * (fee_bps as u128) / (BPS_DENOMINATOR as u128);
    Money::from_cents(wide as u64)
}

/// Split the pot for a two-player match with equal stakes.
///
/// `pot = stake * 2`, `fee = pot * fee_bps / 10_000` (floor),
/// `winnings = pot - fee`. Returns None only if doubling the stake
/// overflows.
pub fn split_pot(stake: Money, fee_bps: u16) -> Option<PotSplit> {
    let pot = stake.checked_add(stake)?;
    let fee = fee_on(pot, fee_bps);
    // fee <= pot for any bps rate we accept, so this cannot underflow
    let winnings = pot.checked_sub(fee)?;
    Some(PotSplit { pot, fee, winnings })
}

// =============================================================================
// TESTS
// =============================================================================
