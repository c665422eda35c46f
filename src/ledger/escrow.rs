//! Escrow Holdings
//!
//! One holding per match with an unsettled stake. Created by the first
//! bet, completed by the second, removed exactly once at settlement.
//! Absence of the holding is the at-most-once settlement guard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::ids::{MatchId, UserId};
use crate::core::money::Money;

/// Funds locked against a specific match.
///
/// `amount` is the per-player stake, never the pooled total. The second
/// bettor slot fills when the joiner's bet lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowHolding {
    /// Match this holding settles.
    pub match_id: MatchId,
    /// Per-player stake.
    pub amount: Money,
    /// First bettor (the match creator).
    pub first_bettor: UserId,
    /// Second bettor, recorded when the join bet lands.
    pub second_bettor: Option<UserId>,
    /// When the holding was opened.
    pub created_at: DateTime<Utc>,
}

impl EscrowHolding {
    /// Open a holding with the first bettor's stake.
    pub fn open(match_id: MatchId, bettor: UserId, amount: Money) -> Self {
        Self {
            match_id,
            amount,
            first_bettor: bettor,
            second_bettor: None,
            created_at: Utc::now(),
        }
    }

    /// True once both bettors are recorded.
    pub fn is_full(&self) -> bool {
        self.second_bettor.is_some()
    }

    /// True if the user already staked into this holding.
    pub fn contains(&self, user: UserId) -> bool {
        self.first_bettor == user || self.second_bettor == Some(user)
    }

    /// Record the second bettor. False if the slot is already taken.
    pub fn record_second_bettor(&mut self, bettor: UserId) -> bool {
        if self.second_bettor.is_some() {
            return false;
        }
        self.second_bettor = Some(bettor);
        true
    }

    /// All recorded bettors, first bettor first.
    pub fn bettors(&self) -> Vec<UserId> {
        match self.second_bettor {
            Some(second) => vec![self.first_bettor, second],
            None => vec![self.first_bettor],
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (MatchId, UserId, UserId) {
        (MatchId::new([7; 16]), UserId::new([1; 16]), UserId::new([2; 16]))
    }

    #[test]
    fn test_open_records_first_bettor() {
        let (m, a, _) = ids();
        let e = EscrowHolding::open(m, a, Money::from_units(40));

        assert_eq!(e.match_id, m);
        assert_eq!(e.amount, Money::from_units(40));
        assert!(!e.is_full());
        assert!(e.contains(a));
        assert_eq!(e.bettors(), vec![a]);
    }

    #[test]
    fn test_second_bettor_fills_holding() {
        let (m, a, b) = ids();
        let mut e = EscrowHolding::open(m, a, Money::from_units(40));

        assert!(e.record_second_bettor(b));
        assert!(e.is_full());
        assert!(e.contains(b));
        assert_eq!(e.bettors(), vec![a, b]);
    }

    #[test]
    fn test_third_bettor_rejected() {
        let (m, a, b) = ids();
        let mut e = EscrowHolding::open(m, a, Money::from_units(40));
        e.record_second_bettor(b);

        assert!(!e.record_second_bettor(UserId::new([3; 16])));
        assert_eq!(e.second_bettor, Some(b));
    }

    #[test]
    fn test_contains_unknown_user() {
        let (m, a, b) = ids();
        let e = EscrowHolding::open(m, a, Money::from_units(40));
        assert!(!e.contains(b));
    }
}
