//! Transaction Records
//!
//! Immutable audit trail of every monetary event. Records are append-only;
//! the only permitted mutation is the pending to completed status change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::ids::{MatchId, TxId, UserId};
use crate::core::money::Money;

/// What kind of monetary event a record describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Funds added from outside.
    Deposit,
    /// Funds removed to outside.
    Withdrawal,
    /// Stake locked into match escrow.
    Bet,
    /// Winnings credited at settlement.
    Win,
    /// Stake returned from a cancelled match.
    Refund,
}

/// Settlement state of a record.
///
/// Everything this core writes settles synchronously and lands
/// `Completed`; `Pending` exists for deposits an external payment rail
/// confirms later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Awaiting external confirmation.
    Pending,
    /// Settled.
    Completed,
}

/// One immutable audit record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Monotonic ledger-wide id.
    pub id: TxId,
    /// Wallet the event applies to.
    pub user_id: UserId,
    /// Event kind.
    pub kind: TransactionKind,
    /// Amount moved.
    pub amount: Money,
    /// Settlement state.
    pub status: TransactionStatus,
    /// Match the event settles, for bet/win/refund records.
    pub match_id: Option<MatchId>,
    /// When the record was written.
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    fn completed(
        id: TxId,
        user_id: UserId,
        kind: TransactionKind,
        amount: Money,
        match_id: Option<MatchId>,
    ) -> Self {
        Self {
            id,
            user_id,
            kind,
            amount,
            status: TransactionStatus::Completed,
            match_id,
            created_at: Utc::now(),
        }
    }

    /// Completed deposit record.
    pub fn deposit(id: TxId, user_id: UserId, amount: Money) -> Self {
        Self::completed(id, user_id, TransactionKind::Deposit, amount, None)
    }

    /// Completed withdrawal record.
    pub fn withdrawal(id: TxId, user_id: UserId, amount: Money) -> Self {
        Self::completed(id, user_id, TransactionKind::Withdrawal, amount, None)
    }

    /// Completed bet record tied to a match.
    pub fn bet(id: TxId, user_id: UserId, amount: Money, match_id: MatchId) -> Self {
        Self::completed(id, user_id, TransactionKind::Bet, amount, Some(match_id))
    }

    /// Completed winnings record tied to a match.
    pub fn win(id: TxId, user_id: UserId, amount: Money, match_id: MatchId) -> Self {
        Self::completed(id, user_id, TransactionKind::Win, amount, Some(match_id))
    }

    /// Completed refund record tied to a cancelled match.
    pub fn refund(id: TxId, user_id: UserId, amount: Money, match_id: MatchId) -> Self {
        Self::completed(id, user_id, TransactionKind::Refund, amount, Some(match_id))
    }

    /// Move a pending record to completed. False if already completed.
    pub fn mark_completed(&mut self) -> bool {
        if self.status == TransactionStatus::Completed {
            return false;
        }
        self.status = TransactionStatus::Completed;
        true
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_link_matches() {
        let user = UserId::new([1; 16]);
        let m = MatchId::new([9; 16]);

        let dep = Transaction::deposit(TxId(1), user, Money::from_units(100));
        assert_eq!(dep.kind, TransactionKind::Deposit);
        assert_eq!(dep.match_id, None);
        assert_eq!(dep.status, TransactionStatus::Completed);

        let bet = Transaction::bet(TxId(2), user, Money::from_units(40), m);
        assert_eq!(bet.kind, TransactionKind::Bet);
        assert_eq!(bet.match_id, Some(m));

        let win = Transaction::win(TxId(3), user, Money::from_units(76), m);
        assert_eq!(win.kind, TransactionKind::Win);

        let refund = Transaction::refund(TxId(4), user, Money::from_units(40), m);
        assert_eq!(refund.kind, TransactionKind::Refund);
        assert_eq!(refund.match_id, Some(m));
    }

    #[test]
    fn test_status_only_moves_forward() {
        let user = UserId::new([1; 16]);
        let mut tx = Transaction::deposit(TxId(1), user, Money::from_units(5));
        tx.status = TransactionStatus::Pending;

        assert!(tx.mark_completed());
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert!(!tx.mark_completed());
    }
}
