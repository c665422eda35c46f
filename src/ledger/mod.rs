//! Ledger Service
//!
//! Sole owner of monetary truth: wallets, escrow holdings, and the
//! append-only transaction log. The whole book sits behind one writer
//! lock, so every settlement mutation is serialized and observes a
//! consistent book. Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::core::ids::{MatchId, TxId, UserId};
use crate::core::money::{split_pot, Money, DEFAULT_FEE_BPS};

pub mod escrow;
pub mod transaction;
pub mod wallet;

pub use escrow::EscrowHolding;
pub use transaction::{Transaction, TransactionKind, TransactionStatus};
pub use wallet::Wallet;

/// Ledger errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    /// Zero amount where a positive one is required.
    #[error("Amount must be positive")]
    InvalidAmount,

    /// Not enough unlocked funds for the withdrawal or bet.
    #[error("Insufficient available funds")]
    InsufficientAvailableFunds,

    /// The user already staked into this match's escrow.
    #[error("Stake already placed for this match")]
    AlreadyStaked,

    /// The joining stake differs from the recorded escrow amount.
    #[error("Stake does not match the recorded escrow amount")]
    StakeMismatch,

    /// Both bettor slots of the escrow are already taken.
    #[error("Escrow already holds both stakes")]
    EscrowFull,

    /// Settlement needs both stakes but only one was placed.
    #[error("Escrow is missing the second stake")]
    EscrowIncomplete,

    /// No escrow holding exists for the match.
    #[error("No escrow holding for this match")]
    EscrowNotFound,

    /// The designated winner never staked into the escrow.
    #[error("Winner is not a recorded bettor")]
    WinnerNotStaked,

    /// A balance would overflow the representable range.
    #[error("Balance overflow")]
    BalanceOverflow,

    /// Book state contradicts itself; the operation was refused.
    #[error("Ledger book is inconsistent")]
    BookInconsistent,
}

/// What a completed payout moved, for callers and logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PayoutReceipt {
    /// Settled match.
    pub match_id: MatchId,
    /// Credited winner.
    pub winner: UserId,
    /// Both stakes combined.
    pub pot: Money,
    /// Platform fee retained.
    pub fee: Money,
    /// Amount credited to the winner.
    pub winnings: Money,
    /// The winnings transaction.
    pub tx_id: TxId,
}

/// Serializable copy of the full book, for snapshot save/restore.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LedgerExport {
    /// All wallets.
    #[serde(default)]
    pub wallets: BTreeMap<UserId, Wallet>,
    /// All open escrow holdings.
    #[serde(default)]
    pub escrows: BTreeMap<MatchId, EscrowHolding>,
    /// Full transaction log, oldest first.
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    /// Next transaction id to allocate.
    #[serde(default)]
    pub next_tx_id: TxId,
    /// Cumulative platform revenue.
    #[serde(default)]
    pub fees_collected: Money,
}

// =============================================================================
// BOOK
// =============================================================================

/// All monetary state, guarded by the service lock.
#[derive(Debug)]
struct LedgerBook {
    wallets: BTreeMap<UserId, Wallet>,
    escrows: BTreeMap<MatchId, EscrowHolding>,
    transactions: Vec<Transaction>,
    next_tx_id: TxId,
    fees_collected: Money,
}

impl LedgerBook {
    fn new() -> Self {
        Self {
            wallets: BTreeMap::new(),
            escrows: BTreeMap::new(),
            transactions: Vec::new(),
            next_tx_id: TxId::FIRST,
            fees_collected: Money::ZERO,
        }
    }

    fn allocate_tx_id(&mut self) -> TxId {
        let id = self.next_tx_id;
        self.next_tx_id = id.next();
        id
    }
}

// =============================================================================
// LEDGER SERVICE
// =============================================================================

/// The ledger service.
///
/// Constructed once and shared by handle. Every mutation takes the book's
/// write lock, validates on copies, and commits all-or-nothing: a returned
/// error means no balance changed.
pub struct Ledger {
    book: RwLock<LedgerBook>,
    fee_bps: u16,
}

impl Ledger {
    /// New empty ledger at the default 5% fee.
    pub fn new() -> Self {
        Self::with_fee_bps(DEFAULT_FEE_BPS)
    }

    /// New empty ledger at a specific fee rate (capped at 10_000 bps).
    pub fn with_fee_bps(fee_bps: u16) -> Self {
        Self {
            book: RwLock::new(LedgerBook::new()),
            fee_bps: fee_bps.min(10_000),
        }
    }

    /// Fee rate applied to settled pots.
    pub fn fee_bps(&self) -> u16 {
        self.fee_bps
    }

    /// Add funds to a user's wallet, creating it if absent.
    pub async fn deposit(&self, user_id: UserId, amount: Money) -> Result<TxId, LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount);
        }

        let mut book = self.book.write().await;
        let mut wallet = book.wallets.get(&user_id).copied().unwrap_or_default();
        wallet.credit(amount).ok_or(LedgerError::BalanceOverflow)?;

        book.wallets.insert(user_id, wallet);
        let tx_id = book.allocate_tx_id();
        book.transactions.push(Transaction::deposit(tx_id, user_id, amount));

        info!("deposit {} for {} ({})", amount, user_id, tx_id);
        Ok(tx_id)
    }

    /// Remove available funds from a user's wallet.
    pub async fn withdraw(&self, user_id: UserId, amount: Money) -> Result<TxId, LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount);
        }

        let mut book = self.book.write().await;
        let mut wallet = book.wallets.get(&user_id).copied().unwrap_or_default();
        wallet
            .withdraw(amount)
            .ok_or(LedgerError::InsufficientAvailableFunds)?;

        book.wallets.insert(user_id, wallet);
        let tx_id = book.allocate_tx_id();
        book.transactions
            .push(Transaction::withdrawal(tx_id, user_id, amount));

        info!("withdrawal {} for {} ({})", amount, user_id, tx_id);
        Ok(tx_id)
    }

    /// Lock a stake into the match's escrow.
    ///
    /// The first bet opens the holding; the second must match its amount
    /// exactly and fills the remaining bettor slot. The caller is
    /// responsible for resolving the match id to a live match first.
    pub async fn place_bet(
        &self,
        user_id: UserId,
        match_id: MatchId,
        amount: Money,
    ) -> Result<TxId, LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount);
        }

        let mut book = self.book.write().await;

        if let Some(holding) = book.escrows.get(&match_id) {
            if holding.contains(user_id) {
                return Err(LedgerError::AlreadyStaked);
            }
            if holding.is_full() {
                return Err(LedgerError::EscrowFull);
            }
            if holding.amount != amount {
                return Err(LedgerError::StakeMismatch);
            }
        }

        let mut wallet = book.wallets.get(&user_id).copied().unwrap_or_default();
        wallet
            .lock(amount)
            .ok_or(LedgerError::InsufficientAvailableFunds)?;

        book.wallets.insert(user_id, wallet);
        match book.escrows.get_mut(&match_id) {
            Some(holding) => {
                holding.record_second_bettor(user_id);
            }
            None => {
                book.escrows
                    .insert(match_id, EscrowHolding::open(match_id, user_id, amount));
            }
        }
        let tx_id = book.allocate_tx_id();
        book.transactions
            .push(Transaction::bet(tx_id, user_id, amount, match_id));

        info!("bet {} by {} on match {} ({})", amount, user_id, match_id, tx_id);
        Ok(tx_id)
    }

    /// Settle a match: consume both stakes, credit the winner net of fee.
    ///
    /// The escrow holding is removed in the same commit, so a second call
    /// for the same match fails `EscrowNotFound` without touching any
    /// balance.
    pub async fn process_payout(
        &self,
        match_id: MatchId,
        winner: UserId,
    ) -> Result<PayoutReceipt, LedgerError> {
        let mut book = self.book.write().await;

        let holding = *book.escrows.get(&match_id).ok_or(LedgerError::EscrowNotFound)?;
        let second = holding.second_bettor.ok_or(LedgerError::EscrowIncomplete)?;
        if !holding.contains(winner) {
            return Err(LedgerError::WinnerNotStaked);
        }
        let loser = if winner == holding.first_bettor {
            second
        } else {
            holding.first_bettor
        };

        let split = split_pot(holding.amount, self.fee_bps).ok_or(LedgerError::BalanceOverflow)?;

        let mut winner_wallet = book
            .wallets
            .get(&winner)
            .copied()
            .ok_or(LedgerError::BookInconsistent)?;
        let mut loser_wallet = book
            .wallets
            .get(&loser)
            .copied()
            .ok_or(LedgerError::BookInconsistent)?;
        winner_wallet
            .consume_locked(holding.amount)
            .ok_or(LedgerError::BookInconsistent)?;
        loser_wallet
            .consume_locked(holding.amount)
            .ok_or(LedgerError::BookInconsistent)?;
        winner_wallet
            .credit(split.winnings)
            .ok_or(LedgerError::BalanceOverflow)?;
        let fees = book
            .fees_collected
            .checked_add(split.fee)
            .ok_or(LedgerError::BalanceOverflow)?;

        book.wallets.insert(winner, winner_wallet);
        book.wallets.insert(loser, loser_wallet);
        book.fees_collected = fees;
        book.escrows.remove(&match_id);
        let tx_id = book.allocate_tx_id();
        book.transactions
            .push(Transaction::win(tx_id, winner, split.winnings, match_id));

        info!(
            "payout for match {}: winner {} takes {}, fee {} ({})",
            match_id, winner, split.winnings, split.fee, tx_id
        );
        Ok(PayoutReceipt {
            match_id,
            winner,
            pot: split.pot,
            fee: split.fee,
            winnings: split.winnings,
            tx_id,
        })
    }

    /// Return all locked stakes of a cancelled match to their bettors.
    ///
    /// Same at-most-once discipline as payout: removing the holding in the
    /// commit makes a second refund fail `EscrowNotFound`.
    pub async fn refund_escrow(&self, match_id: MatchId) -> Result<Vec<TxId>, LedgerError> {
        let mut book = self.book.write().await;

        let holding = *book.escrows.get(&match_id).ok_or(LedgerError::EscrowNotFound)?;
        let bettors = holding.bettors();

        let mut updated = Vec::with_capacity(bettors.len());
        for bettor in &bettors {
            let mut wallet = book
                .wallets
                .get(bettor)
                .copied()
                .ok_or(LedgerError::BookInconsistent)?;
            wallet
                .release_locked(holding.amount)
                .ok_or(LedgerError::BookInconsistent)?;
            updated.push((*bettor, wallet));
        }

        for (bettor, wallet) in updated {
            book.wallets.insert(bettor, wallet);
        }
        book.escrows.remove(&match_id);
        let mut tx_ids = Vec::with_capacity(bettors.len());
        for bettor in bettors {
            let tx_id = book.allocate_tx_id();
            book.transactions
                .push(Transaction::refund(tx_id, bettor, holding.amount, match_id));
            tx_ids.push(tx_id);
        }

        info!("refunded {} per bettor for match {}", holding.amount, match_id);
        Ok(tx_ids)
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Point-in-time copy of a user's wallet, if one exists.
    pub async fn wallet_of(&self, user_id: UserId) -> Option<Wallet> {
        let book = self.book.read().await;
        book.wallets.get(&user_id).copied()
    }

    /// Total balance. Zero for unknown users.
    pub async fn balance_of(&self, user_id: UserId) -> Money {
        self.wallet_of(user_id).await.unwrap_or_default().balance
    }

    /// Locked portion. Zero for unknown users.
    pub async fn locked_of(&self, user_id: UserId) -> Money {
        self.wallet_of(user_id).await.unwrap_or_default().locked
    }

    /// Unlocked funds. Zero for unknown users.
    pub async fn available_of(&self, user_id: UserId) -> Money {
        self.wallet_of(user_id).await.unwrap_or_default().available()
    }

    /// Point-in-time copy of a match's escrow holding.
    pub async fn escrow_for(&self, match_id: MatchId) -> Option<EscrowHolding> {
        let book = self.book.read().await;
        book.escrows.get(&match_id).copied()
    }

    /// A user's audit trail, newest first.
    pub async fn transactions_for(&self, user_id: UserId) -> Vec<Transaction> {
        let book = self.book.read().await;
        book.transactions
            .iter()
            .rev()
            .filter(|tx| tx.user_id == user_id)
            .copied()
            .collect()
    }

    /// Records written so far, all users.
    pub async fn transaction_count(&self) -> usize {
        let book = self.book.read().await;
        book.transactions.len()
    }

    /// Cumulative platform revenue retained from settled pots.
    pub async fn fees_collected(&self) -> Money {
        let book = self.book.read().await;
        book.fees_collected
    }

    // =========================================================================
    // SNAPSHOT SUPPORT
    // =========================================================================

    /// Copy of the full book for the persistence snapshot.
    pub async fn export(&self) -> LedgerExport {
        let book = self.book.read().await;
        LedgerExport {
            wallets: book.wallets.clone(),
            escrows: book.escrows.clone(),
            transactions: book.transactions.clone(),
            next_tx_id: book.next_tx_id,
            fees_collected: book.fees_collected,
        }
    }

    /// Replace the book with a restored snapshot.
    ///
    /// Refuses the whole import (book unchanged) unless every wallet
    /// invariant holds, every user's locked total equals the stakes
    /// recorded against them, and the tx counter is ahead of the log.
    pub async fn restore(&self, export: LedgerExport) -> Result<(), LedgerError> {
        let mut locked_per_user: BTreeMap<UserId, Money> = BTreeMap::new();
        for holding in export.escrows.values() {
            for bettor in holding.bettors() {
                let entry = locked_per_user.entry(bettor).or_insert(Money::ZERO);
                *entry = entry
                    .checked_add(holding.amount)
                    .ok_or(LedgerError::BookInconsistent)?;
            }
        }

        for (user_id, wallet) in &export.wallets {
            let expected = locked_per_user
                .get(user_id)
                .copied()
                .unwrap_or(Money::ZERO);
            if !wallet.invariant_holds() || wallet.locked != expected {
                warn!("rejecting ledger restore: wallet {} is inconsistent", user_id);
                return Err(LedgerError::BookInconsistent);
            }
        }
        for user_id in locked_per_user.keys() {
            if !export.wallets.contains_key(user_id) {
                warn!("rejecting ledger restore: escrow names unknown wallet {}", user_id);
                return Err(LedgerError::BookInconsistent);
            }
        }
        if let Some(max_id) = export.transactions.iter().map(|tx| tx.id).max() {
            if export.next_tx_id <= max_id {
                warn!("rejecting ledger restore: tx counter behind the log");
                return Err(LedgerError::BookInconsistent);
            }
        }

        let mut book = self.book.write().await;
        book.wallets = export.wallets;
        book.escrows = export.escrows;
        book.transactions = export.transactions;
        book.next_tx_id = if export.next_tx_id < TxId::FIRST {
            TxId::FIRST
        } else {
            export.next_tx_id
        };
        book.fees_collected = export.fees_collected;
        info!(
            "ledger restored: {} wallets, {} open escrows, {} transactions",
            book.wallets.len(),
            book.escrows.len(),
            book.transactions.len()
        );
        Ok(())
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> (UserId, UserId) {
        (UserId::new([1; 16]), UserId::new([2; 16]))
    }

    async fn funded_ledger() -> (Ledger, UserId, UserId) {
        let ledger = Ledger::new();
        let (alice, bob) = users();
        ledger.deposit(alice, Money::from_units(100)).await.unwrap();
        ledger.deposit(bob, Money::from_units(100)).await.unwrap();
        (ledger, alice, bob)
    }

    #[tokio::test]
    async fn test_deposit_creates_wallet() {
        let ledger = Ledger::new();
        let (alice, _) = users();

        let tx = ledger.deposit(alice, Money::from_units(100)).await.unwrap();
        assert_eq!(tx, TxId::FIRST);
        assert_eq!(ledger.balance_of(alice).await, Money::from_units(100));
        assert_eq!(ledger.available_of(alice).await, Money::from_units(100));
    }

    #[tokio::test]
    async fn test_zero_amounts_rejected() {
        let ledger = Ledger::new();
        let (alice, _) = users();
        let m = MatchId::new([9; 16]);

        assert!(matches!(
            ledger.deposit(alice, Money::ZERO).await,
            Err(LedgerError::InvalidAmount)
        ));
        assert!(matches!(
            ledger.withdraw(alice, Money::ZERO).await,
            Err(LedgerError::InvalidAmount)
        ));
        assert!(matches!(
            ledger.place_bet(alice, m, Money::ZERO).await,
            Err(LedgerError::InvalidAmount)
        ));
    }

    #[tokio::test]
    async fn test_withdraw_respects_available() {
        let (ledger, alice, _) = funded_ledger().await;
        let m = MatchId::new([9; 16]);
        ledger.place_bet(alice, m, Money::from_units(40)).await.unwrap();

        let result = ledger.withdraw(alice, Money::from_units(61)).await;
        assert!(matches!(result, Err(LedgerError::InsufficientAvailableFunds)));
        assert_eq!(ledger.balance_of(alice).await, Money::from_units(100));

        ledger.withdraw(alice, Money::from_units(60)).await.unwrap();
        assert_eq!(ledger.available_of(alice).await, Money::ZERO);
        assert_eq!(ledger.locked_of(alice).await, Money::from_units(40));
    }

    #[tokio::test]
    async fn test_unknown_user_reads_zero() {
        let ledger = Ledger::new();
        let ghost = UserId::new([9; 16]);
        assert_eq!(ledger.balance_of(ghost).await, Money::ZERO);
        assert_eq!(ledger.locked_of(ghost).await, Money::ZERO);
        assert!(ledger.wallet_of(ghost).await.is_none());
        assert!(ledger.transactions_for(ghost).await.is_empty());
    }

    #[tokio::test]
    async fn test_bet_locks_funds_and_opens_escrow() {
        let (ledger, alice, _) = funded_ledger().await;
        let m = MatchId::new([9; 16]);

        ledger.place_bet(alice, m, Money::from_units(40)).await.unwrap();

        assert_eq!(ledger.locked_of(alice).await, Money::from_units(40));
        assert_eq!(ledger.available_of(alice).await, Money::from_units(60));
        let escrow = ledger.escrow_for(m).await.unwrap();
        assert_eq!(escrow.amount, Money::from_units(40));
        assert!(!escrow.is_full());
    }

    #[tokio::test]
    async fn test_second_bet_must_match_stake() {
        let (ledger, alice, bob) = funded_ledger().await;
        let m = MatchId::new([9; 16]);
        ledger.place_bet(alice, m, Money::from_units(40)).await.unwrap();

        let result = ledger.place_bet(bob, m, Money::from_units(41)).await;
        assert!(matches!(result, Err(LedgerError::StakeMismatch)));
        assert_eq!(ledger.locked_of(bob).await, Money::ZERO);

        ledger.place_bet(bob, m, Money::from_units(40)).await.unwrap();
        assert!(ledger.escrow_for(m).await.unwrap().is_full());
    }

    #[tokio::test]
    async fn test_double_bet_same_user_rejected() {
        let (ledger, alice, _) = funded_ledger().await;
        let m = MatchId::new([9; 16]);
        ledger.place_bet(alice, m, Money::from_units(40)).await.unwrap();

        let result = ledger.place_bet(alice, m, Money::from_units(40)).await;
        assert!(matches!(result, Err(LedgerError::AlreadyStaked)));
        assert_eq!(ledger.locked_of(alice).await, Money::from_units(40));
    }

    #[tokio::test]
    async fn test_third_bettor_rejected() {
        let (ledger, alice, bob) = funded_ledger().await;
        let carol = UserId::new([3; 16]);
        ledger.deposit(carol, Money::from_units(100)).await.unwrap();
        let m = MatchId::new([9; 16]);
        ledger.place_bet(alice, m, Money::from_units(40)).await.unwrap();
        ledger.place_bet(bob, m, Money::from_units(40)).await.unwrap();

        let result = ledger.place_bet(carol, m, Money::from_units(40)).await;
        assert!(matches!(result, Err(LedgerError::EscrowFull)));
    }

    #[tokio::test]
    async fn test_payout_conserves_funds() {
        let (ledger, alice, bob) = funded_ledger().await;
        let m = MatchId::new([9; 16]);
        ledger.place_bet(alice, m, Money::from_units(40)).await.unwrap();
        ledger.place_bet(bob, m, Money::from_units(40)).await.unwrap();

        let receipt = ledger.process_payout(m, alice).await.unwrap();

        assert_eq!(receipt.pot, Money::from_units(80));
        assert_eq!(receipt.fee, Money::from_units(4));
        assert_eq!(receipt.winnings, Money::from_units(76));
        // winnings + fee covers the pot exactly
        assert_eq!(
            receipt.winnings.checked_add(receipt.fee),
            Some(receipt.pot)
        );

        assert_eq!(ledger.balance_of(alice).await, Money::from_units(136));
        assert_eq!(ledger.balance_of(bob).await, Money::from_units(60));
        assert_eq!(ledger.locked_of(alice).await, Money::ZERO);
        assert_eq!(ledger.locked_of(bob).await, Money::ZERO);
        assert_eq!(ledger.fees_collected().await, Money::from_units(4));
        assert!(ledger.escrow_for(m).await.is_none());
    }

    #[tokio::test]
    async fn test_second_payout_rejected_without_balance_change() {
        let (ledger, alice, bob) = funded_ledger().await;
        let m = MatchId::new([9; 16]);
        ledger.place_bet(alice, m, Money::from_units(40)).await.unwrap();
        ledger.place_bet(bob, m, Money::from_units(40)).await.unwrap();
        ledger.process_payout(m, alice).await.unwrap();

        let result = ledger.process_payout(m, alice).await;
        assert!(matches!(result, Err(LedgerError::EscrowNotFound)));
        assert_eq!(ledger.balance_of(alice).await, Money::from_units(136));
        assert_eq!(ledger.balance_of(bob).await, Money::from_units(60));
    }

    #[tokio::test]
    async fn test_payout_requires_both_stakes() {
        let (ledger, alice, _) = funded_ledger().await;
        let m = MatchId::new([9; 16]);
        ledger.place_bet(alice, m, Money::from_units(40)).await.unwrap();

        let result = ledger.process_payout(m, alice).await;
        assert!(matches!(result, Err(LedgerError::EscrowIncomplete)));
        assert_eq!(ledger.locked_of(alice).await, Money::from_units(40));
    }

    #[tokio::test]
    async fn test_payout_to_outsider_rejected() {
        let (ledger, alice, bob) = funded_ledger().await;
        let m = MatchId::new([9; 16]);
        ledger.place_bet(alice, m, Money::from_units(40)).await.unwrap();
        ledger.place_bet(bob, m, Money::from_units(40)).await.unwrap();

        let result = ledger.process_payout(m, UserId::new([7; 16])).await;
        assert!(matches!(result, Err(LedgerError::WinnerNotStaked)));
        assert!(ledger.escrow_for(m).await.is_some());
    }

    #[tokio::test]
    async fn test_refund_releases_single_stake() {
        let (ledger, alice, _) = funded_ledger().await;
        let m = MatchId::new([9; 16]);
        ledger.place_bet(alice, m, Money::from_units(40)).await.unwrap();

        let tx_ids = ledger.refund_escrow(m).await.unwrap();
        assert_eq!(tx_ids.len(), 1);
        assert_eq!(ledger.balance_of(alice).await, Money::from_units(100));
        assert_eq!(ledger.locked_of(alice).await, Money::ZERO);
        assert!(ledger.escrow_for(m).await.is_none());

        let result = ledger.refund_escrow(m).await;
        assert!(matches!(result, Err(LedgerError::EscrowNotFound)));
    }

    #[tokio::test]
    async fn test_refund_releases_both_stakes() {
        let (ledger, alice, bob) = funded_ledger().await;
        let m = MatchId::new([9; 16]);
        ledger.place_bet(alice, m, Money::from_units(40)).await.unwrap();
        ledger.place_bet(bob, m, Money::from_units(40)).await.unwrap();

        let tx_ids = ledger.refund_escrow(m).await.unwrap();
        assert_eq!(tx_ids.len(), 2);
        assert_eq!(ledger.available_of(alice).await, Money::from_units(100));
        assert_eq!(ledger.available_of(bob).await, Money::from_units(100));
    }

    #[tokio::test]
    async fn test_audit_trail_newest_first() {
        let (ledger, alice, bob) = funded_ledger().await;
        let m = MatchId::new([9; 16]);
        ledger.place_bet(alice, m, Money::from_units(40)).await.unwrap();
        ledger.place_bet(bob, m, Money::from_units(40)).await.unwrap();
        ledger.process_payout(m, alice).await.unwrap();

        let trail = ledger.transactions_for(alice).await;
        let kinds: Vec<_> = trail.iter().map(|tx| tx.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TransactionKind::Win,
                TransactionKind::Bet,
                TransactionKind::Deposit
            ]
        );
        // Bob's records are not in Alice's trail
        assert!(trail.iter().all(|tx| tx.user_id == alice));
        assert_eq!(ledger.transaction_count().await, 5);
    }

    #[tokio::test]
    async fn test_fees_accumulate_across_matches() {
        let (ledger, alice, bob) = funded_ledger().await;
        for seed in 0..3u8 {
            let m = MatchId::new([seed + 10; 16]);
            ledger.place_bet(alice, m, Money::from_units(10)).await.unwrap();
            ledger.place_bet(bob, m, Money::from_units(10)).await.unwrap();
            ledger.process_payout(m, bob).await.unwrap();
        }
        // Three 20.00 pots at 5% each
        assert_eq!(ledger.fees_collected().await, Money::from_units(3));
    }

    #[tokio::test]
    async fn test_export_restore_round_trip() {
        let (ledger, alice, bob) = funded_ledger().await;
        let m = MatchId::new([9; 16]);
        ledger.place_bet(alice, m, Money::from_units(40)).await.unwrap();
        ledger.place_bet(bob, m, Money::from_units(40)).await.unwrap();

        let export = ledger.export().await;
        let fresh = Ledger::new();
        fresh.restore(export).await.unwrap();

        assert_eq!(fresh.balance_of(alice).await, Money::from_units(100));
        assert_eq!(fresh.locked_of(alice).await, Money::from_units(40));
        assert!(fresh.escrow_for(m).await.unwrap().is_full());
        assert_eq!(fresh.transaction_count().await, 4);

        // Settlement still works on the restored book
        fresh.process_payout(m, bob).await.unwrap();
        assert_eq!(fresh.balance_of(bob).await, Money::from_units(136));
    }

    #[tokio::test]
    async fn test_restore_rejects_inconsistent_book() {
        let (ledger, alice, _) = funded_ledger().await;
        let m = MatchId::new([9; 16]);
        ledger.place_bet(alice, m, Money::from_units(40)).await.unwrap();

        let mut export = ledger.export().await;
        // Tamper: locked amount no longer matches the escrow record
        if let Some(wallet) = export.wallets.get_mut(&alice) {
            wallet.locked = Money::from_units(10);
        }

        let fresh = Ledger::new();
        let result = fresh.restore(export).await;
        assert!(matches!(result, Err(LedgerError::BookInconsistent)));
        // Book untouched by the failed restore
        assert_eq!(fresh.transaction_count().await, 0);
    }

    #[tokio::test]
    async fn test_restore_rejects_stale_tx_counter() {
        let (ledger, _, _) = funded_ledger().await;
        let mut export = ledger.export().await;
        export.next_tx_id = TxId::FIRST;

        let fresh = Ledger::new();
        assert!(matches!(
            fresh.restore(export).await,
            Err(LedgerError::BookInconsistent)
        ));
    }
}
