//! Match Coordinator
//!
//! Owns match lifecycle and orchestrates the ledger and stats services
//! at each transition:
//!
//! ```text
//! Pending --(opponent joins, stake escrowed)--> Active
//! Active  --(winner designated)--> Completed
//! Pending | Active --(forfeit)--> Completed
//! ```
//!
//! Each open match sits behind its own lock, held across the whole
//! settlement chain, so a second settlement attempt observes the
//! completed state and nothing in between. Live game snapshots go
//! through a separate map and never touch a settlement lock.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::core::ids::{MatchId, UserId};
use crate::core::money::Money;
use crate::ledger::{Ledger, LedgerError, PayoutReceipt};
use crate::stats::{MatchOutcome, StatsRegistry};

pub mod state;

pub use state::{BallSpeed, GameSnapshot, Match, MatchSettings, MatchStatus};

/// Coordinator errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MatchError {
    /// No match with that id in the required state.
    #[error("Match not found")]
    MatchNotFound,

    /// The player's available balance does not cover the stake.
    #[error("Insufficient funds for the stake")]
    InsufficientFunds,

    /// A match needs two distinct players.
    #[error("Cannot join your own match")]
    SamePlayer,

    /// The acting player is not in the match.
    #[error("Player is not a participant")]
    NotAParticipant,

    /// The designated winner is not a participant.
    #[error("Winner is not a participant")]
    UnknownWinner,

    /// Restored registry contradicts itself; the import was refused.
    #[error("Match registry is inconsistent")]
    RegistryInconsistent,

    /// Ledger failure during a bet or settlement.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// The coordinator surfaces short funds as its own error kind.
fn map_bet_error(e: LedgerError) -> MatchError {
    match e {
        LedgerError::InsufficientAvailableFunds => MatchError::InsufficientFunds,
        other => MatchError::Ledger(other),
    }
}

/// Lobby row for a joinable match.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenMatch {
    /// Match identifier.
    pub id: MatchId,
    /// Player waiting for an opponent.
    pub creator: UserId,
    /// Stake required to join.
    pub stake: Money,
    /// When the match was opened.
    pub created_at: chrono::DateTime<Utc>,
}

/// Serializable copy of the match registry, for snapshot save/restore.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MatchExport {
    /// Pending and active matches.
    #[serde(default)]
    pub open: BTreeMap<MatchId, Match>,
    /// Completed matches.
    #[serde(default)]
    pub history: BTreeMap<MatchId, Match>,
}

// =============================================================================
// MATCH COORDINATOR
// =============================================================================

/// The match lifecycle service.
pub struct MatchCoordinator {
    ledger: Arc<Ledger>,
    stats: Arc<StatsRegistry>,
    /// Pending and active matches, each behind its own lock.
    open: RwLock<BTreeMap<MatchId, Arc<RwLock<Match>>>>,
    /// Completed matches.
    history: RwLock<BTreeMap<MatchId, Match>>,
    /// Ephemeral live-game projections. Never holds a settlement lock.
    live: RwLock<BTreeMap<MatchId, GameSnapshot>>,
    /// Readiness per match, consumed by the game transport.
    ready: RwLock<BTreeMap<MatchId, BTreeSet<UserId>>>,
}

impl MatchCoordinator {
    /// New coordinator over the given ledger and stats services.
    pub fn new(ledger: Arc<Ledger>, stats: Arc<StatsRegistry>) -> Self {
        Self {
            ledger,
            stats,
            open: RwLock::new(BTreeMap::new()),
            history: RwLock::new(BTreeMap::new()),
            live: RwLock::new(BTreeMap::new()),
            ready: RwLock::new(BTreeMap::new()),
        }
    }

    /// Open a pending match and escrow the creator's stake.
    ///
    /// The stake is escrowed before the match is published: a joiner
    /// only ever sees a match whose escrow exists, and a failed bet
    /// publishes nothing.
    pub async fn create_match(
        &self,
        creator: UserId,
        stake: Money,
        settings: MatchSettings,
    ) -> Result<MatchId, MatchError> {
        let id = MatchId::generate();
        self.ledger
            .place_bet(creator, id, stake)
            .await
            .map_err(map_bet_error)?;

        let entry = Arc::new(RwLock::new(Match::new(id, creator, stake, settings)));
        self.open.write().await.insert(id, entry);
        self.live.write().await.insert(id, GameSnapshot::serve());

        info!("match {} created by {} at stake {}", id, creator, stake);
        Ok(id)
    }

    /// Join a pending match: escrow the joiner's stake and go active.
    pub async fn join_match(&self, match_id: MatchId, player: UserId) -> Result<(), MatchError> {
        let entry = self
            .open_entry(match_id)
            .await
            .ok_or(MatchError::MatchNotFound)?;
        let mut m = entry.write().await;

        if m.status != MatchStatus::Pending {
            return Err(MatchError::MatchNotFound);
        }
        if m.creator == player {
            return Err(MatchError::SamePlayer);
        }
        if self.ledger.available_of(player).await < m.stake {
            return Err(MatchError::InsufficientFunds);
        }

        self.ledger
            .place_bet(player, match_id, m.stake)
            .await
            .map_err(map_bet_error)?;
        m.opponent = Some(player);
        m.status = MatchStatus::Active;
        m.started_at = Some(Utc::now());

        info!("match {} joined by {}, now active", match_id, player);
        Ok(())
    }

    /// Settle an active match for the designated winner.
    ///
    /// Runs payout, completion, and both stats updates under the held
    /// match lock. A payout failure leaves the match active and the
    /// escrow intact, so the call can simply be retried.
    pub async fn end_match(
        &self,
        match_id: MatchId,
        winner: UserId,
    ) -> Result<PayoutReceipt, MatchError> {
        let entry = self
            .open_entry(match_id)
            .await
            .ok_or(MatchError::MatchNotFound)?;
        let mut m = entry.write().await;

        if m.status != MatchStatus::Active {
            return Err(MatchError::MatchNotFound);
        }
        if !m.is_participant(winner) {
            return Err(MatchError::UnknownWinner);
        }

        self.settle(&mut m, winner).await
    }

    /// Forfeit a live match.
    ///
    /// Forfeiting an active match awards the other player the pot.
    /// Forfeiting a pending match cancels it: the creator's stake is
    /// refunded, no winner, no stats.
    pub async fn forfeit_match(
        &self,
        match_id: MatchId,
        player: UserId,
    ) -> Result<Option<PayoutReceipt>, MatchError> {
        let entry = self
            .open_entry(match_id)
            .await
            .ok_or(MatchError::MatchNotFound)?;
        let mut m = entry.write().await;

        match m.status {
            MatchStatus::Active => {
                if !m.is_participant(player) {
                    return Err(MatchError::NotAParticipant);
                }
                let winner = m.opponent_of(player).ok_or(MatchError::UnknownWinner)?;
                warn!("match {} forfeited by {}", match_id, player);
                self.settle(&mut m, winner).await.map(Some)
            }
            MatchStatus::Pending => {
                if m.creator != player {
                    return Err(MatchError::NotAParticipant);
                }
                self.ledger.refund_escrow(match_id).await?;
                m.status = MatchStatus::Completed;
                m.ended_at = Some(Utc::now());
                self.retire(m.clone()).await;
                info!("match {} cancelled by creator, stake refunded", match_id);
                Ok(None)
            }
            MatchStatus::Completed => Err(MatchError::MatchNotFound),
        }
    }

    /// Payout, completion, retirement, and stats, in that order, all
    /// under the caller's held match lock.
    async fn settle(&self, m: &mut Match, winner: UserId) -> Result<PayoutReceipt, MatchError> {
        let loser = m.opponent_of(winner).ok_or(MatchError::UnknownWinner)?;

        let receipt = self.ledger.process_payout(m.id, winner).await?;

        if let Some(snap) = self.live.read().await.get(&m.id) {
            m.creator_score = snap.creator_score;
            m.opponent_score = snap.opponent_score;
        }
        m.status = MatchStatus::Completed;
        m.winner = Some(winner);
        m.ended_at = Some(Utc::now());
        self.retire(m.clone()).await;

        let stake = m.stake;
        self.stats
            .record_result(winner, MatchOutcome { match_id: m.id, won: true, stake })
            .await;
        self.stats
            .record_result(loser, MatchOutcome { match_id: m.id, won: false, stake })
            .await;

        info!(
            "match {} settled: {} takes {} (fee {})",
            m.id, winner, receipt.winnings, receipt.fee
        );
        Ok(receipt)
    }

    /// Move a completed match out of the open set and drop its
    /// ephemeral state.
    async fn retire(&self, m: Match) {
        let id = m.id;
        self.open.write().await.remove(&id);
        self.history.write().await.insert(id, m);
        self.live.write().await.remove(&id);
        self.ready.write().await.remove(&id);
    }

    async fn open_entry(&self, match_id: MatchId) -> Option<Arc<RwLock<Match>>> {
        let open = self.open.read().await;
        open.get(&match_id).cloned()
    }

    // =========================================================================
    // EPHEMERAL GAME STATE
    // =========================================================================

    /// Overwrite the live projection for a match. Last writer wins;
    /// an unknown or settled match is ignored.
    pub async fn update_game_state(&self, match_id: MatchId, snapshot: GameSnapshot) {
        let mut live = self.live.write().await;
        match live.get_mut(&match_id) {
            Some(slot) => *slot = snapshot,
            None => debug!("game state for unknown match {} ignored", match_id),
        }
    }

    /// Put the live projection back to the initial serve state.
    pub async fn reset_match(&self, match_id: MatchId) {
        let mut live = self.live.write().await;
        match live.get_mut(&match_id) {
            Some(slot) => {
                *slot = GameSnapshot::serve();
                debug!("match {} reset to serve", match_id);
            }
            None => debug!("reset for unknown match {} ignored", match_id),
        }
    }

    /// Current live projection, if the match is open.
    pub async fn game_state(&self, match_id: MatchId) -> Option<GameSnapshot> {
        let live = self.live.read().await;
        live.get(&match_id).copied()
    }

    // =========================================================================
    // READINESS
    // =========================================================================

    /// Record a participant's readiness for the game transport.
    pub async fn set_player_ready(
        &self,
        match_id: MatchId,
        player: UserId,
        ready: bool,
    ) -> Result<(), MatchError> {
        let entry = self
            .open_entry(match_id)
            .await
            .ok_or(MatchError::MatchNotFound)?;
        {
            let m = entry.read().await;
            if !m.is_participant(player) {
                return Err(MatchError::NotAParticipant);
            }
        }

        let mut map = self.ready.write().await;
        let set = map.entry(match_id).or_default();
        if ready {
            set.insert(player);
        } else {
            set.remove(&player);
        }
        Ok(())
    }

    /// True once both participants are ready.
    pub async fn all_ready(&self, match_id: MatchId) -> bool {
        let Some(entry) = self.open_entry(match_id).await else {
            return false;
        };
        let (creator, opponent) = {
            let m = entry.read().await;
            match m.opponent {
                Some(opponent) => (m.creator, opponent),
                None => return false,
            }
        };

        let map = self.ready.read().await;
        map.get(&match_id)
            .map(|set| set.contains(&creator) && set.contains(&opponent))
            .unwrap_or(false)
    }

    /// Players currently marked ready, in id order.
    pub async fn ready_players(&self, match_id: MatchId) -> Vec<UserId> {
        let map = self.ready.read().await;
        map.get(&match_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Point-in-time copy of a match in any state.
    pub async fn find_match(&self, match_id: MatchId) -> Option<Match> {
        if let Some(entry) = self.open_entry(match_id).await {
            return Some(entry.read().await.clone());
        }
        let history = self.history.read().await;
        history.get(&match_id).cloned()
    }

    /// Joinable matches for the lobby, oldest first.
    pub async fn open_matches(&self) -> Vec<OpenMatch> {
        let entries: Vec<Arc<RwLock<Match>>> = {
            let open = self.open.read().await;
            open.values().cloned().collect()
        };

        let mut rows = Vec::new();
        for entry in entries {
            let m = entry.read().await;
            if m.status == MatchStatus::Pending {
                rows.push(OpenMatch {
                    id: m.id,
                    creator: m.creator,
                    stake: m.stake,
                    created_at: m.created_at,
                });
            }
        }
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        rows
    }

    /// A player's completed matches, newest first.
    pub async fn match_history(&self, user: UserId) -> Vec<Match> {
        let history = self.history.read().await;
        let mut rows: Vec<Match> = history
            .values()
            .filter(|m| m.is_participant(user))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.ended_at.cmp(&a.ended_at));
        rows
    }

    /// Pending plus active matches.
    pub async fn open_match_count(&self) -> usize {
        let open = self.open.read().await;
        open.len()
    }

    /// Completed matches.
    pub async fn completed_match_count(&self) -> usize {
        let history = self.history.read().await;
        history.len()
    }

    // =========================================================================
    // SNAPSHOT SUPPORT
    // =========================================================================

    /// Copy of the registry for the persistence snapshot. Live
    /// projections and readiness are ephemeral and not exported.
    pub async fn export(&self) -> MatchExport {
        // Clone the entries out first; record locks are never awaited
        // while the registry map is held.
        let entries: Vec<(MatchId, Arc<RwLock<Match>>)> = {
            let open = self.open.read().await;
            open.iter().map(|(id, entry)| (*id, entry.clone())).collect()
        };

        let mut open_out = BTreeMap::new();
        for (id, entry) in entries {
            open_out.insert(id, entry.read().await.clone());
        }
        let history = self.history.read().await.clone();
        MatchExport {
            open: open_out,
            history,
        }
    }

    /// Replace the registry with a restored snapshot.
    ///
    /// Open matches come back behind fresh locks with their live
    /// projections reset to the serve state; readiness starts empty.
    /// Refuses the import (registry unchanged) if any record contradicts
    /// its recorded status.
    pub async fn restore(&self, export: MatchExport) -> Result<(), MatchError> {
        for (id, m) in &export.open {
            let coherent = m.id == *id
                && match m.status {
                    MatchStatus::Pending => m.opponent.is_none() && m.winner.is_none(),
                    MatchStatus::Active => m.opponent.is_some() && m.winner.is_none(),
                    MatchStatus::Completed => false,
                };
            if !coherent {
                warn!("rejecting match restore: open match {} is inconsistent", id);
                return Err(MatchError::RegistryInconsistent);
            }
        }
        for (id, m) in &export.history {
            if m.id != *id || m.status != MatchStatus::Completed || m.ended_at.is_none() {
                warn!("rejecting match restore: history match {} is inconsistent", id);
                return Err(MatchError::RegistryInconsistent);
            }
        }

        let mut open = self.open.write().await;
        let mut history = self.history.write().await;
        let mut live = self.live.write().await;
        let mut ready = self.ready.write().await;

        open.clear();
        live.clear();
        ready.clear();
        for (id, m) in export.open {
            open.insert(id, Arc::new(RwLock::new(m)));
            live.insert(id, GameSnapshot::serve());
        }
        *history = export.history;

        info!(
            "match registry restored: {} open, {} completed",
            open.len(),
            history.len()
        );
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
