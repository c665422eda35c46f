//! Identity & Stats Service
//!
//! Owns player profiles, result counters, and the leaderboard cache.
//! Ranking never compares floats: win rates are ordered by
//! cross-multiplied integer counters, with registration order breaking
//! ties. Holds a read handle to the ledger for balance reporting only.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::core::ids::UserId;
use crate::core::money::Money;
use crate::ledger::Ledger;

pub mod leaderboard;
pub mod profile;

pub use leaderboard::{LeaderboardCache, LeaderboardEntry};
pub use profile::{MatchOutcome, PlayerProfile, Preferences, Theme};

/// How long a computed leaderboard may be served.
pub const DEFAULT_LEADERBOARD_TTL_SECS: i64 = 300;

/// Stats errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StatsError {
    /// The user id is already registered.
    #[error("User already registered")]
    AlreadyRegistered,

    /// No profile exists for the user id.
    #[error("Unknown user")]
    UnknownUser,

    /// Restored roster contradicts itself; the import was refused.
    #[error("Profile roster is inconsistent")]
    RosterInconsistent,
}

/// Profile counters joined with live wallet figures.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    /// The user.
    pub user_id: UserId,
    /// Display name.
    pub display_name: String,
    /// Matches won.
    pub wins: u32,
    /// Matches lost.
    pub losses: u32,
    /// Matches settled.
    pub total_matches: u32,
    /// Reputation counter.
    pub reputation: u32,
    /// Win rate for display.
    pub win_rate: f64,
    /// Mean stake across settled matches.
    pub avg_stake: Money,
    /// Composite performance score.
    pub score: u64,
    /// Wallet balance, from the ledger.
    pub balance: Money,
    /// Locked portion of the balance.
    pub locked: Money,
    /// Unlocked funds.
    pub available: Money,
}

/// Serializable copy of the roster, for snapshot save/restore.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatsExport {
    /// All profiles.
    #[serde(default)]
    pub profiles: BTreeMap<UserId, PlayerProfile>,
    /// Next registration sequence number.
    #[serde(default)]
    pub next_seq: u64,
}

/// All profile state, guarded by the service lock.
#[derive(Debug)]
struct Roster {
    profiles: BTreeMap<UserId, PlayerProfile>,
    next_seq: u64,
}

/// Descending exact win rate, ties broken by registration order.
fn rank_order(a: &PlayerProfile, b: &PlayerProfile) -> Ordering {
    let lhs = u128::from(a.wins) * u128::from(b.rate_denominator());
    let rhs = u128::from(b.wins) * u128::from(a.rate_denominator());
    rhs.cmp(&lhs).then(a.seq.cmp(&b.seq))
}

// =============================================================================
// STATS SERVICE
// =============================================================================

/// The identity and stats service.
pub struct StatsRegistry {
    ledger: Arc<Ledger>,
    roster: RwLock<Roster>,
    cache: RwLock<Option<LeaderboardCache>>,
    ttl: Duration,
}

impl StatsRegistry {
    /// New empty registry with the default leaderboard TTL.
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self::with_ttl(ledger, Duration::seconds(DEFAULT_LEADERBOARD_TTL_SECS))
    }

    /// New empty registry with a specific leaderboard TTL.
    pub fn with_ttl(ledger: Arc<Ledger>, ttl: Duration) -> Self {
        Self {
            ledger,
            roster: RwLock::new(Roster {
                profiles: BTreeMap::new(),
                next_seq: 0,
            }),
            cache: RwLock::new(None),
            ttl,
        }
    }

    /// Create a profile with zeroed counters and default preferences.
    pub async fn register_user(
        &self,
        user_id: UserId,
        display_name: &str,
    ) -> Result<(), StatsError> {
        let mut roster = self.roster.write().await;
        if roster.profiles.contains_key(&user_id) {
            return Err(StatsError::AlreadyRegistered);
        }
        let seq = roster.next_seq;
        roster.next_seq += 1;
        roster
            .profiles
            .insert(user_id, PlayerProfile::new(user_id, display_name.to_string(), seq));

        info!("registered user {} ({})", display_name, user_id);
        Ok(())
    }

    /// Fold a settled result into a profile.
    ///
    /// Best-effort by contract: an unknown user is logged and skipped, so
    /// a stats inconsistency can never block or reverse a payout. The
    /// cached leaderboard is deliberately left to age out.
    pub async fn record_result(&self, user_id: UserId, outcome: MatchOutcome) {
        let mut roster = self.roster.write().await;
        match roster.profiles.get_mut(&user_id) {
            Some(profile) => {
                profile.record(&outcome);
                debug!(
                    "recorded {} for {} (match {})",
                    if outcome.won { "win" } else { "loss" },
                    user_id,
                    outcome.match_id
                );
            }
            None => {
                warn!("stats update for unknown user {} ignored", user_id);
            }
        }
    }

    /// Point-in-time copy of a profile.
    pub async fn profile(&self, user_id: UserId) -> Option<PlayerProfile> {
        let roster = self.roster.read().await;
        roster.profiles.get(&user_id).cloned()
    }

    /// A user's stored display preferences.
    pub async fn preferences(&self, user_id: UserId) -> Option<Preferences> {
        self.profile(user_id).await.map(|p| p.preferences)
    }

    /// Replace a user's display preferences.
    pub async fn set_preferences(
        &self,
        user_id: UserId,
        preferences: Preferences,
    ) -> Result<(), StatsError> {
        let mut roster = self.roster.write().await;
        let profile = roster
            .profiles
            .get_mut(&user_id)
            .ok_or(StatsError::UnknownUser)?;
        profile.preferences = preferences;
        Ok(())
    }

    /// Composite performance score, None for unknown users.
    pub async fn composite_score(&self, user_id: UserId) -> Option<u64> {
        let roster = self.roster.read().await;
        roster.profiles.get(&user_id).map(|p| p.composite_score())
    }

    /// Profile counters joined with the user's wallet figures.
    pub async fn player_summary(&self, user_id: UserId) -> Option<PlayerSummary> {
        let profile = self.profile(user_id).await?;
        let wallet = self.ledger.wallet_of(user_id).await.unwrap_or_default();
        Some(PlayerSummary {
            user_id,
            display_name: profile.display_name.clone(),
            wins: profile.wins,
            losses: profile.losses,
            total_matches: profile.total_matches,
            reputation: profile.reputation,
            win_rate: profile.win_rate(),
            avg_stake: profile.avg_stake(),
            score: profile.composite_score(),
            balance: wallet.balance,
            locked: wallet.locked,
            available: wallet.available(),
        })
    }

    /// Registered profile count.
    pub async fn registered_count(&self) -> usize {
        let roster = self.roster.read().await;
        roster.profiles.len()
    }

    /// Ranked users, served from cache while fresh.
    pub async fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_fresh(Utc::now()) {
                    return cached.entries.clone();
                }
            }
        }
        self.recompute_leaderboard().await
    }

    /// Drop the cached ranking; the next call recomputes.
    pub async fn clear_cache(&self) {
        *self.cache.write().await = None;
        debug!("leaderboard cache invalidated");
    }

    async fn recompute_leaderboard(&self) -> Vec<LeaderboardEntry> {
        let roster = self.roster.read().await;
        let mut rows: Vec<&PlayerProfile> = roster.profiles.values().collect();
        rows.sort_by(|a, b| rank_order(a, b));

        let entries: Vec<LeaderboardEntry> = rows
            .iter()
            .enumerate()
            .map(|(i, p)| LeaderboardEntry {
                user_id: p.user_id,
                display_name: p.display_name.clone(),
                rank: (i + 1) as u32,
                win_rate: p.win_rate(),
                wins: p.wins,
                total_matches: p.total_matches,
            })
            .collect();
        drop(roster);

        let mut cache = self.cache.write().await;
        *cache = Some(LeaderboardCache::new(entries.clone(), self.ttl));
        debug!("leaderboard recomputed: {} entries", entries.len());
        entries
    }

    // =========================================================================
    // SNAPSHOT SUPPORT
    // =========================================================================

    /// Copy of the roster for the persistence snapshot.
    pub async fn export(&self) -> StatsExport {
        let roster = self.roster.read().await;
        StatsExport {
            profiles: roster.profiles.clone(),
            next_seq: roster.next_seq,
        }
    }

    /// Replace the roster with a restored snapshot.
    ///
    /// Refuses the import (roster unchanged) if sequence numbers collide
    /// or the counter is behind the roster; ties on the leaderboard would
    /// otherwise stop being deterministic.
    pub async fn restore(&self, export: StatsExport) -> Result<(), StatsError> {
        let mut seen = BTreeSet::new();
        for profile in export.profiles.values() {
            if profile.seq >= export.next_seq || !seen.insert(profile.seq) {
                warn!("rejecting stats restore: sequence numbers are inconsistent");
                return Err(StatsError::RosterInconsistent);
            }
        }

        let mut roster = self.roster.write().await;
        roster.profiles = export.profiles;
        roster.next_seq = export.next_seq;
        drop(roster);
        self.clear_cache().await;

        info!("stats restored: {} profiles", self.registered_count().await);
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
