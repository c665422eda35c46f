//! Leaderboard Cache
//!
//! Ranked snapshot with a time-to-live. Stale entries are never served;
//! explicit invalidation forces recomputation regardless of expiry.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::core::ids::UserId;

/// One ranked row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// Ranked user.
    pub user_id: UserId,
    /// Name shown for the row.
    pub display_name: String,
    /// Rank position, 1 is best.
    pub rank: u32,
    /// Win rate for display. Ordering used the exact counters.
    pub win_rate: f64,
    /// Matches won.
    pub wins: u32,
    /// Matches settled.
    pub total_matches: u32,
}

/// A computed ranking and its expiry.
#[derive(Clone, Debug)]
pub struct LeaderboardCache {
    /// Ranked rows, rank 1 first.
    pub entries: Vec<LeaderboardEntry>,
    /// When the ranking was computed.
    pub computed_at: DateTime<Utc>,
    /// Instant after which the ranking must be recomputed.
    pub expires_at: DateTime<Utc>,
}

impl LeaderboardCache {
    /// Cache a ranking for `ttl` from now.
    pub fn new(entries: Vec<LeaderboardEntry>, ttl: Duration) -> Self {
        let computed_at = Utc::now();
        Self {
            entries,
            computed_at,
            expires_at: computed_at + ttl,
        }
    }

    /// True while the ranking may still be served.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(rank: u32) -> LeaderboardEntry {
        LeaderboardEntry {
            user_id: UserId::new([rank as u8; 16]),
            display_name: format!("player-{rank}"),
            rank,
            win_rate: 0.5,
            wins: 1,
            total_matches: 2,
        }
    }

    #[test]
    fn test_freshness_window() {
        let cache = LeaderboardCache::new(vec![entry(1)], Duration::minutes(5));

        assert!(cache.is_fresh(cache.computed_at));
        assert!(cache.is_fresh(cache.computed_at + Duration::minutes(4)));
        assert!(!cache.is_fresh(cache.expires_at));
        assert!(!cache.is_fresh(cache.expires_at + Duration::seconds(1)));
    }

    #[test]
    fn test_zero_ttl_is_always_stale() {
        let cache = LeaderboardCache::new(vec![], Duration::zero());
        assert!(!cache.is_fresh(Utc::now()));
    }

    #[test]
    fn test_entry_serializes_camel_case() {
        let json = serde_json::to_string(&entry(1)).unwrap();
        assert!(json.contains("\"winRate\""));
        assert!(json.contains("\"displayName\""));
        assert!(json.contains("\"totalMatches\""));
    }
}
