//! Player Profiles
//!
//! Identity record plus cumulative result counters. Win rate and average
//! stake are derived from exact accumulators on read, never stored as
//! rounded floats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::ids::{MatchId, UserId};
use crate::core::money::Money;

/// UI theme choice, stored with the profile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Theme {
    /// Default dark palette.
    #[default]
    Dark,
    /// Light palette.
    Light,
}

/// Display preferences. Stored and persisted here, interpreted by the
/// client only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Sound effects on.
    pub sound: bool,
    /// Haptic feedback on.
    pub haptics: bool,
    /// Color theme.
    pub theme: Theme,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            sound: true,
            haptics: true,
            theme: Theme::Dark,
        }
    }
}

/// Settled result handed to the stats registry after a payout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Match that settled.
    pub match_id: MatchId,
    /// Whether this player took the pot.
    pub won: bool,
    /// The player's stake in the match.
    pub stake: Money,
}

/// One registered player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    /// Owning user.
    pub user_id: UserId,
    /// Name shown on leaderboards.
    pub display_name: String,
    /// Matches won.
    pub wins: u32,
    /// Matches lost.
    pub losses: u32,
    /// Matches settled, wins plus losses.
    pub total_matches: u32,
    /// Lifetime sum of stakes, for the exact average.
    pub total_staked: Money,
    /// Cumulative reputation counter.
    pub reputation: u32,
    /// Display preferences.
    #[serde(default)]
    pub preferences: Preferences,
    /// Settled matches, oldest first.
    #[serde(default)]
    pub match_history: Vec<MatchId>,
    /// Registration sequence number, the leaderboard tie-break.
    pub seq: u64,
    /// When the profile was created.
    pub created_at: DateTime<Utc>,
}

impl PlayerProfile {
    /// Reputation a fresh profile starts with.
    pub const STARTING_REPUTATION: u32 = 100;
    /// Reputation gained per win.
    pub const REPUTATION_PER_WIN: u32 = 5;
    /// Reputation lost per loss, floored at zero.
    pub const REPUTATION_PER_LOSS: u32 = 2;

    /// Fresh profile with zeroed counters and default preferences.
    pub fn new(user_id: UserId, display_name: String, seq: u64) -> Self {
        Self {
            user_id,
            display_name,
            wins: 0,
            losses: 0,
            total_matches: 0,
            total_staked: Money::ZERO,
            reputation: Self::STARTING_REPUTATION,
            preferences: Preferences::default(),
            match_history: Vec::new(),
            seq,
            created_at: Utc::now(),
        }
    }

    /// Fold a settled result into the counters.
    pub fn record(&mut self, outcome: &MatchOutcome) {
        if outcome.won {
            self.wins = self.wins.saturating_add(1);
            self.reputation = self.reputation.saturating_add(Self::REPUTATION_PER_WIN);
        } else {
            self.losses = self.losses.saturating_add(1);
            self.reputation = self.reputation.saturating_sub(Self::REPUTATION_PER_LOSS);
        }
        self.total_matches = self.total_matches.saturating_add(1);
        self.total_staked = self.total_staked.saturating_add(outcome.stake);
        self.match_history.push(outcome.match_id);
    }

    /// Fraction of matches won, 0.0 before the first match. Display only;
    /// ranking compares the exact integer counters.
    pub fn win_rate(&self) -> f64 {
        if self.total_matches == 0 {
            return 0.0;
        }
        f64::from(self.wins) / f64::from(self.total_matches)
    }

    /// Mean stake across settled matches, floored to the cent.
    pub fn avg_stake(&self) -> Money {
        if self.total_matches == 0 {
            return Money::ZERO;
        }
        Money::from_cents(self.total_staked.cents() / u64::from(self.total_matches))
    }

    /// Composite performance score:
    /// `floor((win_rate * 0.6 + (avg_stake / 100) * 0.4) * 100)`.
    ///
    /// Evaluated in integer arithmetic, which reduces to
    /// `floor((15_000 * wins + staked_cents) / (250 * matches))`.
    /// Zero before the first match.
    pub fn composite_score(&self) -> u64 {
        if self.total_matches == 0 {
            return 0;
        }
        let numerator =
            15_000u128 * u128::from(self.wins) + u128::from(self.total_staked.cents());
        let denominator = 250u128 * u128::from(self.total_matches);
        (numerator / denominator) as u64
    }

    /// Total count normalized for cross-multiplied rate comparison.
    /// A zero-match profile compares as an exact 0/1 rate.
    pub(crate) fn rate_denominator(&self) -> u32 {
        self.total_matches.max(1)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> PlayerProfile {
        PlayerProfile::new(UserId::new([1; 16]), "alice".to_string(), 0)
    }

    fn outcome(won: bool, stake_units: u64) -> MatchOutcome {
        MatchOutcome {
            match_id: MatchId::new([9; 16]),
            won,
            stake: Money::from_units(stake_units),
        }
    }

    #[test]
    fn test_fresh_profile_defaults() {
        let p = profile();
        assert_eq!(p.wins, 0);
        assert_eq!(p.total_matches, 0);
        assert_eq!(p.reputation, PlayerProfile::STARTING_REPUTATION);
        assert_eq!(p.win_rate(), 0.0);
        assert_eq!(p.avg_stake(), Money::ZERO);
        assert_eq!(p.composite_score(), 0);
        assert!(p.preferences.sound);
        assert_eq!(p.preferences.theme, Theme::Dark);
        assert!(p.match_history.is_empty());
    }

    #[test]
    fn test_record_updates_counters() {
        let mut p = profile();
        p.record(&outcome(true, 40));
        p.record(&outcome(false, 20));

        assert_eq!(p.wins, 1);
        assert_eq!(p.losses, 1);
        assert_eq!(p.total_matches, 2);
        assert_eq!(p.total_staked, Money::from_units(60));
        assert_eq!(p.avg_stake(), Money::from_units(30));
        assert_eq!(p.win_rate(), 0.5);
        assert_eq!(p.match_history.len(), 2);
    }

    #[test]
    fn test_reputation_moves_and_floors() {
        let mut p = profile();
        p.record(&outcome(true, 10));
        assert_eq!(p.reputation, 105);
        p.record(&outcome(false, 10));
        assert_eq!(p.reputation, 103);

        p.reputation = 1;
        p.record(&outcome(false, 10));
        assert_eq!(p.reputation, 0);
    }

    #[test]
    fn test_average_stake_is_exact_mean() {
        // Running-mean recurrence and the stored-sum form must agree
        let mut p = profile();
        let stakes = [33u64, 47, 20, 99, 1];
        for s in stakes {
            p.record(&outcome(true, s));
        }
        let sum: u64 = stakes.iter().sum();
        assert_eq!(p.avg_stake(), Money::from_cents(sum * 100 / stakes.len() as u64));
    }

    #[test]
    fn test_composite_score_weighting() {
        // 4 wins in 5 matches at 50.00 average stake:
        // 0.8 * 0.6 + (50 / 100) * 0.4 = 0.68 -> 68
        let mut p = profile();
        for i in 0..5 {
            p.record(&outcome(i < 4, 50));
        }
        assert_eq!(p.composite_score(), 68);
    }

    #[test]
    fn test_composite_score_rate_only() {
        // Pure win rate, negligible stakes: 1.0 * 0.6 * 100 = 60
        let mut p = profile();
        p.record(&MatchOutcome {
            match_id: MatchId::new([9; 16]),
            won: true,
            stake: Money::from_cents(1),
        });
        assert_eq!(p.composite_score(), 60);
    }

    #[test]
    fn test_preferences_survive_serde_defaults() {
        // A blob from before the preferences field decodes with defaults
        let json = r#"{
            "user_id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "display_name": "alice",
            "wins": 2, "losses": 1, "total_matches": 3,
            "total_staked": 9000, "reputation": 108,
            "seq": 4,
            "created_at": "2025-01-01T00:00:00Z"
        }"#;
        let p: PlayerProfile = serde_json::from_str(json).unwrap();
        assert_eq!(p.preferences, Preferences::default());
        assert!(p.match_history.is_empty());
        assert_eq!(p.wins, 2);
    }
}
