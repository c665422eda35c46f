//! Match State Definitions
//!
//! The persistent match record and the ephemeral live-game projection.
//! Settlement reads the record; the projection is last-writer-wins
//! display state the realtime transport streams through.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::ids::{MatchId, UserId};
use crate::core::money::Money;

// =============================================================================
// MATCH STATUS
// =============================================================================

/// Lifecycle state of a match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    /// Created, escrow holds the creator's stake, waiting for an opponent.
    #[default]
    Pending,
    /// Both stakes escrowed, game underway.
    Active,
    /// Settled. Terminal.
    Completed,
}

impl MatchStatus {
    /// Pending or active: the match can still change state.
    pub fn is_live(self) -> bool {
        matches!(self, MatchStatus::Pending | MatchStatus::Active)
    }
}

// =============================================================================
// MATCH SETTINGS
// =============================================================================

/// Ball speed tier, consumed by the game transport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BallSpeed {
    /// Slower rallies.
    Slow,
    /// Standard pace.
    #[default]
    Normal,
    /// Faster rallies.
    Fast,
}

/// Per-match knobs. Stored with the match and handed to the transport;
/// settlement never interprets them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSettings {
    /// Points needed to win.
    pub target_score: u32,
    /// Ball speed tier.
    pub ball_speed: BallSpeed,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            target_score: 5,
            ball_speed: BallSpeed::Normal,
        }
    }
}

// =============================================================================
// MATCH
// =============================================================================

/// One contest between two players.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Match identifier.
    pub id: MatchId,
    /// Lifecycle state.
    pub status: MatchStatus,
    /// Player who opened the match.
    pub creator: UserId,
    /// Player who joined, set on activation.
    pub opponent: Option<UserId>,
    /// Per-player stake.
    pub stake: Money,
    /// Game settings.
    #[serde(default)]
    pub settings: MatchSettings,
    /// Creator's score, final once completed.
    pub creator_score: u32,
    /// Opponent's score, final once completed.
    pub opponent_score: u32,
    /// Winner, set at settlement. Stays None for a cancelled match.
    pub winner: Option<UserId>,
    /// When the match was created.
    pub created_at: DateTime<Utc>,
    /// When the opponent joined.
    pub started_at: Option<DateTime<Utc>>,
    /// When the match settled.
    pub ended_at: Option<DateTime<Utc>>,
}

impl Match {
    /// Fresh pending match with no opponent.
    pub fn new(id: MatchId, creator: UserId, stake: Money, settings: MatchSettings) -> Self {
        Self {
            id,
            status: MatchStatus::Pending,
            creator,
            opponent: None,
            stake,
            settings,
            creator_score: 0,
            opponent_score: 0,
            winner: None,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
        }
    }

    /// True if the user plays in this match.
    pub fn is_participant(&self, user: UserId) -> bool {
        self.creator == user || self.opponent == Some(user)
    }

    /// The other participant, if both are known.
    pub fn opponent_of(&self, user: UserId) -> Option<UserId> {
        if user == self.creator {
            self.opponent
        } else if self.opponent == Some(user) {
            Some(self.creator)
        } else {
            None
        }
    }
}

// =============================================================================
// GAME SNAPSHOT
// =============================================================================

/// Ephemeral projection of the live game.
///
/// Non-financial, last-writer-wins, never persisted. Positions are
/// normalized court coordinates in 0.0..=1.0 as the transport streams
/// them; nothing in settlement reads them back.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Ball position across the court.
    pub ball_x: f32,
    /// Ball position along the court.
    pub ball_y: f32,
    /// Ball velocity, court units per tick.
    pub ball_vx: f32,
    /// Ball velocity, court units per tick.
    pub ball_vy: f32,
    /// Creator paddle position.
    pub creator_paddle: f32,
    /// Opponent paddle position.
    pub opponent_paddle: f32,
    /// Creator's live score.
    pub creator_score: u32,
    /// Opponent's live score.
    pub opponent_score: u32,
    /// Sender's frame sequence, for staleness debugging only.
    pub seq: u64,
}

impl GameSnapshot {
    /// Initial serve state: ball centered, paddles centered, love all.
    pub fn serve() -> Self {
        Self {
            ball_x: 0.5,
            ball_y: 0.5,
            ball_vx: 0.0,
            ball_vy: 0.0,
            creator_paddle: 0.5,
            opponent_paddle: 0.5,
            creator_score: 0,
            opponent_score: 0,
            seq: 0,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
