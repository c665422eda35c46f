//! # Rally Stakes
//!
//! Coordination core for head-to-head wagered matches: wallets and
//! escrow, match lifecycle, and player standings, settled atomically
//! with real-money conservation guarantees.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    RALLY STAKES CORE                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Shared primitives                         │
//! │  ├── money.rs    - Integer-cents money and pot math          │
//! │  └── ids.rs      - User / match / transaction identifiers    │
//! │                                                              │
//! │  ledger/         - Funds (authoritative)                     │
//! │  ├── wallet.rs   - Balance with escrow-locked portion        │
//! │  ├── escrow.rs   - Per-match stake holdings                  │
//! │  ├── transaction.rs - Immutable audit records                │
//! │  └── mod.rs      - Deposits, bets, payouts, refunds          │
//! │                                                              │
//! │  matches/        - Lifecycle (orchestrating)                 │
//! │  ├── state.rs    - Match record and live game snapshot       │
//! │  └── mod.rs      - Create / join / settle / forfeit          │
//! │                                                              │
//! │  stats/          - Standings (derived)                       │
//! │  ├── profile.rs  - Per-player counters and preferences       │
//! │  ├── leaderboard.rs - TTL-cached rankings                    │
//! │  └── mod.rs      - Registration and result recording         │
//! │                                                              │
//! │  store/          - Persistence seam                          │
//! │  ├── snapshot.rs - Versioned, checksummed state blob         │
//! │  └── mod.rs      - BlobStore trait and MemoryStore           │
//! │                                                              │
//! │  platform.rs     - Composition root and commit cycle         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Settlement Guarantee
//!
//! Money moves under one ledger lock and either fully commits or
//! leaves every balance untouched:
//! - All amounts are integer cents; fee math floors through u128
//! - `winnings + fee == stake × 2` for every settled match
//! - Escrow holdings are removed exactly once, so a match cannot
//!   pay out twice
//! - `0 <= locked <= balance` holds for every wallet at all times
//!
//! Registries iterate in BTreeMap order, so listings and exports are
//! deterministic for a given state.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod ledger;
pub mod matches;
pub mod platform;
pub mod stats;
pub mod store;

// Re-export commonly used types
pub use core::ids::{MatchId, TxId, UserId};
pub use core::money::{Money, PotSplit, DEFAULT_FEE_BPS};
pub use ledger::{Ledger, LedgerError, PayoutReceipt};
pub use matches::{GameSnapshot, Match, MatchCoordinator, MatchError, MatchSettings, MatchStatus};
pub use platform::{PlatformConfig, StakesPlatform};
pub use stats::{LeaderboardEntry, PlayerProfile, StatsError, StatsRegistry};
pub use store::{BlobStore, MemoryStore, Snapshot};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
