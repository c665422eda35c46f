//! Core settlement primitives.
//!
//! Exact money arithmetic and the identifier newtypes every registry is
//! keyed by. Nothing in this module holds state or takes a lock.

pub mod ids;
pub mod money;

// Re-export core types
pub use ids::{MatchId, TxId, UserId};
pub use money::{fee_on, split_pot, Money, PotSplit, DEFAULT_FEE_BPS};
