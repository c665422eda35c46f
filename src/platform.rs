//! Platform composition root
//!
//! `StakesPlatform` wires the three services together and owns the
//! persistence cycle: restore once at construction, commit after every
//! mutation that changes money, identity, or match state. Ephemeral
//! game projections are never persisted.
//!
//! All mutations go through the platform so every committed change
//! reaches the store. Reads delegate straight to the owning service.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::ids::{MatchId, TxId, UserId};
use crate::core::money::{Money, DEFAULT_FEE_BPS};
use crate::ledger::{Ledger, LedgerError, PayoutReceipt, Transaction};
use crate::matches::{
    GameSnapshot, Match, MatchCoordinator, MatchError, MatchSettings, OpenMatch,
};
use crate::stats::{
    LeaderboardEntry, PlayerProfile, PlayerSummary, Preferences, StatsError, StatsRegistry,
    DEFAULT_LEADERBOARD_TTL_SECS,
};
use crate::store::{BlobStore, Snapshot};

/// Store key the platform snapshot lives under.
pub const DEFAULT_STORE_KEY: &str = "rally-stakes:state";

/// Platform configuration.
#[derive(Clone, Debug)]
pub struct PlatformConfig {
    /// Fee retained from each settled pot, in basis points.
    pub fee_bps: u16,
    /// Leaderboard cache lifetime in seconds.
    pub leaderboard_ttl_secs: i64,
    /// Store key for the state snapshot.
    pub store_key: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            fee_bps: DEFAULT_FEE_BPS,
            leaderboard_ttl_secs: DEFAULT_LEADERBOARD_TTL_SECS,
            store_key: DEFAULT_STORE_KEY.to_string(),
        }
    }
}

impl PlatformConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            fee_bps: std::env::var("PLATFORM_FEE_BPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_FEE_BPS),
            leaderboard_ttl_secs: std::env::var("PLATFORM_LEADERBOARD_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_LEADERBOARD_TTL_SECS),
            store_key: std::env::var("PLATFORM_STORE_KEY")
                .unwrap_or_else(|_| DEFAULT_STORE_KEY.to_string()),
        }
    }
}

// =============================================================================
// PLATFORM
// =============================================================================

/// The assembled platform.
pub struct StakesPlatform {
    config: PlatformConfig,
    ledger: Arc<Ledger>,
    stats: Arc<StatsRegistry>,
    matches: Arc<MatchCoordinator>,
    store: Arc<dyn BlobStore>,
}

impl StakesPlatform {
    /// Assemble the services and restore any saved state from the store.
    ///
    /// A missing blob starts the platform empty. A corrupt or
    /// incompatible blob is refused with a warning and the platform
    /// starts empty as well.
    pub async fn new(config: PlatformConfig, store: Arc<dyn BlobStore>) -> Self {
        let ledger = Arc::new(Ledger::with_fee_bps(config.fee_bps));
        let stats = Arc::new(StatsRegistry::with_ttl(
            ledger.clone(),
            chrono::Duration::seconds(config.leaderboard_ttl_secs),
        ));
        let matches = Arc::new(MatchCoordinator::new(ledger.clone(), stats.clone()));

        let platform = Self {
            config,
            ledger,
            stats,
            matches,
            store,
        };
        platform.restore_from_store().await;
        platform
    }

    /// Active configuration.
    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    // =========================================================================
    // PERSISTENCE CYCLE
    // =========================================================================

    async fn restore_from_store(&self) {
        let store = self.store.clone();
        let key = self.config.store_key.clone();
        let loaded = tokio::task::spawn_blocking(move || store.load(&key)).await;

        let blob = match loaded {
            Ok(Ok(Some(blob))) => blob,
            Ok(Ok(None)) => {
                info!("no saved state under '{}', starting fresh", self.config.store_key);
                return;
            }
            Ok(Err(e)) => {
                warn!("state load failed, starting fresh: {:#}", e);
                return;
            }
            Err(e) => {
                warn!("state load task failed, starting fresh: {}", e);
                return;
            }
        };

        let snapshot = match Snapshot::decode(&blob) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("saved state rejected, starting fresh: {}", e);
                return;
            }
        };

        if let Err(e) = self.apply_snapshot(snapshot).await {
            warn!("saved state rejected, starting fresh: {}", e);
            self.reset_to_defaults().await;
            return;
        }
        info!(
            "state restored: {} wallets, {} profiles, {} open matches",
            self.ledger.export().await.wallets.len(),
            self.stats.registered_count().await,
            self.matches.open_match_count().await,
        );
    }

    async fn apply_snapshot(&self, snapshot: Snapshot) -> anyhow::Result<()> {
        self.ledger.restore(snapshot.ledger).await?;
        self.stats.restore(snapshot.stats).await?;
        self.matches.restore(snapshot.matches).await?;
        Ok(())
    }

    /// Drop any partially applied restore.
    async fn reset_to_defaults(&self) {
        self.ledger.restore(Default::default()).await.ok();
        self.stats.restore(Default::default()).await.ok();
        self.matches.restore(Default::default()).await.ok();
    }

    /// Write the current state through to the store.
    ///
    /// Non-fatal: the in-memory commit stands even when the store
    /// rejects the write, which is logged and otherwise ignored.
    async fn commit(&self) {
        let snapshot = Snapshot {
            ledger: self.ledger.export().await,
            stats: self.stats.export().await,
            matches: self.matches.export().await,
        };
        let blob = match snapshot.encode() {
            Ok(blob) => blob,
            Err(e) => {
                warn!("state snapshot encode failed: {}", e);
                return;
            }
        };

        let bytes = blob.len();
        let store = self.store.clone();
        let key = self.config.store_key.clone();
        match tokio::task::spawn_blocking(move || store.save(&key, &blob)).await {
            Ok(Ok(())) => debug!("state committed ({} bytes)", bytes),
            Ok(Err(e)) => warn!("state save failed, in-memory state stands: {:#}", e),
            Err(e) => warn!("state save task failed: {}", e),
        }
    }

    // =========================================================================
    // IDENTITY & FUNDS
    // =========================================================================

    /// Register a user profile.
    pub async fn register_user(
        &self,
        user_id: UserId,
        display_name: &str,
    ) -> Result<(), StatsError> {
        self.stats.register_user(user_id, display_name).await?;
        self.commit().await;
        Ok(())
    }

    /// Credit external funds to a wallet.
    pub async fn deposit(&self, user_id: UserId, amount: Money) -> Result<TxId, LedgerError> {
        let tx_id = self.ledger.deposit(user_id, amount).await?;
        self.commit().await;
        Ok(tx_id)
    }

    /// Pay available funds out of a wallet.
    pub async fn withdraw(&self, user_id: UserId, amount: Money) -> Result<TxId, LedgerError> {
        let tx_id = self.ledger.withdraw(user_id, amount).await?;
        self.commit().await;
        Ok(tx_id)
    }

    /// Replace a user's display preferences.
    pub async fn set_preferences(
        &self,
        user_id: UserId,
        preferences: Preferences,
    ) -> Result<(), StatsError> {
        self.stats.set_preferences(user_id, preferences).await?;
        self.commit().await;
        Ok(())
    }

    // =========================================================================
    // MATCH LIFECYCLE
    // =========================================================================

    /// Open a match, escrowing the creator's stake.
    pub async fn create_match(
        &self,
        creator: UserId,
        stake: Money,
        settings: MatchSettings,
    ) -> Result<MatchId, MatchError> {
        let id = self.matches.create_match(creator, stake, settings).await?;
        self.commit().await;
        Ok(id)
    }

    /// Join a pending match, escrowing the joiner's stake.
    pub async fn join_match(&self, match_id: MatchId, player: UserId) -> Result<(), MatchError> {
        self.matches.join_match(match_id, player).await?;
        self.commit().await;
        Ok(())
    }

    /// Settle an active match for the winner.
    pub async fn end_match(
        &self,
        match_id: MatchId,
        winner: UserId,
    ) -> Result<PayoutReceipt, MatchError> {
        let receipt = self.matches.end_match(match_id, winner).await?;
        self.commit().await;
        Ok(receipt)
    }

    /// Forfeit a live match. Active: the opponent takes the pot.
    /// Pending: the creator's stake is refunded.
    pub async fn forfeit_match(
        &self,
        match_id: MatchId,
        player: UserId,
    ) -> Result<Option<PayoutReceipt>, MatchError> {
        let receipt = self.matches.forfeit_match(match_id, player).await?;
        self.commit().await;
        Ok(receipt)
    }

    // =========================================================================
    // EPHEMERAL GAME STATE  (never persisted)
    // =========================================================================

    /// Overwrite a match's live projection.
    pub async fn update_game_state(&self, match_id: MatchId, snapshot: GameSnapshot) {
        self.matches.update_game_state(match_id, snapshot).await;
    }

    /// Put a match's live projection back to the serve state.
    pub async fn reset_match(&self, match_id: MatchId) {
        self.matches.reset_match(match_id).await;
    }

    /// Current live projection.
    pub async fn game_state(&self, match_id: MatchId) -> Option<GameSnapshot> {
        self.matches.game_state(match_id).await
    }

    /// Record a participant's readiness.
    pub async fn set_player_ready(
        &self,
        match_id: MatchId,
        player: UserId,
        ready: bool,
    ) -> Result<(), MatchError> {
        self.matches.set_player_ready(match_id, player, ready).await
    }

    /// True once both participants are ready.
    pub async fn all_ready(&self, match_id: MatchId) -> bool {
        self.matches.all_ready(match_id).await
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Wallet balance.
    pub async fn balance_of(&self, user_id: UserId) -> Money {
        self.ledger.balance_of(user_id).await
    }

    /// Escrow-locked portion of the balance.
    pub async fn locked_of(&self, user_id: UserId) -> Money {
        self.ledger.locked_of(user_id).await
    }

    /// Unlocked funds.
    pub async fn available_of(&self, user_id: UserId) -> Money {
        self.ledger.available_of(user_id).await
    }

    /// A user's transactions, newest first.
    pub async fn transactions_for(&self, user_id: UserId) -> Vec<Transaction> {
        self.ledger.transactions_for(user_id).await
    }

    /// Cumulative platform revenue.
    pub async fn fees_collected(&self) -> Money {
        self.ledger.fees_collected().await
    }

    /// A user's profile.
    pub async fn profile(&self, user_id: UserId) -> Option<PlayerProfile> {
        self.stats.profile(user_id).await
    }

    /// Profile counters joined with wallet figures.
    pub async fn player_summary(&self, user_id: UserId) -> Option<PlayerSummary> {
        self.stats.player_summary(user_id).await
    }

    /// A user's stored display preferences.
    pub async fn preferences(&self, user_id: UserId) -> Option<Preferences> {
        self.stats.preferences(user_id).await
    }

    /// Ranked users, served from cache while fresh.
    pub async fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.stats.leaderboard().await
    }

    /// Force the next leaderboard read to recompute.
    pub async fn clear_leaderboard_cache(&self) {
        self.stats.clear_cache().await
    }

    /// Point-in-time copy of a match in any state.
    pub async fn find_match(&self, match_id: MatchId) -> Option<Match> {
        self.matches.find_match(match_id).await
    }

    /// Joinable matches for the lobby.
    pub async fn open_matches(&self) -> Vec<OpenMatch> {
        self.matches.open_matches().await
    }

    /// A user's completed matches, newest first.
    pub async fn match_history(&self, user_id: UserId) -> Vec<Match> {
        self.matches.match_history(user_id).await
    }
}

// =============================================================================
// TESTS
// =============================================================================
