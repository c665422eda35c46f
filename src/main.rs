//! Rally Stakes Demo
//!
//! Drives a full wagered match through the platform: registration,
//! deposits, escrow, play, settlement, and a cancelled match, then
//! verifies that every cent is accounted for.

use std::sync::Arc;

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use rally_stakes::{
    GameSnapshot, MatchSettings, MemoryStore, Money, PlatformConfig, StakesPlatform, UserId,
    VERSION,
};

#[tokio::main]
async fn main() {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let config = PlatformConfig::from_env();
    info!("Rally Stakes v{}", VERSION);
    info!(
        "Fee: {} bps, leaderboard TTL: {}s",
        config.fee_bps, config.leaderboard_ttl_secs
    );

    let platform = StakesPlatform::new(config, Arc::new(MemoryStore::new())).await;
    demo_match(&platform).await;
}

/// Run one settled match and one cancelled match, then audit the books.
async fn demo_match(platform: &StakesPlatform) {
    info!("=== Player Setup ===");

    let alice = UserId::from_subject("demo:alice");
    let bob = UserId::from_subject("demo:bob");

    platform
        .register_user(alice, "alice")
        .await
        .expect("register alice");
    platform
        .register_user(bob, "bob")
        .await
        .expect("register bob");

    let deposit = Money::from_units(100);
    platform.deposit(alice, deposit).await.expect("fund alice");
    platform.deposit(bob, deposit).await.expect("fund bob");
    info!("alice and bob each deposited {}", deposit);

    info!("=== Wagered Match ===");

    let stake = Money::from_units(40);
    let match_id = platform
        .create_match(alice, stake, MatchSettings::default())
        .await
        .expect("create match");
    info!("alice opened match {} at stake {}", match_id, stake);

    platform.join_match(match_id, bob).await.expect("join match");
    info!(
        "bob joined; locked balances: alice {} / bob {}",
        platform.locked_of(alice).await,
        platform.locked_of(bob).await
    );

    platform
        .set_player_ready(match_id, alice, true)
        .await
        .expect("ready alice");
    platform
        .set_player_ready(match_id, bob, true)
        .await
        .expect("ready bob");
    info!("both ready: {}", platform.all_ready(match_id).await);

    // Simulated rally: the transport streams snapshots, we keep the last
    let mut snapshot = GameSnapshot::serve();
    for point in 0..5u32 {
        snapshot.seq = u64::from(point) + 1;
        snapshot.ball_x = 0.1 + 0.2 * point as f32;
        if point % 2 == 0 {
            snapshot.creator_score += 1;
        } else {
            snapshot.opponent_score += 1;
        }
        platform.update_game_state(match_id, snapshot).await;
    }
    info!(
        "final rally score {}:{}",
        snapshot.creator_score, snapshot.opponent_score
    );

    let receipt = platform
        .end_match(match_id, alice)
        .await
        .expect("settle match");
    info!(
        "alice wins: pot {}, fee {}, winnings {}",
        receipt.pot, receipt.fee, receipt.winnings
    );

    info!("=== Cancelled Match ===");

    let cancelled = platform
        .create_match(bob, Money::from_units(25), MatchSettings::default())
        .await
        .expect("create second match");
    let refund = platform
        .forfeit_match(cancelled, bob)
        .await
        .expect("cancel match");
    match refund {
        None => info!(
            "bob cancelled match {} before an opponent joined, stake refunded",
            cancelled
        ),
        Some(receipt) => info!("unexpected payout on cancellation: {:?}", receipt),
    }

    info!("=== Standings ===");

    for entry in platform.leaderboard().await {
        info!(
            "#{} {} - {:.0}% over {} matches",
            entry.rank,
            entry.display_name,
            entry.win_rate * 100.0,
            entry.total_matches
        );
    }

    for user in [alice, bob] {
        if let Some(summary) = platform.player_summary(user).await {
            info!(
                "{}: balance {}, available {}, reputation {}",
                summary.display_name, summary.balance, summary.available, summary.reputation
            );
        }
    }

    info!("=== Audit ===");

    let alice_balance = platform.balance_of(alice).await;
    let bob_balance = platform.balance_of(bob).await;
    let fees = platform.fees_collected().await;
    info!(
        "alice {}, bob {}, platform fees {}",
        alice_balance, bob_balance, fees
    );

    let total = alice_balance
        .checked_add(bob_balance)
        .and_then(|t| t.checked_add(fees));
    let deposited = deposit.checked_add(deposit);
    if total == deposited {
        info!("CONSERVATION VERIFIED: every cent accounted for");
    } else {
        info!("CONSERVATION FAILURE: {:?} != {:?}", total, deposited);
    }
}
