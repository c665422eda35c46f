//! Settlement benchmarks
//!
//! Measures the money paths a live deployment leans on: pot math,
//! the full escrow-and-payout cycle, and a leaderboard recompute.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::Rng;

use rally_stakes::{
    core::money::split_pot, Ledger, MatchId, Money, StatsRegistry, UserId, DEFAULT_FEE_BPS,
};

fn bench_pot_math(c: &mut Criterion) {
    c.bench_function("split_pot", |b| {
        b.iter(|| {
            let stake = black_box(Money::from_cents(4_025));
            split_pot(stake, black_box(DEFAULT_FEE_BPS))
        })
    });
}

fn bench_settlement_cycle(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("build runtime");
    let alice = UserId::new([1; 16]);
    let bob = UserId::new([2; 16]);

    c.bench_function("deposit_bet_payout_cycle", |b| {
        b.iter(|| {
            rt.block_on(async {
                let ledger = Ledger::with_fee_bps(DEFAULT_FEE_BPS);
                let match_id = MatchId::generate();
                let stake = Money::from_units(40);

                ledger.deposit(alice, Money::from_units(100)).await.unwrap();
                ledger.deposit(bob, Money::from_units(100)).await.unwrap();
                ledger.place_bet(alice, match_id, stake).await.unwrap();
                ledger.place_bet(bob, match_id, stake).await.unwrap();
                black_box(ledger.process_payout(match_id, alice).await.unwrap())
            })
        })
    });
}

fn bench_leaderboard_recompute(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("build runtime");
    let ledger = Arc::new(Ledger::new());
    let stats = Arc::new(StatsRegistry::new(ledger));

    rt.block_on(async {
        let mut rng = rand::thread_rng();
        for i in 0..200u32 {
            let user = UserId::new(rng.gen());
            stats
                .register_user(user, &format!("player-{}", i))
                .await
                .unwrap();
        }
    });

    c.bench_function("leaderboard_recompute_200_users", |b| {
        b.iter(|| {
            rt.block_on(async {
                stats.clear_cache().await;
                black_box(stats.leaderboard().await)
            })
        })
    });
}

criterion_group!(
    benches,
    bench_pot_math,
    bench_settlement_cycle,
    bench_leaderboard_recompute
);
criterion_main!(benches);
