//! Shared fixtures for integration tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use ton_rewards::{
    UserId,
    bonus::BonusManager,
    clock::ManualClock,
    db::{LedgerStore, MemoryLedgerStore},
    game::GameManager,
    leaderboard::{LeaderboardConfig, LeaderboardManager},
    score::ScoreManager,
    stats::StatsManager,
    users::{DEFAULT_STARTING_FUNDS, NewUser, UserManager},
    wallet::WalletManager,
};

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 28, 9, 0, 0).unwrap()
}

/// Every manager wired to one in-memory store and one manual clock
pub struct Ledger {
    pub store: Arc<MemoryLedgerStore>,
    pub clock: ManualClock,
    pub users: UserManager,
    pub wallets: WalletManager,
    pub games: GameManager,
    pub scores: ScoreManager,
    pub bonuses: BonusManager,
    pub leaderboard: LeaderboardManager,
    pub stats: StatsManager,
}

impl Ledger {
    pub fn new() -> Self {
        Self::with_leaderboard_config(LeaderboardConfig::default())
    }

    pub fn with_leaderboard_config(config: LeaderboardConfig) -> Self {
        let store = Arc::new(MemoryLedgerStore::new());
        let clock = ManualClock::new(start_time());

        let dyn_store: Arc<dyn LedgerStore> = store.clone();
        let dyn_clock = Arc::new(clock.clone());

        Self {
            users: UserManager::new(dyn_store.clone(), dyn_clock.clone(), DEFAULT_STARTING_FUNDS),
            wallets: WalletManager::new(dyn_store.clone(), dyn_clock.clone()),
            games: GameManager::new(dyn_store.clone(), dyn_clock.clone()),
            scores: ScoreManager::new(dyn_store.clone(), dyn_clock.clone()),
            bonuses: BonusManager::new(dyn_store.clone(), dyn_clock.clone()),
            leaderboard: LeaderboardManager::with_config(
                dyn_store.clone(),
                dyn_clock.clone(),
                config,
            ),
            stats: StatsManager::new(dyn_store, dyn_clock),
            store,
            clock,
        }
    }

    pub async fn register(&self, username: &str) -> UserId {
        let (user, _) = self
            .users
            .register(NewUser::new(username))
            .await
            .expect("register user");
        user.id
    }
}
