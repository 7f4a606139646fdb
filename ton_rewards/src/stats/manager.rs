//! Stats aggregator.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::{sync::Arc, time::Duration};

use super::{
    errors::{StatsError, StatsResult},
    models::{BonusCounts, StatsWindow, SystemStats, UserOverview},
};
use crate::{
    UserId,
    bonus::BonusFilter,
    cache::{CacheStats, TtlCache},
    clock::Clock,
    db::LedgerStore,
    game::SessionQuery,
    score::ScoreSummary,
};

/// Completed sessions shown in a user overview
const OVERVIEW_SESSIONS: i64 = 10;

pub const DEFAULT_STATS_TTL: Duration = Duration::from_secs(60);

impl StatsWindow {
    /// Midnight UTC of `now` and the trailing seven days
    pub fn at(now: DateTime<Utc>) -> Self {
        let today_start = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc())
            .unwrap_or(now);
        Self {
            today_start,
            week_floor: now - ChronoDuration::days(7),
            now,
        }
    }
}

/// Stats manager
#[derive(Clone)]
pub struct StatsManager {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    system: Arc<TtlCache<(), SystemStats>>,
}

impl StatsManager {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(store, clock, DEFAULT_STATS_TTL)
    }

    pub fn with_ttl(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            system: Arc::new(TtlCache::new(ttl)),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.system.stats()
    }

    /// System-wide rollup
    ///
    /// Sections are read without locks, so totals taken under concurrent
    /// writes need not agree with each other.
    pub async fn system_stats(&self) -> StatsResult<SystemStats> {
        if let Some(stats) = self.system.get(&()) {
            return Ok(stats);
        }

        let window = StatsWindow::at(self.clock.now());
        let stats = self.store.system_stats(&window).await?;
        self.system.insert((), stats.clone());
        Ok(stats)
    }

    /// Admin view of one user
    ///
    /// # Errors
    ///
    /// * `StatsError::UserNotFound` - No such user
    /// * `StatsError::WalletNotFound` - User has no wallet row
    pub async fn user_overview(&self, user_id: UserId) -> StatsResult<UserOverview> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(StatsError::UserNotFound(user_id))?;
        let wallet = self
            .store
            .wallet(user_id)
            .await?
            .ok_or(StatsError::WalletNotFound(user_id))?;

        let scores = self.store.scores(user_id, None).await?;
        let recent_sessions = self
            .store
            .completed_sessions(&SessionQuery {
                user_id,
                limit: Some(OVERVIEW_SESSIONS),
                ..SessionQuery::default()
            })
            .await?;

        let now = self.clock.now();
        let all = BonusFilter::for_user(user_id);
        let bonuses = BonusCounts {
            total: self.store.count_bonuses(&all).await?,
            claimed: self
                .store
                .count_bonuses(&BonusFilter {
                    claimed: Some(true),
                    ..all.clone()
                })
                .await?,
            available: self
                .store
                .count_bonuses(&BonusFilter {
                    available_at: Some(now),
                    ..all
                })
                .await?,
        };

        Ok(UserOverview {
            user,
            wallet,
            scores: ScoreSummary::from_scores(&scores),
            recent_sessions,
            bonuses,
        })
    }

    pub fn clear_cache(&self) {
        self.system.clear();
    }
}
