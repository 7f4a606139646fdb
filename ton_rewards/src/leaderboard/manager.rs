//! Leaderboard ranker with TTL caching.

use std::{sync::Arc, time::Duration};

use super::{
    errors::LeaderboardResult,
    models::{
        CandidateFilter, GlobalStats, LeaderboardEntry, LeaderboardPage, MAX_LIMIT,
        MAX_TOP_PLAYERS, Period, StatsTotals, TopPlayer, UserPosition,
    },
    ranking,
};
use crate::{
    UserId,
    cache::{CacheStats, TtlCache},
    clock::Clock,
    db::LedgerStore,
    game::GameType,
    score::percentage,
};

/// Cache lifetimes
#[derive(Debug, Clone, Copy)]
pub struct LeaderboardConfig {
    /// Rankings and top players
    pub ranking_ttl: Duration,
    pub global_stats_ttl: Duration,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            ranking_ttl: Duration::from_secs(300),
            global_stats_ttl: Duration::from_secs(600),
        }
    }
}

type RankingKey = (GameType, Period, i64, i64);

/// Leaderboard manager
///
/// Cached results are not invalidated by settlements; a ranking may lag
/// the score ledger by up to its TTL.
#[derive(Clone)]
pub struct LeaderboardManager {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    rankings: Arc<TtlCache<RankingKey, LeaderboardPage>>,
    global_stats: Arc<TtlCache<(Option<GameType>, Period), GlobalStats>>,
    top_players: Arc<TtlCache<(Period, i64), Vec<TopPlayer>>>,
}

impl LeaderboardManager {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_config(store, clock, LeaderboardConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn LedgerStore>,
        clock: Arc<dyn Clock>,
        config: LeaderboardConfig,
    ) -> Self {
        Self {
            store,
            clock,
            rankings: Arc::new(TtlCache::new(config.ranking_ttl)),
            global_stats: Arc::new(TtlCache::new(config.global_stats_ttl)),
            top_players: Arc::new(TtlCache::new(config.ranking_ttl)),
        }
    }

    /// Combined hit/miss counts of all leaderboard caches
    pub fn cache_stats(&self) -> CacheStats {
        [
            self.rankings.stats(),
            self.global_stats.stats(),
            self.top_players.stats(),
        ]
        .into_iter()
        .fold(CacheStats::default(), |acc, s| CacheStats {
            hits: acc.hits + s.hits,
            misses: acc.misses + s.misses,
        })
    }

    fn candidates(&self, game_type: GameType, period: Period) -> CandidateFilter {
        CandidateFilter {
            game_type,
            since: period.floor(self.clock.now()),
        }
    }

    /// One page of the ranking for a game type
    ///
    /// `limit` is clamped to `1..=100` and negative offsets count as zero.
    /// Ranks are `offset + index + 1`.
    pub async fn rank(
        &self,
        game_type: GameType,
        period: Period,
        limit: i64,
        offset: i64,
    ) -> LeaderboardResult<LeaderboardPage> {
        let limit = ranking::clamp_limit(limit, MAX_LIMIT);
        let offset = offset.max(0);
        let key = (game_type, period, limit, offset);

        if let Some(page) = self.rankings.get(&key) {
            return Ok(page);
        }

        let filter = self.candidates(game_type, period);
        let rows = self.store.leaderboard_window(&filter, limit, offset).await?;
        let total = self.store.count_candidates(&filter, None).await?;

        let entries = rows
            .iter()
            .enumerate()
            .map(|(index, row)| LeaderboardEntry::new(offset + index as i64 + 1, row))
            .collect();

        let page = LeaderboardPage {
            game_type,
            period,
            entries,
            total,
            limit,
            offset,
        };
        self.rankings.insert(key, page.clone());
        Ok(page)
    }

    /// Position of one user; never cached
    ///
    /// Users with equal totals share a position.
    pub async fn position(
        &self,
        user_id: UserId,
        game_type: GameType,
        period: Period,
    ) -> LeaderboardResult<UserPosition> {
        let filter = self.candidates(game_type, period);
        let total_players = self.store.count_candidates(&filter, None).await?;

        let own = self
            .store
            .scores(user_id, Some(game_type))
            .await?
            .into_iter()
            .find(|score| filter.admits(score));

        let (position, user_score) = match own {
            Some(score) => {
                let higher = self
                    .store
                    .count_candidates(&filter, Some(score.total_score))
                    .await?;
                (Some(higher + 1), Some(score.total_score))
            }
            None => (None, None),
        };

        Ok(UserPosition {
            game_type,
            period,
            position,
            total_players,
            user_score,
        })
    }

    /// Per-game aggregates, for one game type or all of them
    pub async fn global_stats(
        &self,
        game_type: Option<GameType>,
        period: Period,
    ) -> LeaderboardResult<GlobalStats> {
        let key = (game_type, period);
        if let Some(stats) = self.global_stats.get(&key) {
            return Ok(stats);
        }

        let games = self
            .store
            .global_score_stats(game_type, period.floor(self.clock.now()))
            .await?;
        let stats = GlobalStats {
            period,
            game_type,
            totals: StatsTotals::from_games(&games),
            games,
        };
        self.global_stats.insert(key, stats.clone());
        Ok(stats)
    }

    /// Users ranked by total score summed over every game type
    ///
    /// `limit` is clamped to `1..=50`.
    pub async fn top_players(&self, period: Period, limit: i64) -> LeaderboardResult<Vec<TopPlayer>> {
        let limit = ranking::clamp_limit(limit, MAX_TOP_PLAYERS);
        let key = (period, limit);
        if let Some(players) = self.top_players.get(&key) {
            return Ok(players);
        }

        let totals = self
            .store
            .player_totals(period.floor(self.clock.now()), limit)
            .await?;
        let players: Vec<TopPlayer> = totals
            .into_iter()
            .enumerate()
            .map(|(index, totals)| TopPlayer {
                rank: index as i64 + 1,
                user_id: totals.user_id,
                username: totals.username,
                total_score: totals.total_score,
                total_games: totals.total_games,
                total_wins: totals.total_wins,
                win_rate: percentage(totals.total_wins, totals.total_games),
            })
            .collect();

        self.top_players.insert(key, players.clone());
        Ok(players)
    }

    /// Drop every cached result
    pub fn clear_cache(&self) {
        self.rankings.clear();
        self.global_stats.clear();
        self.top_players.clear();
    }
}
