//! PostgreSQL ledger store.
//!
//! Row locks come from `SELECT ... FOR UPDATE`; wallet mutations are single
//! relative `UPDATE` statements, and debits carry their balance check in the
//! `WHERE` clause so they cannot overdraw under concurrency.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    PgConnection, Postgres, Row, Transaction,
    postgres::{PgPool, PgRow},
};
use std::{fmt::Display, str::FromStr, sync::Arc};

use super::{
    errors::{StoreError, StoreResult},
    store::{LedgerStore, LedgerTx},
};
use crate::{
    BonusId, SessionId, UserId,
    bonus::{Bonus, BonusFilter, BonusOrder, NewBonus},
    game::{GameSession, GameType, NewSession, SessionQuery},
    leaderboard::{CandidateFilter, GameTypeStats, PlayerTotals, ScoreWithUser},
    score::Score,
    stats::{BonusCounts, ScoreTotals, SessionCounts, StatsWindow, SystemStats, UserCounts, WalletTotals},
    users::{NewUser, User},
    wallet::{DebitOutcome, Funds, Wallet},
};

const USER_COLUMNS: &str = "id, username, display_name, is_active, is_admin, created_at";

const WALLET_COLUMNS: &str =
    "user_id, balance, gems, diamonds, ton_address, created_at, updated_at";

const SCORE_COLUMNS: &str = "s.user_id, s.game_type, s.score, s.total_score, s.games_played, \
     s.wins, s.losses, s.achievements, s.last_played_at, s.created_at, s.updated_at";

const SESSION_COLUMNS: &str = "id, user_id, game_type, status, score, duration, game_data, \
     ton_earned, gems_earned, diamonds_earned, started_at, completed_at";

const BONUS_COLUMNS: &str = "id, user_id, bonus_type, title, description, ton_amount, \
     gems_amount, diamonds_amount, is_claimed, claimed_at, expires_at, metadata, created_at";

/// Shared `WHERE` clause of bonus reads; binds $1..$4 from a [`BonusFilter`]
const BONUS_FILTER: &str = "($1::BIGINT IS NULL OR user_id = $1) \
     AND ($2::TEXT IS NULL OR bonus_type = $2) \
     AND ($3::BOOLEAN IS NULL OR is_claimed = $3) \
     AND ($4::TIMESTAMPTZ IS NULL OR (is_claimed = FALSE AND (expires_at IS NULL OR expires_at > $4)))";

fn parse_column<T>(row: &PgRow, column: &str) -> StoreResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw: String = row.try_get(column)?;
    raw.parse()
        .map_err(|e| StoreError::Corrupt(format!("{column}: {e}")))
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        display_name: row.try_get("display_name")?,
        is_active: row.try_get("is_active")?,
        is_admin: row.try_get("is_admin")?,
        created_at: row.try_get("created_at")?,
    })
}

fn wallet_from_row(row: &PgRow) -> StoreResult<Wallet> {
    Ok(Wallet {
        user_id: row.try_get("user_id")?,
        balance: row.try_get("balance")?,
        gems: row.try_get("gems")?,
        diamonds: row.try_get("diamonds")?,
        ton_address: row.try_get("ton_address")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn score_from_row(row: &PgRow) -> StoreResult<Score> {
    Ok(Score {
        user_id: row.try_get("user_id")?,
        game_type: parse_column(row, "game_type")?,
        score: row.try_get("score")?,
        total_score: row.try_get("total_score")?,
        games_played: row.try_get("games_played")?,
        wins: row.try_get("wins")?,
        losses: row.try_get("losses")?,
        achievements: row.try_get("achievements")?,
        last_played_at: row.try_get("last_played_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn session_from_row(row: &PgRow) -> StoreResult<GameSession> {
    Ok(GameSession {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        game_type: parse_column(row, "game_type")?,
        status: parse_column(row, "status")?,
        score: row.try_get("score")?,
        duration: row.try_get("duration")?,
        game_data: row.try_get("game_data")?,
        earned: Funds {
            token: row.try_get("ton_earned")?,
            gems: row.try_get("gems_earned")?,
            diamonds: row.try_get("diamonds_earned")?,
        },
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}

fn bonus_from_row(row: &PgRow) -> StoreResult<Bonus> {
    Ok(Bonus {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        bonus_type: parse_column(row, "bonus_type")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        amount: Funds {
            token: row.try_get("ton_amount")?,
            gems: row.try_get("gems_amount")?,
            diamonds: row.try_get("diamonds_amount")?,
        },
        is_claimed: row.try_get("is_claimed")?,
        claimed_at: row.try_get("claimed_at")?,
        expires_at: row.try_get("expires_at")?,
        metadata: row.try_get("metadata")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Ledger store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: Arc<PgPool>,
}

impl PgLedgerStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLedgerTx { tx: Some(tx) }))
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }

    async fn find_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(self.pool.as_ref())
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn wallet(&self, user_id: UserId) -> StoreResult<Option<Wallet>> {
        let sql = format!("SELECT {WALLET_COLUMNS} FROM wallets WHERE user_id = $1");
        let row = sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(self.pool.as_ref())
            .await?;
        row.as_ref().map(wallet_from_row).transpose()
    }

    async fn scores(
        &self,
        user_id: UserId,
        game_type: Option<GameType>,
    ) -> StoreResult<Vec<Score>> {
        let sql = format!(
            "SELECT {SCORE_COLUMNS} FROM scores s \
             WHERE s.user_id = $1 AND ($2::TEXT IS NULL OR s.game_type = $2)"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(game_type.map(|t| t.as_str()))
            .fetch_all(self.pool.as_ref())
            .await?;

        let mut scores = rows.iter().map(score_from_row).collect::<StoreResult<Vec<_>>>()?;
        scores.sort_by_key(|s| s.game_type);
        Ok(scores)
    }

    async fn completed_sessions(&self, query: &SessionQuery) -> StoreResult<Vec<GameSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM game_sessions \
             WHERE user_id = $1 AND status = 'completed' \
               AND ($2::TEXT IS NULL OR game_type = $2) \
               AND ($3::TIMESTAMPTZ IS NULL OR completed_at >= $3) \
             ORDER BY completed_at DESC, id DESC \
             LIMIT $4 OFFSET $5"
        );
        let rows = sqlx::query(&sql)
            .bind(query.user_id)
            .bind(query.game_type.map(|t| t.as_str()))
            .bind(query.completed_since)
            .bind(query.limit)
            .bind(query.offset.max(0))
            .fetch_all(self.pool.as_ref())
            .await?;

        rows.iter().map(session_from_row).collect()
    }

    async fn bonuses(
        &self,
        filter: &BonusFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Bonus>> {
        let order = match filter.order {
            BonusOrder::Newest => "created_at DESC, id DESC",
            BonusOrder::RecentlyClaimed => "claimed_at DESC NULLS LAST, id DESC",
        };
        let sql = format!(
            "SELECT {BONUS_COLUMNS} FROM bonuses WHERE {BONUS_FILTER} \
             ORDER BY {order} LIMIT $5 OFFSET $6"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.user_id)
            .bind(filter.bonus_type.map(|t| t.as_str()))
            .bind(filter.claimed)
            .bind(filter.available_at)
            .bind(limit.max(0))
            .bind(offset.max(0))
            .fetch_all(self.pool.as_ref())
            .await?;

        rows.iter().map(bonus_from_row).collect()
    }

    async fn count_bonuses(&self, filter: &BonusFilter) -> StoreResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM bonuses WHERE {BONUS_FILTER}");
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(filter.user_id)
            .bind(filter.bonus_type.map(|t| t.as_str()))
            .bind(filter.claimed)
            .bind(filter.available_at)
            .fetch_one(self.pool.as_ref())
            .await?;
        Ok(count)
    }

    async fn leaderboard_window(
        &self,
        filter: &CandidateFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<ScoreWithUser>> {
        let sql = format!(
            "SELECT {SCORE_COLUMNS}, u.username FROM scores s \
             JOIN users u ON u.id = s.user_id \
             WHERE s.game_type = $1 AND s.total_score > 0 \
               AND ($2::TIMESTAMPTZ IS NULL OR s.last_played_at >= $2) \
             ORDER BY s.total_score DESC, s.user_id ASC \
             LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.game_type.as_str())
            .bind(filter.since)
            .bind(limit.max(0))
            .bind(offset.max(0))
            .fetch_all(self.pool.as_ref())
            .await?;

        rows.iter()
            .map(|row| {
                Ok(ScoreWithUser {
                    score: score_from_row(row)?,
                    username: row.try_get("username")?,
                })
            })
            .collect()
    }

    async fn count_candidates(
        &self,
        filter: &CandidateFilter,
        above: Option<i64>,
    ) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM scores
            WHERE game_type = $1 AND total_score > 0
              AND ($2::TIMESTAMPTZ IS NULL OR last_played_at >= $2)
              AND ($3::BIGINT IS NULL OR total_score > $3)
            "#,
        )
        .bind(filter.game_type.as_str())
        .bind(filter.since)
        .bind(above)
        .fetch_one(self.pool.as_ref())
        .await?;
        Ok(count)
    }

    async fn global_score_stats(
        &self,
        game_type: Option<GameType>,
        since: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<GameTypeStats>> {
        let rows = sqlx::query(
            r#"
            SELECT game_type,
                   COUNT(DISTINCT user_id) AS total_players,
                   COALESCE(SUM(total_score), 0)::BIGINT AS total_score,
                   COALESCE(SUM(games_played), 0)::BIGINT AS total_games,
                   COALESCE(SUM(wins), 0)::BIGINT AS total_wins,
                   COALESCE(SUM(losses), 0)::BIGINT AS total_losses,
                   ROUND(AVG(total_score), 2)::FLOAT8 AS average_score,
                   COALESCE(MAX(total_score), 0) AS max_score
            FROM scores
            WHERE ($1::TEXT IS NULL OR game_type = $1)
              AND ($2::TIMESTAMPTZ IS NULL OR last_played_at >= $2)
            GROUP BY game_type
            "#,
        )
        .bind(game_type.map(|t| t.as_str()))
        .bind(since)
        .fetch_all(self.pool.as_ref())
        .await?;

        let mut stats = rows
            .iter()
            .map(|row| {
                Ok(GameTypeStats {
                    game_type: parse_column(row, "game_type")?,
                    total_players: row.try_get("total_players")?,
                    total_score: row.try_get("total_score")?,
                    total_games: row.try_get("total_games")?,
                    total_wins: row.try_get("total_wins")?,
                    total_losses: row.try_get("total_losses")?,
                    average_score: row.try_get("average_score")?,
                    max_score: row.try_get("max_score")?,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;
        stats.sort_by_key(|s| s.game_type);
        Ok(stats)
    }

    async fn player_totals(
        &self,
        since: Option<DateTime<Utc>>,
        limit: i64,
    ) -> StoreResult<Vec<PlayerTotals>> {
        let rows = sqlx::query(
            r#"
            SELECT s.user_id, u.username,
                   SUM(s.total_score)::BIGINT AS total_score,
                   SUM(s.games_played)::BIGINT AS total_games,
                   SUM(s.wins)::BIGINT AS total_wins
            FROM scores s
            JOIN users u ON u.id = s.user_id
            WHERE ($1::TIMESTAMPTZ IS NULL OR s.last_played_at >= $1)
            GROUP BY s.user_id, u.username
            ORDER BY total_score DESC, s.user_id ASC
            LIMIT $2
            "#,
        )
        .bind(since)
        .bind(limit.max(0))
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter()
            .map(|row| {
                Ok(PlayerTotals {
                    user_id: row.try_get("user_id")?,
                    username: row.try_get("username")?,
                    total_score: row.try_get("total_score")?,
                    total_games: row.try_get("total_games")?,
                    total_wins: row.try_get("total_wins")?,
                })
            })
            .collect()
    }

    async fn system_stats(&self, window: &StatsWindow) -> StoreResult<SystemStats> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS users_total,
                (SELECT COUNT(*) FROM users WHERE is_active) AS users_active,
                (SELECT COUNT(DISTINCT user_id) FROM game_sessions
                  WHERE status = 'completed' AND completed_at >= $1) AS users_active_today,
                (SELECT COUNT(DISTINCT user_id) FROM game_sessions
                  WHERE status = 'completed' AND completed_at >= $2) AS users_active_week,
                (SELECT COUNT(*) FROM game_sessions) AS sessions_total,
                (SELECT COUNT(*) FROM game_sessions WHERE status = 'in_progress') AS sessions_in_progress,
                (SELECT COUNT(*) FROM game_sessions WHERE status = 'completed') AS sessions_completed,
                (SELECT COUNT(*) FROM game_sessions WHERE status = 'abandoned') AS sessions_abandoned,
                (SELECT COALESCE(SUM(total_score), 0)::BIGINT FROM scores) AS total_score,
                (SELECT COALESCE(SUM(games_played), 0)::BIGINT FROM scores) AS games_played,
                (SELECT COALESCE(SUM(balance), 0) FROM wallets) AS wallet_ton,
                (SELECT COALESCE(SUM(gems), 0)::BIGINT FROM wallets) AS wallet_gems,
                (SELECT COALESCE(SUM(diamonds), 0)::BIGINT FROM wallets) AS wallet_diamonds,
                (SELECT COUNT(*) FROM bonuses) AS bonuses_total,
                (SELECT COUNT(*) FROM bonuses WHERE is_claimed) AS bonuses_claimed,
                (SELECT COUNT(*) FROM bonuses
                  WHERE NOT is_claimed AND (expires_at IS NULL OR expires_at > $3)) AS bonuses_available
            "#,
        )
        .bind(window.today_start)
        .bind(window.week_floor)
        .bind(window.now)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(SystemStats {
            users: UserCounts {
                total: row.try_get("users_total")?,
                active: row.try_get("users_active")?,
                active_today: row.try_get("users_active_today")?,
                active_week: row.try_get("users_active_week")?,
            },
            sessions: SessionCounts {
                total: row.try_get("sessions_total")?,
                in_progress: row.try_get("sessions_in_progress")?,
                completed: row.try_get("sessions_completed")?,
                abandoned: row.try_get("sessions_abandoned")?,
            },
            scores: ScoreTotals {
                total_score: row.try_get("total_score")?,
                games_played: row.try_get("games_played")?,
            },
            wallets: WalletTotals {
                ton: row.try_get("wallet_ton")?,
                gems: row.try_get("wallet_gems")?,
                diamonds: row.try_get("wallet_diamonds")?,
            },
            bonuses: BonusCounts {
                total: row.try_get("bonuses_total")?,
                claimed: row.try_get("bonuses_claimed")?,
                available: row.try_get("bonuses_available")?,
            },
        })
    }
}

/// Open PostgreSQL transaction
///
/// Rolled back by sqlx when dropped uncommitted.
pub struct PgLedgerTx {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgLedgerTx {
    fn conn(&mut self) -> StoreResult<&mut PgConnection> {
        self.tx.as_deref_mut().ok_or(StoreError::TransactionClosed)
    }

    async fn select_wallet(&mut self, user_id: UserId) -> StoreResult<Option<Wallet>> {
        let sql = format!("SELECT {WALLET_COLUMNS} FROM wallets WHERE user_id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(self.conn()?)
            .await?;
        row.as_ref().map(wallet_from_row).transpose()
    }
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn find_user_by_username(&mut self, username: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let row = sqlx::query(&sql)
            .bind(username)
            .fetch_optional(self.conn()?)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn insert_user(&mut self, user: &NewUser, now: DateTime<Utc>) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (username, display_name, is_admin, created_at) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&user.username)
            .bind(&user.display_name)
            .bind(user.is_admin)
            .bind(now)
            .fetch_one(self.conn()?)
            .await
            .map_err(|e| StoreError::from_write(e, "username"))?;
        user_from_row(&row)
    }

    async fn insert_wallet(
        &mut self,
        user_id: UserId,
        seed: &Funds,
        now: DateTime<Utc>,
    ) -> StoreResult<Wallet> {
        let sql = format!(
            "INSERT INTO wallets (user_id, balance, gems, diamonds, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) RETURNING {WALLET_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(seed.token)
            .bind(seed.gems)
            .bind(seed.diamonds)
            .bind(now)
            .fetch_one(self.conn()?)
            .await
            .map_err(|e| StoreError::from_write(e, "wallet"))?;
        wallet_from_row(&row)
    }

    async fn set_user_active(
        &mut self,
        user_id: UserId,
        active: bool,
    ) -> StoreResult<Option<User>> {
        let sql = format!("UPDATE users SET is_active = $2 WHERE id = $1 RETURNING {USER_COLUMNS}");
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(active)
            .fetch_optional(self.conn()?)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn active_user_ids(&mut self) -> StoreResult<Vec<UserId>> {
        let ids = sqlx::query_scalar("SELECT id FROM users WHERE is_active ORDER BY id")
            .fetch_all(self.conn()?)
            .await?;
        Ok(ids)
    }

    async fn existing_user_ids(&mut self, ids: &[UserId]) -> StoreResult<Vec<UserId>> {
        let found = sqlx::query_scalar("SELECT id FROM users WHERE id = ANY($1) ORDER BY id")
            .bind(ids)
            .fetch_all(self.conn()?)
            .await?;
        Ok(found)
    }

    async fn credit_wallet(
        &mut self,
        user_id: UserId,
        funds: &Funds,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Wallet>> {
        let sql = format!(
            "UPDATE wallets \
             SET balance = balance + $2, gems = gems + $3, diamonds = diamonds + $4, updated_at = $5 \
             WHERE user_id = $1 RETURNING {WALLET_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(funds.token)
            .bind(funds.gems)
            .bind(funds.diamonds)
            .bind(now)
            .fetch_optional(self.conn()?)
            .await
            .map_err(|e| StoreError::from_write(e, "wallet"))?;
        row.as_ref().map(wallet_from_row).transpose()
    }

    async fn debit_wallet(
        &mut self,
        user_id: UserId,
        funds: &Funds,
        now: DateTime<Utc>,
    ) -> StoreResult<DebitOutcome> {
        let sql = format!(
            "UPDATE wallets \
             SET balance = balance - $2, gems = gems - $3, diamonds = diamonds - $4, updated_at = $5 \
             WHERE user_id = $1 AND balance >= $2 AND gems >= $3 AND diamonds >= $4 \
             RETURNING {WALLET_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(funds.token)
            .bind(funds.gems)
            .bind(funds.diamonds)
            .bind(now)
            .fetch_optional(self.conn()?)
            .await?;

        if let Some(row) = row {
            return Ok(DebitOutcome::Applied(wallet_from_row(&row)?));
        }

        // Either the wallet is missing or a balance fell short
        Ok(match self.select_wallet(user_id).await? {
            Some(wallet) => DebitOutcome::Insufficient(wallet),
            None => DebitOutcome::Missing,
        })
    }

    async fn wallet_owner_by_address(&mut self, address: &str) -> StoreResult<Option<UserId>> {
        let owner = sqlx::query_scalar("SELECT user_id FROM wallets WHERE ton_address = $1")
            .bind(address)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(owner)
    }

    async fn set_ton_address(
        &mut self,
        user_id: UserId,
        address: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Wallet>> {
        let sql = format!(
            "UPDATE wallets SET ton_address = $2, updated_at = $3 \
             WHERE user_id = $1 RETURNING {WALLET_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(address)
            .bind(now)
            .fetch_optional(self.conn()?)
            .await
            .map_err(|e| StoreError::from_write(e, "ton_address"))?;
        row.as_ref().map(wallet_from_row).transpose()
    }

    async fn insert_session(
        &mut self,
        session: &NewSession,
        now: DateTime<Utc>,
    ) -> StoreResult<GameSession> {
        let sql = format!(
            "INSERT INTO game_sessions (user_id, game_type, status, game_data, started_at) \
             VALUES ($1, $2, 'in_progress', $3, $4) RETURNING {SESSION_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(session.user_id)
            .bind(session.game_type.as_str())
            .bind(session.game_data.clone())
            .bind(now)
            .fetch_one(self.conn()?)
            .await?;
        session_from_row(&row)
    }

    async fn lock_session(&mut self, session_id: SessionId) -> StoreResult<Option<GameSession>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM game_sessions WHERE id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(session_id)
            .fetch_optional(self.conn()?)
            .await?;
        row.as_ref().map(session_from_row).transpose()
    }

    async fn finish_session(&mut self, session: &GameSession) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE game_sessions
            SET status = $2, score = $3, duration = $4,
                ton_earned = $5, gems_earned = $6, diamonds_earned = $7,
                completed_at = $8
            WHERE id = $1 AND status = 'in_progress'
            "#,
        )
        .bind(session.id)
        .bind(session.status.as_str())
        .bind(session.score)
        .bind(session.duration)
        .bind(session.earned.token)
        .bind(session.earned.gems)
        .bind(session.earned.diamonds)
        .bind(session.completed_at)
        .execute(self.conn()?)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn ensure_score(
        &mut self,
        user_id: UserId,
        game_type: GameType,
        now: DateTime<Utc>,
    ) -> StoreResult<Score> {
        sqlx::query(
            r#"
            INSERT INTO scores (user_id, game_type, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (user_id, game_type) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(game_type.as_str())
        .bind(now)
        .execute(self.conn()?)
        .await?;

        self.lock_score(user_id, game_type).await?.ok_or_else(|| {
            StoreError::Corrupt(format!("score row for user {user_id} vanished after insert"))
        })
    }

    async fn lock_score(
        &mut self,
        user_id: UserId,
        game_type: GameType,
    ) -> StoreResult<Option<Score>> {
        let sql = format!(
            "SELECT {SCORE_COLUMNS} FROM scores s \
             WHERE s.user_id = $1 AND s.game_type = $2 FOR UPDATE"
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(game_type.as_str())
            .fetch_optional(self.conn()?)
            .await?;
        row.as_ref().map(score_from_row).transpose()
    }

    async fn save_score(&mut self, score: &Score) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE scores
            SET score = $3, total_score = $4, games_played = $5, wins = $6, losses = $7,
                achievements = $8, last_played_at = $9, updated_at = $10
            WHERE user_id = $1 AND game_type = $2
            "#,
        )
        .bind(score.user_id)
        .bind(score.game_type.as_str())
        .bind(score.score)
        .bind(score.total_score)
        .bind(score.games_played)
        .bind(score.wins)
        .bind(score.losses)
        .bind(score.achievements.clone())
        .bind(score.last_played_at)
        .bind(score.updated_at)
        .execute(self.conn()?)
        .await
        .map_err(|e| StoreError::from_write(e, "score"))?;

        if result.rows_affected() != 1 {
            return Err(StoreError::Corrupt(format!(
                "score row ({}, {}) missing on save",
                score.user_id, score.game_type
            )));
        }
        Ok(())
    }

    async fn insert_bonus(
        &mut self,
        user_id: UserId,
        bonus: &NewBonus,
        claimed_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> StoreResult<Bonus> {
        let sql = format!(
            "INSERT INTO bonuses (user_id, bonus_type, title, description, ton_amount, \
                 gems_amount, diamonds_amount, is_claimed, claimed_at, expires_at, metadata, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {BONUS_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(bonus.bonus_type.as_str())
            .bind(&bonus.title)
            .bind(&bonus.description)
            .bind(bonus.amount.token)
            .bind(bonus.amount.gems)
            .bind(bonus.amount.diamonds)
            .bind(claimed_at.is_some())
            .bind(claimed_at)
            .bind(bonus.expires_at)
            .bind(bonus.metadata.clone())
            .bind(now)
            .fetch_one(self.conn()?)
            .await?;
        bonus_from_row(&row)
    }

    async fn lock_bonus(&mut self, bonus_id: BonusId) -> StoreResult<Option<Bonus>> {
        let sql = format!("SELECT {BONUS_COLUMNS} FROM bonuses WHERE id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(bonus_id)
            .fetch_optional(self.conn()?)
            .await?;
        row.as_ref().map(bonus_from_row).transpose()
    }

    async fn mark_bonus_claimed(
        &mut self,
        bonus_id: BonusId,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE bonuses SET is_claimed = TRUE, claimed_at = $2 WHERE id = $1 AND is_claimed = FALSE",
        )
        .bind(bonus_id)
        .bind(now)
        .execute(self.conn()?)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn commit(&mut self) -> StoreResult<()> {
        let tx = self.tx.take().ok_or(StoreError::TransactionClosed)?;
        tx.commit().await?;
        Ok(())
    }
}
