//! In-process ledger store.
//!
//! Transactions are serialized through one async mutex. `begin` copies the
//! committed state into a private working copy, `commit` swaps the copy in,
//! and dropping the transaction discards it. Reads never wait on writers;
//! they see the last committed state.
//!
//! Used by tests and by embedders that do not need durability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    sync::{Arc, Mutex, RwLock},
};
use tokio::sync::OwnedMutexGuard;

use super::{
    errors::{StoreError, StoreResult},
    store::{LedgerStore, LedgerTx},
};
use crate::{
    BonusId, SessionId, UserId,
    bonus::{Bonus, BonusFilter, BonusOrder, NewBonus},
    game::{GameSession, GameType, NewSession, SessionQuery, SessionStatus},
    leaderboard::{CandidateFilter, GameTypeStats, PlayerTotals, ScoreWithUser, ranking},
    score::{Score, round2},
    stats::{BonusCounts, ScoreTotals, SessionCounts, StatsWindow, SystemStats, UserCounts, WalletTotals},
    users::{NewUser, User},
    wallet::{DebitOutcome, Funds, MAX_TOKEN, Wallet},
};

/// Store operation that can be made to fail once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    CreditWallet,
    DebitWallet,
    InsertBonus,
    EnsureScore,
    SaveScore,
    FinishSession,
    MarkBonusClaimed,
    Commit,
}

#[derive(Debug, Clone, Default)]
struct LedgerState {
    users: BTreeMap<UserId, User>,
    wallets: BTreeMap<UserId, Wallet>,
    scores: BTreeMap<(UserId, GameType), Score>,
    sessions: BTreeMap<SessionId, GameSession>,
    bonuses: BTreeMap<BonusId, Bonus>,
    last_user_id: i64,
    last_session_id: i64,
    last_bonus_id: i64,
}

type FailPoints = Arc<Mutex<HashSet<FailPoint>>>;

fn trip(fail_points: &FailPoints, point: FailPoint) -> StoreResult<()> {
    let mut armed = fail_points.lock().unwrap_or_else(|e| e.into_inner());
    if armed.remove(&point) {
        return Err(StoreError::Unavailable(format!("injected failure at {point:?}")));
    }
    Ok(())
}

fn page<T>(items: impl Iterator<Item = T>, limit: Option<i64>, offset: i64) -> Vec<T> {
    let skipped = items.skip(usize::try_from(offset).unwrap_or(0));
    match limit {
        Some(limit) => skipped.take(usize::try_from(limit).unwrap_or(0)).collect(),
        None => skipped.collect(),
    }
}

/// Ledger store kept entirely in memory
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    committed: Arc<RwLock<Arc<LedgerState>>>,
    writer: Arc<tokio::sync::Mutex<()>>,
    fail_points: FailPoints,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `point` fail with [`StoreError::Unavailable`]
    pub fn fail_once(&self, point: FailPoint) {
        self.fail_points
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(point);
    }

    fn snapshot(&self) -> Arc<LedgerState> {
        self.committed
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>> {
        let guard = self.writer.clone().lock_owned().await;
        let working = (*self.snapshot()).clone();
        Ok(Box::new(MemoryLedgerTx {
            guard: Some(guard),
            working,
            committed: self.committed.clone(),
            fail_points: self.fail_points.clone(),
        }))
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        Ok(self.snapshot().users.get(&user_id).cloned())
    }

    async fn wallet(&self, user_id: UserId) -> StoreResult<Option<Wallet>> {
        Ok(self.snapshot().wallets.get(&user_id).cloned())
    }

    async fn scores(
        &self,
        user_id: UserId,
        game_type: Option<GameType>,
    ) -> StoreResult<Vec<Score>> {
        let state = self.snapshot();
        Ok(state
            .scores
            .range((user_id, GameType::Spin)..=(user_id, GameType::Drop))
            .map(|(_, score)| score)
            .filter(|score| game_type.is_none_or(|t| score.game_type == t))
            .cloned()
            .collect())
    }

    async fn completed_sessions(&self, query: &SessionQuery) -> StoreResult<Vec<GameSession>> {
        let state = self.snapshot();
        let mut sessions: Vec<&GameSession> = state
            .sessions
            .values()
            .filter(|s| s.user_id == query.user_id && s.status == SessionStatus::Completed)
            .filter(|s| query.game_type.is_none_or(|t| s.game_type == t))
            .filter(|s| {
                query
                    .completed_since
                    .is_none_or(|since| s.completed_at.is_some_and(|at| at >= since))
            })
            .collect();
        sessions.sort_by(|a, b| b.completed_at.cmp(&a.completed_at).then(b.id.cmp(&a.id)));

        Ok(page(sessions.into_iter().cloned(), query.limit, query.offset))
    }

    async fn bonuses(
        &self,
        filter: &BonusFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Bonus>> {
        let state = self.snapshot();
        let mut bonuses: Vec<&Bonus> = state.bonuses.values().filter(|b| filter.matches(b)).collect();
        match filter.order {
            BonusOrder::Newest => {
                bonuses.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)))
            }
            BonusOrder::RecentlyClaimed => {
                bonuses.sort_by(|a, b| b.claimed_at.cmp(&a.claimed_at).then(b.id.cmp(&a.id)))
            }
        }

        Ok(page(bonuses.into_iter().cloned(), Some(limit), offset))
    }

    async fn count_bonuses(&self, filter: &BonusFilter) -> StoreResult<i64> {
        let state = self.snapshot();
        Ok(state.bonuses.values().filter(|b| filter.matches(b)).count() as i64)
    }

    async fn leaderboard_window(
        &self,
        filter: &CandidateFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<ScoreWithUser>> {
        let state = self.snapshot();
        let rows = state.scores.values().filter_map(|score| {
            let user = state.users.get(&score.user_id)?;
            Some(ScoreWithUser {
                score: score.clone(),
                username: user.username.clone(),
            })
        });
        let ranked = ranking::rank_candidates(rows, filter);

        Ok(ranking::window(&ranked, limit, offset).to_vec())
    }

    async fn count_candidates(
        &self,
        filter: &CandidateFilter,
        above: Option<i64>,
    ) -> StoreResult<i64> {
        let state = self.snapshot();
        Ok(state
            .scores
            .values()
            .filter(|score| filter.admits(score))
            .filter(|score| above.is_none_or(|floor| score.total_score > floor))
            .count() as i64)
    }

    async fn global_score_stats(
        &self,
        game_type: Option<GameType>,
        since: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<GameTypeStats>> {
        let state = self.snapshot();
        let mut stats = Vec::new();

        for current in GameType::ALL {
            if game_type.is_some_and(|t| t != current) {
                continue;
            }
            let rows: Vec<&Score> = state
                .scores
                .values()
                .filter(|s| s.game_type == current)
                .filter(|s| since.is_none_or(|floor| s.last_played_at.is_some_and(|at| at >= floor)))
                .collect();
            if rows.is_empty() {
                continue;
            }

            let players: BTreeSet<UserId> = rows.iter().map(|s| s.user_id).collect();
            let total_score: i64 = rows.iter().map(|s| s.total_score).sum();
            stats.push(GameTypeStats {
                game_type: current,
                total_players: players.len() as i64,
                total_score,
                total_games: rows.iter().map(|s| s.games_played).sum(),
                total_wins: rows.iter().map(|s| s.wins).sum(),
                total_losses: rows.iter().map(|s| s.losses).sum(),
                average_score: round2(total_score as f64 / rows.len() as f64),
                max_score: rows.iter().map(|s| s.total_score).max().unwrap_or(0),
            });
        }

        Ok(stats)
    }

    async fn player_totals(
        &self,
        since: Option<DateTime<Utc>>,
        limit: i64,
    ) -> StoreResult<Vec<PlayerTotals>> {
        let state = self.snapshot();
        let mut totals: BTreeMap<UserId, PlayerTotals> = BTreeMap::new();

        for score in state.scores.values() {
            if !since.is_none_or(|floor| score.last_played_at.is_some_and(|at| at >= floor)) {
                continue;
            }
            let Some(user) = state.users.get(&score.user_id) else {
                continue;
            };
            let entry = totals.entry(score.user_id).or_insert_with(|| PlayerTotals {
                user_id: user.id,
                username: user.username.clone(),
                total_score: 0,
                total_games: 0,
                total_wins: 0,
            });
            entry.total_score += score.total_score;
            entry.total_games += score.games_played;
            entry.total_wins += score.wins;
        }

        let mut ranked: Vec<PlayerTotals> = totals.into_values().collect();
        ranked.sort_by(|a, b| b.total_score.cmp(&a.total_score).then(a.user_id.cmp(&b.user_id)));

        Ok(page(ranked.into_iter(), Some(limit), 0))
    }

    async fn system_stats(&self, window: &StatsWindow) -> StoreResult<SystemStats> {
        let state = self.snapshot();

        let completed_since = |floor: DateTime<Utc>| -> i64 {
            state
                .sessions
                .values()
                .filter(|s| s.status == SessionStatus::Completed)
                .filter(|s| s.completed_at.is_some_and(|at| at >= floor))
                .map(|s| s.user_id)
                .collect::<BTreeSet<_>>()
                .len() as i64
        };
        let sessions_in = |status: SessionStatus| -> i64 {
            state.sessions.values().filter(|s| s.status == status).count() as i64
        };

        Ok(SystemStats {
            users: UserCounts {
                total: state.users.len() as i64,
                active: state.users.values().filter(|u| u.is_active).count() as i64,
                active_today: completed_since(window.today_start),
                active_week: completed_since(window.week_floor),
            },
            sessions: SessionCounts {
                total: state.sessions.len() as i64,
                in_progress: sessions_in(SessionStatus::InProgress),
                completed: sessions_in(SessionStatus::Completed),
                abandoned: sessions_in(SessionStatus::Abandoned),
            },
            scores: ScoreTotals {
                total_score: state.scores.values().map(|s| s.total_score).sum(),
                games_played: state.scores.values().map(|s| s.games_played).sum(),
            },
            wallets: WalletTotals {
                ton: state.wallets.values().map(|w| w.balance).sum(),
                gems: state.wallets.values().map(|w| w.gems).sum(),
                diamonds: state.wallets.values().map(|w| w.diamonds).sum(),
            },
            bonuses: BonusCounts {
                total: state.bonuses.len() as i64,
                claimed: state.bonuses.values().filter(|b| b.is_claimed).count() as i64,
                available: state
                    .bonuses
                    .values()
                    .filter(|b| b.is_available(window.now))
                    .count() as i64,
            },
        })
    }
}

/// Transaction over a private copy of the ledger
pub struct MemoryLedgerTx {
    guard: Option<OwnedMutexGuard<()>>,
    working: LedgerState,
    committed: Arc<RwLock<Arc<LedgerState>>>,
    fail_points: FailPoints,
}

impl MemoryLedgerTx {
    fn ensure_open(&self) -> StoreResult<()> {
        if self.guard.is_none() {
            return Err(StoreError::TransactionClosed);
        }
        Ok(())
    }

    fn trip(&self, point: FailPoint) -> StoreResult<()> {
        self.ensure_open()?;
        trip(&self.fail_points, point)
    }
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    async fn find_user_by_username(&mut self, username: &str) -> StoreResult<Option<User>> {
        self.ensure_open()?;
        Ok(self
            .working
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn insert_user(&mut self, user: &NewUser, now: DateTime<Utc>) -> StoreResult<User> {
        self.ensure_open()?;
        if self.working.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate("username"));
        }

        self.working.last_user_id += 1;
        let created = User {
            id: self.working.last_user_id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            is_active: true,
            is_admin: user.is_admin,
            created_at: now,
        };
        self.working.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn insert_wallet(
        &mut self,
        user_id: UserId,
        seed: &Funds,
        now: DateTime<Utc>,
    ) -> StoreResult<Wallet> {
        self.ensure_open()?;
        if self.working.wallets.contains_key(&user_id) {
            return Err(StoreError::Duplicate("wallet"));
        }

        let wallet = Wallet {
            user_id,
            balance: seed.token,
            gems: seed.gems,
            diamonds: seed.diamonds,
            ton_address: None,
            created_at: now,
            updated_at: now,
        };
        self.working.wallets.insert(user_id, wallet.clone());
        Ok(wallet)
    }

    async fn set_user_active(
        &mut self,
        user_id: UserId,
        active: bool,
    ) -> StoreResult<Option<User>> {
        self.ensure_open()?;
        Ok(self.working.users.get_mut(&user_id).map(|user| {
            user.is_active = active;
            user.clone()
        }))
    }

    async fn active_user_ids(&mut self) -> StoreResult<Vec<UserId>> {
        self.ensure_open()?;
        Ok(self
            .working
            .users
            .values()
            .filter(|u| u.is_active)
            .map(|u| u.id)
            .collect())
    }

    async fn existing_user_ids(&mut self, ids: &[UserId]) -> StoreResult<Vec<UserId>> {
        self.ensure_open()?;
        Ok(ids
            .iter()
            .copied()
            .filter(|id| self.working.users.contains_key(id))
            .collect())
    }

    async fn credit_wallet(
        &mut self,
        user_id: UserId,
        funds: &Funds,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Wallet>> {
        self.trip(FailPoint::CreditWallet)?;
        let Some(wallet) = self.working.wallets.get_mut(&user_id) else {
            return Ok(None);
        };

        let updated = wallet
            .funds()
            .checked_add(funds)
            .filter(|total| total.token <= MAX_TOKEN)
            .ok_or(StoreError::Overflow)?;
        wallet.balance = updated.token;
        wallet.gems = updated.gems;
        wallet.diamonds = updated.diamonds;
        wallet.updated_at = now;
        Ok(Some(wallet.clone()))
    }

    async fn debit_wallet(
        &mut self,
        user_id: UserId,
        funds: &Funds,
        now: DateTime<Utc>,
    ) -> StoreResult<DebitOutcome> {
        self.trip(FailPoint::DebitWallet)?;
        let Some(wallet) = self.working.wallets.get_mut(&user_id) else {
            return Ok(DebitOutcome::Missing);
        };
        if wallet.funds().shortfall(funds).is_some() {
            return Ok(DebitOutcome::Insufficient(wallet.clone()));
        }

        wallet.balance -= funds.token;
        wallet.gems -= funds.gems;
        wallet.diamonds -= funds.diamonds;
        wallet.updated_at = now;
        Ok(DebitOutcome::Applied(wallet.clone()))
    }

    async fn wallet_owner_by_address(&mut self, address: &str) -> StoreResult<Option<UserId>> {
        self.ensure_open()?;
        Ok(self
            .working
            .wallets
            .values()
            .find(|w| w.ton_address.as_deref() == Some(address))
            .map(|w| w.user_id))
    }

    async fn set_ton_address(
        &mut self,
        user_id: UserId,
        address: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Wallet>> {
        self.ensure_open()?;
        let taken = self
            .working
            .wallets
            .values()
            .any(|w| w.user_id != user_id && w.ton_address.as_deref() == Some(address));
        if taken {
            return Err(StoreError::Duplicate("ton_address"));
        }

        Ok(self.working.wallets.get_mut(&user_id).map(|wallet| {
            wallet.ton_address = Some(address.to_string());
            wallet.updated_at = now;
            wallet.clone()
        }))
    }

    async fn insert_session(
        &mut self,
        session: &NewSession,
        now: DateTime<Utc>,
    ) -> StoreResult<GameSession> {
        self.ensure_open()?;
        self.working.last_session_id += 1;
        let created = GameSession {
            id: self.working.last_session_id,
            user_id: session.user_id,
            game_type: session.game_type,
            status: SessionStatus::InProgress,
            score: 0,
            duration: 0,
            game_data: session.game_data.clone(),
            earned: Funds::zero(),
            started_at: now,
            completed_at: None,
        };
        self.working.sessions.insert(created.id, created.clone());
        Ok(created)
    }

    async fn lock_session(&mut self, session_id: SessionId) -> StoreResult<Option<GameSession>> {
        self.ensure_open()?;
        Ok(self.working.sessions.get(&session_id).cloned())
    }

    async fn finish_session(&mut self, session: &GameSession) -> StoreResult<bool> {
        self.trip(FailPoint::FinishSession)?;
        match self.working.sessions.get_mut(&session.id) {
            Some(stored) if stored.status == SessionStatus::InProgress => {
                *stored = session.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ensure_score(
        &mut self,
        user_id: UserId,
        game_type: GameType,
        now: DateTime<Utc>,
    ) -> StoreResult<Score> {
        self.trip(FailPoint::EnsureScore)?;
        Ok(self
            .working
            .scores
            .entry((user_id, game_type))
            .or_insert_with(|| Score::new(user_id, game_type, now))
            .clone())
    }

    async fn lock_score(
        &mut self,
        user_id: UserId,
        game_type: GameType,
    ) -> StoreResult<Option<Score>> {
        self.ensure_open()?;
        Ok(self.working.scores.get(&(user_id, game_type)).cloned())
    }

    async fn save_score(&mut self, score: &Score) -> StoreResult<()> {
        self.trip(FailPoint::SaveScore)?;
        self.working
            .scores
            .insert((score.user_id, score.game_type), score.clone());
        Ok(())
    }

    async fn insert_bonus(
        &mut self,
        user_id: UserId,
        bonus: &NewBonus,
        claimed_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> StoreResult<Bonus> {
        self.trip(FailPoint::InsertBonus)?;
        self.working.last_bonus_id += 1;
        let created = Bonus {
            id: self.working.last_bonus_id,
            user_id,
            bonus_type: bonus.bonus_type,
            title: bonus.title.clone(),
            description: bonus.description.clone(),
            amount: bonus.amount,
            is_claimed: claimed_at.is_some(),
            claimed_at,
            expires_at: bonus.expires_at,
            metadata: bonus.metadata.clone(),
            created_at: now,
        };
        self.working.bonuses.insert(created.id, created.clone());
        Ok(created)
    }

    async fn lock_bonus(&mut self, bonus_id: BonusId) -> StoreResult<Option<Bonus>> {
        self.ensure_open()?;
        Ok(self.working.bonuses.get(&bonus_id).cloned())
    }

    async fn mark_bonus_claimed(
        &mut self,
        bonus_id: BonusId,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        self.trip(FailPoint::MarkBonusClaimed)?;
        match self.working.bonuses.get_mut(&bonus_id) {
            Some(bonus) if !bonus.is_claimed => {
                bonus.is_claimed = true;
                bonus.claimed_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit(&mut self) -> StoreResult<()> {
        self.trip(FailPoint::Commit)?;
        let guard = self.guard.take().ok_or(StoreError::TransactionClosed)?;

        let state = std::mem::take(&mut self.working);
        *self.committed.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(state);
        drop(guard);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 28, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_dropped_transaction_discards_writes() {
        let store = MemoryLedgerStore::new();

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_user(&NewUser::new("alice"), now()).await.unwrap();
        }

        assert!(store.find_user(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = MemoryLedgerStore::new();

        let mut tx = store.begin().await.unwrap();
        let user = tx.insert_user(&NewUser::new("alice"), now()).await.unwrap();
        tx.insert_wallet(user.id, &Funds::gems(100), now()).await.unwrap();
        tx.commit().await.unwrap();

        let wallet = store.wallet(user.id).await.unwrap().unwrap();
        assert_eq!(wallet.gems, 100);
    }

    #[tokio::test]
    async fn test_commit_twice_fails() {
        let store = MemoryLedgerStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.commit().await.unwrap();

        assert!(matches!(tx.commit().await, Err(StoreError::TransactionClosed)));
    }

    #[tokio::test]
    async fn test_fail_point_trips_once() {
        let store = MemoryLedgerStore::new();
        store.fail_once(FailPoint::Commit);

        let mut tx = store.begin().await.unwrap();
        assert!(tx.commit().await.is_err());
        drop(tx);

        let mut tx = store.begin().await.unwrap();
        assert!(tx.commit().await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = MemoryLedgerStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_user(&NewUser::new("alice"), now()).await.unwrap();

        let err = tx.insert_user(&NewUser::new("alice"), now()).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("username")));
    }

    #[tokio::test]
    async fn test_conditional_debit() {
        let store = MemoryLedgerStore::new();
        let mut tx = store.begin().await.unwrap();
        let user = tx.insert_user(&NewUser::new("bob"), now()).await.unwrap();
        tx.insert_wallet(user.id, &Funds::gems(10), now()).await.unwrap();

        let outcome = tx.debit_wallet(user.id, &Funds::gems(11), now()).await.unwrap();
        assert!(matches!(outcome, DebitOutcome::Insufficient(ref w) if w.gems == 10));

        let outcome = tx.debit_wallet(user.id, &Funds::gems(10), now()).await.unwrap();
        assert!(matches!(outcome, DebitOutcome::Applied(ref w) if w.gems == 0));

        let outcome = tx.debit_wallet(99, &Funds::gems(1), now()).await.unwrap();
        assert_eq!(outcome, DebitOutcome::Missing);
    }
}
