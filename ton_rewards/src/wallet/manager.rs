//! Wallet manager implementation.

use std::sync::Arc;

use super::{
    errors::{WalletError, WalletResult},
    models::{AdminCredit, DebitOutcome, EarningsSummary, Funds, LedgerEvent, LedgerEventKind, MAX_REASON_LEN, Wallet},
};
use crate::{
    UserId,
    bonus::{BonusFilter, BonusOrder, BonusType, NewBonus},
    clock::Clock,
    db::{LedgerStore, LedgerTx},
    game::SessionQuery,
    leaderboard::{Period, ranking},
    score::round2,
};

/// Maximum page size of the transaction history
const MAX_HISTORY_LIMIT: i64 = 100;

/// Title of the bonus row recording an admin credit
const ADMIN_CREDIT_TITLE: &str = "Admin Credit";

/// Length of a TON wallet address in its user-friendly form
const TON_ADDRESS_LEN: usize = 48;

fn is_valid_ton_address(address: &str) -> bool {
    address.len() == TON_ADDRESS_LEN
        && address
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Wallet manager
#[derive(Clone)]
pub struct WalletManager {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
}

impl WalletManager {
    /// Create a new wallet manager
    ///
    /// # Arguments
    ///
    /// * `store` - Ledger store
    /// * `clock` - Time source for `updated_at` stamps and period windows
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Get wallet balances for a user
    pub async fn get_wallet(&self, user_id: UserId) -> WalletResult<Wallet> {
        self.store
            .wallet(user_id)
            .await?
            .ok_or(WalletError::WalletNotFound(user_id))
    }

    /// Credit a wallet inside an open transaction
    ///
    /// Shared by every settlement path so that all credits are relative
    /// increments. Does not commit.
    pub(crate) async fn credit_in(
        tx: &mut dyn LedgerTx,
        user_id: UserId,
        funds: &Funds,
        now: chrono::DateTime<chrono::Utc>,
    ) -> WalletResult<Wallet> {
        tx.credit_wallet(user_id, funds, now)
            .await?
            .ok_or(WalletError::WalletNotFound(user_id))
    }

    /// Add funds to a wallet
    ///
    /// # Arguments
    ///
    /// * `user_id` - Wallet owner
    /// * `funds` - Non-negative amounts to add
    ///
    /// # Returns
    ///
    /// * `WalletResult<Wallet>` - Wallet after the credit
    ///
    /// # Errors
    ///
    /// * `WalletError::InvalidAmount` - Negative or over-precise amount
    /// * `WalletError::WalletNotFound` - No wallet for the user
    pub async fn credit(&self, user_id: UserId, funds: Funds) -> WalletResult<Wallet> {
        funds.validate()?;

        let mut tx = self.store.begin().await?;
        let wallet = Self::credit_in(tx.as_mut(), user_id, &funds, self.clock.now()).await?;
        tx.commit().await?;

        Ok(wallet)
    }

    /// Remove funds from a wallet if every balance covers the request
    ///
    /// Nothing is written when any currency falls short.
    ///
    /// # Errors
    ///
    /// * `WalletError::InsufficientFunds` - Names the first short currency
    /// * `WalletError::WalletNotFound` - No wallet for the user
    pub async fn debit(&self, user_id: UserId, funds: Funds) -> WalletResult<Wallet> {
        funds.validate()?;

        let mut tx = self.store.begin().await?;
        match tx.debit_wallet(user_id, &funds, self.clock.now()).await? {
            DebitOutcome::Applied(wallet) => {
                tx.commit().await?;
                Ok(wallet)
            }
            DebitOutcome::Insufficient(wallet) => {
                let (currency, available, required) = wallet
                    .funds()
                    .shortfall(&funds)
                    .ok_or(WalletError::WalletNotFound(user_id))?;
                Err(WalletError::InsufficientFunds {
                    currency,
                    available,
                    required,
                })
            }
            DebitOutcome::Missing => Err(WalletError::WalletNotFound(user_id)),
        }
    }

    /// Credit a wallet on behalf of an operator
    ///
    /// The credit and a claimed `admin` bonus recording it are written in
    /// one transaction, so the audit row exists exactly when the money does.
    ///
    /// # Errors
    ///
    /// * `WalletError::InvalidReason` - Empty or longer than 255 characters
    /// * `WalletError::NothingToCredit` - All amounts are zero
    pub async fn admin_credit(
        &self,
        user_id: UserId,
        funds: Funds,
        reason: &str,
    ) -> WalletResult<AdminCredit> {
        let reason = reason.trim();
        if reason.is_empty() || reason.chars().count() > MAX_REASON_LEN {
            return Err(WalletError::InvalidReason);
        }
        funds.validate()?;
        if !funds.has_positive() {
            return Err(WalletError::NothingToCredit);
        }

        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let wallet = Self::credit_in(tx.as_mut(), user_id, &funds, now).await?;
        let audit = NewBonus {
            bonus_type: BonusType::Admin,
            title: ADMIN_CREDIT_TITLE.to_string(),
            description: Some(reason.to_string()),
            amount: funds,
            expires_at: None,
            metadata: serde_json::json!({ "source": "admin_credit" }),
        };
        let bonus = tx.insert_bonus(user_id, &audit, Some(now), now).await?;

        tx.commit().await?;

        log::info!(
            "Admin credit to user {}: ton={} gems={} diamonds={} (bonus {})",
            user_id,
            funds.token,
            funds.gems,
            funds.diamonds,
            bonus.id
        );

        Ok(AdminCredit {
            wallet,
            bonus_id: bonus.id,
        })
    }

    /// Attach a TON payout address to the wallet
    ///
    /// # Errors
    ///
    /// * `WalletError::InvalidTonAddress` - Not 48 characters of `[0-9A-Za-z_-]`
    /// * `WalletError::TonAddressTaken` - Held by another wallet
    pub async fn set_ton_address(&self, user_id: UserId, address: &str) -> WalletResult<Wallet> {
        if !is_valid_ton_address(address) {
            return Err(WalletError::InvalidTonAddress);
        }

        let mut tx = self.store.begin().await?;

        let owner = tx.wallet_owner_by_address(address).await?;
        if owner.is_some_and(|owner| owner != user_id) {
            return Err(WalletError::TonAddressTaken);
        }

        let wallet = tx
            .set_ton_address(user_id, address, self.clock.now())
            .await?
            .ok_or(WalletError::WalletNotFound(user_id))?;
        tx.commit().await?;

        Ok(wallet)
    }

    /// Reward and bonus history, newest first
    ///
    /// Completed sessions and claimed bonuses are merged before paging, so
    /// `offset` and `limit` apply to the combined timeline.
    pub async fn transaction_history(
        &self,
        user_id: UserId,
        limit: i64,
        offset: i64,
    ) -> WalletResult<Vec<LedgerEvent>> {
        self.get_wallet(user_id).await?;

        let limit = ranking::clamp_limit(limit, MAX_HISTORY_LIMIT);
        let offset = offset.max(0);
        let horizon = offset.saturating_add(limit);

        let sessions = self
            .store
            .completed_sessions(&SessionQuery {
                user_id,
                limit: Some(horizon),
                ..SessionQuery::default()
            })
            .await?;
        let bonuses = self
            .store
            .bonuses(
                &BonusFilter {
                    claimed: Some(true),
                    order: BonusOrder::RecentlyClaimed,
                    ..BonusFilter::for_user(user_id)
                },
                horizon,
                0,
            )
            .await?;

        let mut events: Vec<LedgerEvent> = sessions
            .into_iter()
            .filter_map(|s| {
                let at = s.completed_at?;
                Some(LedgerEvent::game_reward(s.id, s.game_type, s.earned, at))
            })
            .chain(bonuses.into_iter().filter_map(|b| {
                Some(LedgerEvent {
                    id: b.id,
                    kind: LedgerEventKind::Bonus,
                    game_type: None,
                    bonus_type: Some(b.bonus_type),
                    amount: b.amount,
                    description: b.title,
                    timestamp: b.claimed_at?,
                })
            }))
            .collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        Ok(ranking::window(&events, limit, offset).to_vec())
    }

    /// Totals earned from sessions completed within `period`
    pub async fn earnings(&self, user_id: UserId, period: Period) -> WalletResult<EarningsSummary> {
        self.get_wallet(user_id).await?;

        let sessions = self
            .store
            .completed_sessions(&SessionQuery {
                user_id,
                completed_since: period.floor(self.clock.now()),
                ..SessionQuery::default()
            })
            .await?;

        let mut total_earned = Funds::zero();
        let mut total_score: i64 = 0;
        for session in &sessions {
            total_earned = total_earned
                .checked_add(&session.earned)
                .ok_or(crate::db::StoreError::Overflow)?;
            total_score = total_score.saturating_add(session.score);
        }
        let games_played = sessions.len() as i64;
        let average_score = if games_played > 0 {
            round2(total_score as f64 / games_played as f64)
        } else {
            0.0
        };

        Ok(EarningsSummary {
            period,
            total_earned,
            games_played,
            total_score,
            average_score,
        })
    }
}
