//! Bonus claim engine.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::{
    errors::{BonusError, BonusResult},
    models::{
        Bonus, BonusAudience, BonusBroadcast, BonusClaim, BonusFilter, MAX_TITLE_LEN, NewBonus,
    },
};
use crate::{
    BonusId, UserId,
    clock::Clock,
    db::LedgerStore,
    leaderboard::ranking,
};

/// Maximum page size of admin bonus listings
const MAX_LIST_LIMIT: i64 = 100;

impl Bonus {
    /// Claimability at `now`
    ///
    /// # Errors
    ///
    /// * `BonusError::AlreadyClaimed` - Claimed before
    /// * `BonusError::Expired` - `expires_at <= now`
    pub fn check_claimable(&self, now: DateTime<Utc>) -> BonusResult<()> {
        if self.is_claimed {
            return Err(BonusError::AlreadyClaimed(self.id));
        }
        if let Some(expired_at) = self.expires_at.filter(|deadline| *deadline <= now) {
            return Err(BonusError::Expired {
                bonus_id: self.id,
                expired_at,
            });
        }
        Ok(())
    }
}

/// Bonus manager
#[derive(Clone)]
pub struct BonusManager {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
}

impl BonusManager {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Claim a bonus and credit its amounts to the owner's wallet
    ///
    /// The bonus row stays locked for the whole transaction, so of two
    /// concurrent claims exactly one succeeds and the other sees
    /// `AlreadyClaimed`.
    ///
    /// # Errors
    ///
    /// * `BonusError::BonusNotFound` - Missing or owned by another user
    /// * `BonusError::AlreadyClaimed` - Claimed before
    /// * `BonusError::Expired` - Deadline passed
    pub async fn claim(&self, user_id: UserId, bonus_id: BonusId) -> BonusResult<BonusClaim> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let mut bonus = tx
            .lock_bonus(bonus_id)
            .await?
            .filter(|bonus| bonus.user_id == user_id)
            .ok_or(BonusError::BonusNotFound(bonus_id))?;
        bonus.check_claimable(now)?;

        if !tx.mark_bonus_claimed(bonus_id, now).await? {
            return Err(BonusError::AlreadyClaimed(bonus_id));
        }
        bonus.is_claimed = true;
        bonus.claimed_at = Some(now);

        let wallet = tx
            .credit_wallet(user_id, &bonus.amount, now)
            .await?
            .ok_or(BonusError::WalletNotFound(user_id))?;

        tx.commit().await?;

        log::info!(
            "User {} claimed {} bonus {}: ton={} gems={} diamonds={}",
            user_id,
            bonus.bonus_type,
            bonus_id,
            bonus.amount.token,
            bonus.amount.gems,
            bonus.amount.diamonds
        );

        Ok(BonusClaim { bonus, wallet })
    }

    /// Unclaimed, unexpired bonuses of a user, newest first
    pub async fn available_bonuses(&self, user_id: UserId) -> BonusResult<Vec<Bonus>> {
        let filter = BonusFilter {
            available_at: Some(self.clock.now()),
            ..BonusFilter::for_user(user_id)
        };
        let bonuses = self.store.bonuses(&filter, i64::MAX, 0).await?;
        Ok(bonuses)
    }

    /// Grant a bonus to a set of users
    ///
    /// Every row is inserted in one transaction; an unknown user id in an
    /// explicit audience rejects the whole broadcast.
    ///
    /// # Errors
    ///
    /// * `BonusError::InvalidTitle` - Empty or longer than 255 characters
    /// * `BonusError::ExpiryInPast` - `expires_at` not after now
    /// * `BonusError::UnknownUsers` - Explicit ids that do not exist
    /// * `BonusError::NoRecipients` - Audience resolves to nobody
    pub async fn create_bonus(
        &self,
        bonus: NewBonus,
        audience: BonusAudience,
    ) -> BonusResult<BonusBroadcast> {
        let title_len = bonus.title.trim().chars().count();
        if title_len == 0 || title_len > MAX_TITLE_LEN {
            return Err(BonusError::InvalidTitle);
        }
        bonus.amount.validate()?;

        let now = self.clock.now();
        if bonus.expires_at.is_some_and(|deadline| deadline <= now) {
            return Err(BonusError::ExpiryInPast);
        }

        let mut tx = self.store.begin().await?;

        let recipients = match audience {
            BonusAudience::AllUsers => tx.active_user_ids().await?,
            BonusAudience::Users(mut ids) => {
                ids.sort_unstable();
                ids.dedup();
                let existing = tx.existing_user_ids(&ids).await?;
                let unknown: Vec<UserId> = ids
                    .iter()
                    .copied()
                    .filter(|id| !existing.contains(id))
                    .collect();
                if !unknown.is_empty() {
                    return Err(BonusError::UnknownUsers(unknown));
                }
                ids
            }
        };
        if recipients.is_empty() {
            return Err(BonusError::NoRecipients);
        }

        let mut bonus_ids = Vec::with_capacity(recipients.len());
        for user_id in &recipients {
            let created = tx.insert_bonus(*user_id, &bonus, None, now).await?;
            bonus_ids.push(created.id);
        }

        tx.commit().await?;

        log::info!(
            "Created {} bonus '{}' for {} user(s)",
            bonus.bonus_type,
            bonus.title,
            bonus_ids.len()
        );

        Ok(BonusBroadcast {
            created: bonus_ids.len(),
            bonus_ids,
        })
    }

    /// Admin listing; returns the page and the total matching count
    pub async fn list_bonuses(
        &self,
        filter: &BonusFilter,
        limit: i64,
        offset: i64,
    ) -> BonusResult<(Vec<Bonus>, i64)> {
        let limit = ranking::clamp_limit(limit, MAX_LIST_LIMIT);
        let bonuses = self.store.bonuses(filter, limit, offset.max(0)).await?;
        let total = self.store.count_bonuses(filter).await?;
        Ok((bonuses, total))
    }
}
