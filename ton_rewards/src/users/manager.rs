//! User registration and activation.

use rust_decimal::Decimal;
use std::sync::Arc;

use super::{
    errors::{UserError, UserResult},
    models::{NewUser, User},
};
use crate::{
    UserId,
    clock::Clock,
    db::LedgerStore,
    wallet::{Funds, Wallet},
};

const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 50;
const MAX_DISPLAY_NAME_LEN: usize = 100;

/// Balances every new wallet starts with
pub const DEFAULT_STARTING_FUNDS: Funds = Funds {
    token: Decimal::ZERO,
    gems: 100,
    diamonds: 10,
};

/// User manager
#[derive(Clone)]
pub struct UserManager {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    starting_funds: Funds,
}

impl UserManager {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>, starting_funds: Funds) -> Self {
        Self {
            store,
            clock,
            starting_funds,
        }
    }

    /// Register a user together with a seeded wallet
    ///
    /// # Arguments
    ///
    /// * `request` - Username, optional display name and admin flag
    ///
    /// # Errors
    ///
    /// * `UserError::InvalidUsername` - Bad length or characters
    /// * `UserError::UsernameTaken` - Username already registered
    pub async fn register(&self, request: NewUser) -> UserResult<(User, Wallet)> {
        validate_username(&request.username)?;
        if request
            .display_name
            .as_ref()
            .is_some_and(|name| name.chars().count() > MAX_DISPLAY_NAME_LEN)
        {
            return Err(UserError::InvalidDisplayName);
        }

        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        if tx.find_user_by_username(&request.username).await?.is_some() {
            return Err(UserError::UsernameTaken);
        }

        let user = tx.insert_user(&request, now).await?;
        let wallet = tx.insert_wallet(user.id, &self.starting_funds, now).await?;
        tx.commit().await?;

        log::info!("Registered user {} ({})", user.id, user.username);

        Ok((user, wallet))
    }

    pub async fn find(&self, user_id: UserId) -> UserResult<User> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or(UserError::UserNotFound(user_id))
    }

    /// Activate or deactivate a user
    ///
    /// Deactivated users keep their data but cannot start sessions or
    /// receive broadcast bonuses.
    pub async fn set_active(&self, user_id: UserId, active: bool) -> UserResult<User> {
        let mut tx = self.store.begin().await?;
        let user = tx
            .set_user_active(user_id, active)
            .await?
            .ok_or(UserError::UserNotFound(user_id))?;
        tx.commit().await?;

        log::info!(
            "User {} {}",
            user_id,
            if active { "activated" } else { "deactivated" }
        );
        Ok(user)
    }
}

fn validate_username(username: &str) -> UserResult<()> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(UserError::InvalidUsername("must be 3-50 characters"));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(UserError::InvalidUsername(
            "only letters, numbers and underscores are allowed",
        ));
    }
    Ok(())
}
