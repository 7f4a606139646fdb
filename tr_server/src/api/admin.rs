//! Admin endpoints: user management, manual credits, bonus broadcasts and
//! system statistics.
//!
//! Every route here sits behind both the auth and the admin middleware.

use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ton_rewards::{
    UserId,
    bonus::{Bonus, BonusAudience, BonusBroadcast, BonusFilter, BonusType, NewBonus},
    stats::{SystemStats, UserOverview},
    users::{NewUser, User},
    wallet::{AdminCredit, Funds, Wallet},
};

use super::{
    AppState,
    response::{ApiJson, ApiQuery, ApiResponse, ApiResult},
};
use crate::metrics;

#[derive(Debug, Serialize)]
pub struct Registered {
    pub user: User,
    pub wallet: Wallet,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreditPayload {
    #[serde(default)]
    pub amount: Funds,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBonusPayload {
    pub bonus_type: BonusType,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Funds,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Value,
    /// Explicit recipients; every active user when absent
    #[serde(default)]
    pub user_ids: Option<Vec<UserId>>,
}

#[derive(Debug, Deserialize)]
pub struct BonusListQuery {
    pub user_id: Option<UserId>,
    pub bonus_type: Option<BonusType>,
    pub claimed: Option<bool>,
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_list_limit() -> i64 {
    20
}

#[derive(Debug, Serialize)]
pub struct BonusPage {
    pub bonuses: Vec<Bonus>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Create a user together with its seeded wallet
pub async fn register_user(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewUser>,
) -> ApiResult<Registered> {
    let (user, wallet) = state.users.register(payload).await?;
    Ok(ApiResponse::created("User registered", Registered { user, wallet }))
}

pub async fn credit_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    ApiJson(payload): ApiJson<CreditPayload>,
) -> ApiResult<AdminCredit> {
    let credit = state
        .wallets
        .admin_credit(user_id, payload.amount, &payload.reason)
        .await?;
    tracing::info!(
        user_id = user_id,
        bonus_id = credit.bonus_id,
        reason = %payload.reason,
        "Admin credit applied"
    );
    Ok(ApiResponse::ok("Wallet credited successfully", credit))
}

pub async fn deactivate_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> ApiResult<User> {
    let user = state.users.set_active(user_id, false).await?;
    Ok(ApiResponse::ok("User deactivated", user))
}

pub async fn activate_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> ApiResult<User> {
    let user = state.users.set_active(user_id, true).await?;
    Ok(ApiResponse::ok("User activated", user))
}

pub async fn user_stats(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> ApiResult<UserOverview> {
    let overview = state.stats.user_overview(user_id).await?;
    Ok(ApiResponse::ok("User details", overview))
}

pub async fn create_bonus(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateBonusPayload>,
) -> ApiResult<BonusBroadcast> {
    let audience = match payload.user_ids {
        Some(ids) => BonusAudience::Users(ids),
        None => BonusAudience::AllUsers,
    };
    let bonus = NewBonus {
        bonus_type: payload.bonus_type,
        title: payload.title,
        description: payload.description,
        amount: payload.amount,
        expires_at: payload.expires_at,
        metadata: payload.metadata,
    };

    let broadcast = state.bonuses.create_bonus(bonus, audience).await?;
    Ok(ApiResponse::created(
        format!("Bonus created for {} users", broadcast.created),
        broadcast,
    ))
}

pub async fn list_bonuses(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<BonusListQuery>,
) -> ApiResult<BonusPage> {
    let filter = BonusFilter {
        user_id: query.user_id,
        bonus_type: query.bonus_type,
        claimed: query.claimed,
        ..BonusFilter::default()
    };
    let (bonuses, total) = state
        .bonuses
        .list_bonuses(&filter, query.limit, query.offset)
        .await?;
    Ok(ApiResponse::ok(
        "Bonuses retrieved",
        BonusPage {
            bonuses,
            total,
            limit: query.limit,
            offset: query.offset,
        },
    ))
}

pub async fn system_stats(State(state): State<AppState>) -> ApiResult<SystemStats> {
    let stats = state.stats.system_stats().await?;
    metrics::cache_stats("system_stats", state.stats.cache_stats());
    Ok(ApiResponse::ok("System statistics", stats))
}
