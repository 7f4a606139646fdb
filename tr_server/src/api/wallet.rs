//! Wallet and bonus endpoints of the authenticated user.

use axum::extract::{Extension, State};
use serde::Deserialize;
use ton_rewards::{
    BonusId,
    bonus::{Bonus, BonusClaim},
    leaderboard::Period,
    wallet::{EarningsSummary, LedgerEvent, Wallet},
};

use super::{
    AppState,
    auth::Claims,
    response::{ApiJson, ApiQuery, ApiResponse, ApiResult},
};
use crate::metrics;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TonAddressPayload {
    pub ton_address: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClaimPayload {
    pub bonus_id: BonusId,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_history_limit() -> i64 {
    20
}

#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    #[serde(default)]
    pub period: Period,
}

pub async fn get_wallet(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Wallet> {
    let wallet = state.wallets.get_wallet(claims.sub).await?;
    Ok(ApiResponse::ok("Wallet retrieved", wallet))
}

pub async fn update_ton_address(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(payload): ApiJson<TonAddressPayload>,
) -> ApiResult<Wallet> {
    let wallet = state
        .wallets
        .set_ton_address(claims.sub, &payload.ton_address)
        .await?;
    Ok(ApiResponse::ok("TON address updated", wallet))
}

/// Game rewards and claimed bonuses, newest first
pub async fn transaction_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> ApiResult<Vec<LedgerEvent>> {
    let events = state
        .wallets
        .transaction_history(claims.sub, query.limit, query.offset)
        .await?;
    Ok(ApiResponse::ok("Transaction history", events))
}

pub async fn wallet_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<PeriodQuery>,
) -> ApiResult<EarningsSummary> {
    let earnings = state.wallets.earnings(claims.sub, query.period).await?;
    Ok(ApiResponse::ok("Wallet statistics", earnings))
}

pub async fn available_bonuses(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Vec<Bonus>> {
    let bonuses = state.bonuses.available_bonuses(claims.sub).await?;
    Ok(ApiResponse::ok("Available bonuses", bonuses))
}

pub async fn claim_bonus(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(payload): ApiJson<ClaimPayload>,
) -> ApiResult<BonusClaim> {
    let result = state.bonuses.claim(claims.sub, payload.bonus_id).await;
    metrics::bonus_claims_total(result.is_ok());

    let claim = result?;
    tracing::info!(
        user_id = claims.sub,
        bonus_id = claim.bonus.id,
        "Bonus claimed"
    );
    Ok(ApiResponse::ok("Bonus claimed successfully", claim))
}
