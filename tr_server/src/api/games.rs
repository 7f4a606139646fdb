//! Game session endpoints.

use axum::extract::{Extension, State};
use serde::Deserialize;
use serde_json::Value;
use ton_rewards::{
    DomainError, SessionId,
    game::{GameConfig, GameSession, GameType, SessionSettlement, SessionStarted},
    score::ScoreSummary,
    wallet::Funds,
};

use super::{
    AppState, auth::Claims, game_type_or_all,
    response::{ApiJson, ApiQuery, ApiResponse, ApiResult},
};
use crate::{logging, metrics};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartPayload {
    pub game_type: GameType,
    #[serde(default)]
    pub game_data: Value,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompletePayload {
    pub session_id: SessionId,
    pub score: i64,
    #[serde(default)]
    pub rewards: Funds,
    #[serde(default)]
    pub is_win: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AbandonPayload {
    pub session_id: SessionId,
}

#[derive(Debug, Default, Deserialize)]
pub struct GameTypeQuery {
    #[serde(default, deserialize_with = "game_type_or_all")]
    pub game_type: Option<GameType>,
}

#[derive(Debug, Deserialize)]
pub struct SessionsQuery {
    #[serde(default, deserialize_with = "game_type_or_all")]
    pub game_type: Option<GameType>,
    #[serde(default = "default_sessions_limit")]
    pub limit: i64,
}

fn default_sessions_limit() -> i64 {
    10
}

/// Open a new `in_progress` session
pub async fn start_game(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(payload): ApiJson<StartPayload>,
) -> ApiResult<SessionStarted> {
    let started = state
        .games
        .start_session(claims.sub, payload.game_type, payload.game_data)
        .await?;
    Ok(ApiResponse::created("Game session started", started))
}

/// Settle a session: credit rewards and update the score row atomically
pub async fn complete_game(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(payload): ApiJson<CompletePayload>,
) -> ApiResult<SessionSettlement> {
    let result = state
        .games
        .complete_session(
            claims.sub,
            payload.session_id,
            payload.score,
            payload.rewards,
            payload.is_win,
        )
        .await;

    match result {
        Ok(settled) => {
            metrics::settlements_total(settled.game_type.as_str(), true);
            logging::log_settlement(
                claims.sub,
                settled.session_id,
                settled.game_type,
                &settled.rewards,
            );
            Ok(ApiResponse::ok("Game completed successfully", settled))
        }
        Err(e) => {
            tracing::debug!(user_id = claims.sub, kind = %e.kind(), "Settlement rejected");
            metrics::settlements_total("unknown", false);
            Err(e.into())
        }
    }
}

/// Mark a session abandoned; it can no longer be completed
pub async fn abandon_game(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(payload): ApiJson<AbandonPayload>,
) -> ApiResult<GameSession> {
    let session = state
        .games
        .abandon_session(claims.sub, payload.session_id)
        .await?;
    Ok(ApiResponse::ok("Game session abandoned", session))
}

pub async fn get_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<GameTypeQuery>,
) -> ApiResult<ScoreSummary> {
    let summary = state.scores.score_stats(claims.sub, query.game_type).await?;
    Ok(ApiResponse::ok("Game statistics", summary))
}

pub async fn recent_sessions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<SessionsQuery>,
) -> ApiResult<Vec<GameSession>> {
    let sessions = state
        .games
        .recent_sessions(claims.sub, query.game_type, query.limit)
        .await?;
    Ok(ApiResponse::ok("Recent game sessions", sessions))
}

/// Static descriptor of one game, or of every game when none is named
pub async fn game_config(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<GameTypeQuery>,
) -> ApiResult<Vec<GameConfig>> {
    let configs = match query.game_type {
        Some(game_type) => vec![state.games.game_config(game_type)],
        None => GameType::ALL
            .iter()
            .map(|game_type| state.games.game_config(*game_type))
            .collect(),
    };
    Ok(ApiResponse::ok("Game configuration", configs))
}
