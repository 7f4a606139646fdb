//! Leaderboard endpoints.

use axum::extract::{Extension, State};
use serde::Deserialize;
use ton_rewards::{
    game::GameType,
    leaderboard::{GlobalStats, LeaderboardPage, Period, TopPlayer, UserPosition},
};

use super::{
    AppState,
    auth::Claims,
    game_type_or_all,
    response::{ApiQuery, ApiResponse, ApiResult},
};
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct RankingQuery {
    #[serde(default = "default_game_type")]
    pub game_type: GameType,
    #[serde(default)]
    pub period: Period,
    #[serde(default = "default_ranking_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Deserialize)]
pub struct PositionQuery {
    #[serde(default = "default_game_type")]
    pub game_type: GameType,
    #[serde(default)]
    pub period: Period,
}

#[derive(Debug, Default, Deserialize)]
pub struct GlobalStatsQuery {
    #[serde(default, deserialize_with = "game_type_or_all")]
    pub game_type: Option<GameType>,
    #[serde(default)]
    pub period: Period,
}

#[derive(Debug, Deserialize)]
pub struct TopPlayersQuery {
    #[serde(default)]
    pub period: Period,
    #[serde(default = "default_top_limit")]
    pub limit: i64,
}

fn default_game_type() -> GameType {
    GameType::Spin
}

fn default_ranking_limit() -> i64 {
    50
}

fn default_top_limit() -> i64 {
    10
}

fn publish_cache_stats(state: &AppState) {
    metrics::cache_stats("leaderboard", state.leaderboard.cache_stats());
}

pub async fn get_leaderboard(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RankingQuery>,
) -> ApiResult<LeaderboardPage> {
    let page = state
        .leaderboard
        .rank(query.game_type, query.period, query.limit, query.offset)
        .await?;
    publish_cache_stats(&state);
    Ok(ApiResponse::ok("Leaderboard retrieved", page))
}

/// Position of the caller; `position` is null when they have no qualifying score
pub async fn get_position(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<PositionQuery>,
) -> ApiResult<UserPosition> {
    let position = state
        .leaderboard
        .position(claims.sub, query.game_type, query.period)
        .await?;
    Ok(ApiResponse::ok("User position", position))
}

pub async fn get_global_stats(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<GlobalStatsQuery>,
) -> ApiResult<GlobalStats> {
    let stats = state
        .leaderboard
        .global_stats(query.game_type, query.period)
        .await?;
    publish_cache_stats(&state);
    Ok(ApiResponse::ok("Global statistics", stats))
}

pub async fn get_top_players(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TopPlayersQuery>,
) -> ApiResult<Vec<TopPlayer>> {
    let players = state
        .leaderboard
        .top_players(query.period, query.limit)
        .await?;
    publish_cache_stats(&state);
    Ok(ApiResponse::ok("Top players", players))
}
