//! HTTP API for the rewards backend.
//!
//! Routes live under `/api/v1`; `/health` stays at the root for load
//! balancers. All bodies use the envelope from [`response`].

pub mod admin;
pub mod app_config;
pub mod auth;
pub mod games;
pub mod leaderboard;
pub mod middleware;
pub mod request_id;
pub mod response;
pub mod wallet;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::{Deserialize, Deserializer};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use ton_rewards::{
    app_config::{AppConfigManager, InMemoryConfigService},
    bonus::BonusManager,
    clock::Clock,
    db::LedgerStore,
    game::{GameManager, GameType},
    leaderboard::{LeaderboardConfig, LeaderboardManager},
    score::ScoreManager,
    stats::StatsManager,
    users::UserManager,
    wallet::WalletManager,
};

use crate::config::ServerConfig;
use auth::TokenVerifier;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub users: UserManager,
    pub wallets: WalletManager,
    pub games: GameManager,
    pub scores: ScoreManager,
    pub bonuses: BonusManager,
    pub leaderboard: LeaderboardManager,
    pub stats: StatsManager,
    pub app_config: AppConfigManager,
    pub tokens: Arc<TokenVerifier>,
}

impl AppState {
    /// Wire every manager to one ledger store and clock
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>, config: &ServerConfig) -> Self {
        let leaderboard_config = LeaderboardConfig {
            ranking_ttl: config.leaderboard_cache_ttl,
            global_stats_ttl: config.leaderboard_cache_ttl * 2,
        };

        Self {
            users: UserManager::new(store.clone(), clock.clone(), config.starting_funds),
            wallets: WalletManager::new(store.clone(), clock.clone()),
            games: GameManager::new(store.clone(), clock.clone()),
            scores: ScoreManager::new(store.clone(), clock.clone()),
            bonuses: BonusManager::new(store.clone(), clock.clone()),
            leaderboard: LeaderboardManager::with_config(
                store.clone(),
                clock.clone(),
                leaderboard_config,
            ),
            stats: StatsManager::with_ttl(store.clone(), clock.clone(), config.stats_cache_ttl),
            app_config: AppConfigManager::new(Arc::new(InMemoryConfigService::new()), clock),
            tokens: Arc::new(TokenVerifier::new(&config.jwt_secret)),
            store,
        }
    }
}

/// Query helper: absent or `all` means no game type filter
pub(crate) fn game_type_or_all<'de, D>(deserializer: D) -> Result<Option<GameType>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)?.as_deref() {
        None | Some("all") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router(state.clone()))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/config", get(app_config::get_config));

    let protected = Router::new()
        .route("/games/start", post(games::start_game))
        .route("/games/complete", post(games::complete_game))
        .route("/games/abandon", post(games::abandon_game))
        .route("/games/stats", get(games::get_stats))
        .route("/games/sessions", get(games::recent_sessions))
        .route("/games/config", get(games::game_config))
        .route("/wallet", get(wallet::get_wallet))
        .route("/wallet/ton-address", put(wallet::update_ton_address))
        .route("/wallet/transactions", get(wallet::transaction_history))
        .route("/wallet/stats", get(wallet::wallet_stats))
        .route("/wallet/bonuses", get(wallet::available_bonuses))
        .route("/wallet/bonuses/claim", post(wallet::claim_bonus))
        .route("/leaderboard", get(leaderboard::get_leaderboard))
        .route("/leaderboard/position", get(leaderboard::get_position))
        .route("/leaderboard/global-stats", get(leaderboard::get_global_stats))
        .route("/leaderboard/top-players", get(leaderboard::get_top_players));

    let admin = Router::new()
        .route("/users", post(admin::register_user))
        .route("/users/{id}/credit", post(admin::credit_user))
        .route("/users/{id}/deactivate", post(admin::deactivate_user))
        .route("/users/{id}/activate", post(admin::activate_user))
        .route("/users/{id}/stats", get(admin::user_stats))
        .route("/bonuses", post(admin::create_bonus).get(admin::list_bonuses))
        .route("/stats", get(admin::system_stats))
        .route("/config", put(app_config::update_config))
        .route_layer(axum::middleware::from_fn(middleware::admin_middleware));

    let authenticated = protected
        .nest("/admin", admin)
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth_middleware,
        ));

    public.merge(authenticated)
}

/// Liveness plus a datastore round trip
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (status, message, label) = match state.store.health_check().await {
        Ok(()) => (StatusCode::OK, "API is healthy", "online"),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "Database unavailable", "degraded")
        }
    };

    (
        status,
        Json(json!({
            "success": status.is_success(),
            "message": message,
            "data": {
                "status": label,
                "version": env!("CARGO_PKG_VERSION"),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }
        })),
    )
}
