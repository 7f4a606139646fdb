//! Integration tests for the HTTP surface.
//!
//! The router runs against an in-memory ledger; tokens are minted with the
//! same secret the server verifies with.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use std::{sync::Arc, time::Duration};
use ton_rewards::{clock::SystemClock, db::MemoryLedgerStore, users::DEFAULT_STARTING_FUNDS};
use tower::ServiceExt; // For `oneshot` method
use tr_server::{
    api::{self, AppState, auth::Claims},
    config::ServerConfig,
};

const SECRET: &str = "test_secret_key_for_testing_only_0123456789";
const ADMIN_ID: i64 = 9_000;

fn create_test_server() -> Router {
    let config = ServerConfig {
        bind: "127.0.0.1:0".parse().unwrap(),
        database: ton_rewards::db::DatabaseConfig::new("unused"),
        jwt_secret: SECRET.to_string(),
        starting_funds: DEFAULT_STARTING_FUNDS,
        leaderboard_cache_ttl: Duration::from_secs(300),
        stats_cache_ttl: Duration::from_secs(60),
        metrics_bind: None,
    };
    let state = AppState::new(
        Arc::new(MemoryLedgerStore::new()),
        Arc::new(SystemClock),
        &config,
    );
    api::create_router(state)
}

fn token(user_id: i64, is_admin: bool) -> String {
    let claims = Claims {
        sub: user_id,
        is_admin,
        exp: chrono::Utc::now().timestamp() + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Register a user through the admin API and return its id
async fn register(app: &Router, username: &str) -> i64 {
    let admin = token(ADMIN_ID, true);
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/admin/users",
        Some(&admin),
        Some(json!({ "username": username })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["user"]["id"].as_i64().unwrap()
}

// ============================================================================
// Health and Public Endpoints
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = create_test_server();

    let (status, body) = send(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "online");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = create_test_server();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-me")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.headers()["x-request-id"], "trace-me");
}

#[tokio::test]
async fn test_public_config_defaults() {
    let app = create_test_server();

    let (status, body) = send(&app, "GET", "/api/v1/config", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["payoutDay"], "Tuesday");
    assert_eq!(body["data"]["maxSpinsPerDay"], 10);
}

// ============================================================================
// Authentication Tests
// ============================================================================

#[tokio::test]
async fn test_missing_token_rejected() {
    let app = create_test_server();

    let (status, body) = send(&app, "GET", "/api/v1/wallet", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_invalid_token_rejected() {
    let app = create_test_server();

    let (status, _) = send(&app, "GET", "/api/v1/wallet", Some("garbage"), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_route_requires_admin_claim() {
    let app = create_test_server();
    let user = token(1, false);

    let (status, body) = send(&app, "GET", "/api/v1/admin/stats", Some(&user), None).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

// ============================================================================
// Settlement Tests
// ============================================================================

#[tokio::test]
async fn test_game_settlement_flow() {
    let app = create_test_server();
    let user_id = register(&app, "alice").await;
    let user = token(user_id, false);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/games/start",
        Some(&user),
        Some(json!({ "game_type": "spin", "game_data": { "wheel": 1 } })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let session_id = body["data"]["session_id"].as_i64().unwrap();

    let complete = json!({
        "session_id": session_id,
        "score": 150,
        "rewards": { "ton": "0.5", "gems": 10 },
        "is_win": true,
    });
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/games/complete",
        Some(&user),
        Some(complete.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["wallet"]["gems"], 110);
    assert_eq!(body["data"]["total_score"], 150);

    // Terminal sessions cannot settle twice
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/games/complete",
        Some(&user),
        Some(complete),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (_, body) = send(&app, "GET", "/api/v1/wallet", Some(&user), None).await;
    assert_eq!(body["data"]["gems"], 110);

    let (status, body) = send(
        &app,
        "GET",
        "/api/v1/leaderboard/position?game_type=spin&period=week",
        Some(&user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["position"], 1);
    assert_eq!(body["data"]["user_score"], 150);

    let (status, body) = send(&app, "GET", "/api/v1/games/stats", Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_games"], 1);
}

#[tokio::test]
async fn test_completion_validation() {
    let app = create_test_server();
    let user_id = register(&app, "bob").await;
    let user = token(user_id, false);

    let (_, body) = send(
        &app,
        "POST",
        "/api/v1/games/start",
        Some(&user),
        Some(json!({ "game_type": "drop" })),
    )
    .await;
    let session_id = body["data"]["session_id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/games/complete",
        Some(&user),
        Some(json!({ "session_id": session_id, "score": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation");

    // Reward bundles are closed records
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/games/complete",
        Some(&user),
        Some(json!({ "session_id": session_id, "score": 5, "rewards": { "coins": 3 } })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/games/complete",
        Some(&user),
        Some(json!({ "session_id": session_id + 1000, "score": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Game session not found");

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/games/start",
        Some(&user),
        Some(json!({ "game_type": "poker" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// ============================================================================
// Bonus Tests
// ============================================================================

#[tokio::test]
async fn test_bonus_claim_flow() {
    let app = create_test_server();
    let admin = token(ADMIN_ID, true);
    let user_id = register(&app, "carol").await;
    let user = token(user_id, false);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/admin/bonuses",
        Some(&admin),
        Some(json!({
            "bonus_type": "daily",
            "title": "Daily Bonus",
            "amount": { "diamonds": 5 },
            "user_ids": [user_id],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let bonus_id = body["data"]["bonus_ids"][0].as_i64().unwrap();

    let (_, body) = send(&app, "GET", "/api/v1/wallet/bonuses", Some(&user), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let claim = json!({ "bonus_id": bonus_id });
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/wallet/bonuses/claim",
        Some(&user),
        Some(claim.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["wallet"]["diamonds"], 15);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/wallet/bonuses/claim",
        Some(&user),
        Some(claim),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/admin/bonuses?user_id={user_id}&claimed=true"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
}

#[tokio::test]
async fn test_other_users_bonus_is_not_found() {
    let app = create_test_server();
    let admin = token(ADMIN_ID, true);
    let owner = register(&app, "dave").await;
    let intruder = register(&app, "erin").await;

    let (_, body) = send(
        &app,
        "POST",
        "/api/v1/admin/bonuses",
        Some(&admin),
        Some(json!({
            "bonus_type": "weekly",
            "title": "Weekly",
            "amount": { "gems": 1 },
            "user_ids": [owner],
        })),
    )
    .await;
    let bonus_id = body["data"]["bonus_ids"][0].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/wallet/bonuses/claim",
        Some(&token(intruder, false)),
        Some(json!({ "bonus_id": bonus_id })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Admin Tests
// ============================================================================

#[tokio::test]
async fn test_admin_credit_and_deactivation() {
    let app = create_test_server();
    let admin = token(ADMIN_ID, true);
    let user_id = register(&app, "frank").await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/admin/users/{user_id}/credit"),
        Some(&admin),
        Some(json!({ "amount": { "gems": 50 }, "reason": "Compensation" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["wallet"]["gems"], 150);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/admin/users/{user_id}/credit"),
        Some(&admin),
        Some(json!({ "amount": { "gems": 50 }, "reason": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/admin/users/{user_id}/deactivate"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_active"], false);

    // Deactivated users cannot open sessions
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/games/start",
        Some(&token(user_id, false)),
        Some(json!({ "game_type": "spin" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/admin/users/{user_id}/stats"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["wallet"]["gems"], 150);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = create_test_server();
    register(&app, "grace").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/admin/users",
        Some(&token(ADMIN_ID, true)),
        Some(json!({ "username": "grace" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Username already taken");
}

#[tokio::test]
async fn test_admin_config_update() {
    let app = create_test_server();
    let admin = token(ADMIN_ID, true);

    let (status, body) = send(
        &app,
        "PUT",
        "/api/v1/admin/config",
        Some(&admin),
        Some(json!({ "maxSpinsPerDay": 25, "payoutDay": "Friday" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (_, body) = send(&app, "GET", "/api/v1/config", None, None).await;
    assert_eq!(body["data"]["maxSpinsPerDay"], 25);
    assert_eq!(body["data"]["payoutDay"], "Friday");

    let (status, _) = send(
        &app,
        "PUT",
        "/api/v1/admin/config",
        Some(&admin),
        Some(json!({ "maxSpinsPerDay": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_system_stats() {
    let app = create_test_server();
    register(&app, "heidi").await;
    register(&app, "ivan").await;

    let (status, body) = send(
        &app,
        "GET",
        "/api/v1/admin/stats",
        Some(&token(ADMIN_ID, true)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["users"]["total"], 2);
}
