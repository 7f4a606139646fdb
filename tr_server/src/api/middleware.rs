//! Authentication middleware for protected endpoints.
//!
//! [`auth_middleware`] verifies the `Authorization: Bearer <token>` header
//! and injects the decoded [`Claims`] into request extensions. Handlers
//! read them with `Extension<Claims>`:
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//! use tr_server::api::auth::Claims;
//!
//! async fn whoami(Extension(claims): Extension<Claims>) -> String {
//!     format!("Authenticated as user {}", claims.sub)
//! }
//! # let _ = whoami;
//! ```
//!
//! [`admin_middleware`] runs after it on admin routes and rejects callers
//! whose token lacks `is_admin`.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{AppState, auth::Claims, response::ApiError};
use crate::logging::log_security_event;

/// Validates the bearer token and injects its claims
///
/// - **Missing header or bad format**: `401 Unauthorized`
/// - **Invalid or expired token**: `401 Unauthorized`
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let Some(token) = token else {
        return ApiError::unauthorized("Missing bearer token").into_response();
    };

    match state.tokens.verify(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            log_security_event("invalid_token", None, &e.to_string());
            ApiError::unauthorized("Invalid or expired token").into_response()
        }
    }
}

/// Rejects non-admin callers; must be layered inside [`auth_middleware`]
pub async fn admin_middleware(request: Request, next: Next) -> Response {
    match request.extensions().get::<Claims>() {
        Some(claims) if claims.is_admin => next.run(request).await,
        Some(claims) => {
            log_security_event(
                "admin_denied",
                Some(claims.sub),
                &format!("Non-admin access to {}", request.uri().path()),
            );
            ApiError::forbidden("Admin access required").into_response()
        }
        None => ApiError::unauthorized("Missing bearer token").into_response(),
    }
}
