//! Client configuration endpoints.

use axum::extract::State;
use ton_rewards::app_config::{AppSettings, SettingsPatch};

use super::{
    AppState,
    response::{ApiError, ApiJson, ApiResponse, ApiResult},
};

/// Public settings read by game clients
pub async fn get_config(State(state): State<AppState>) -> ApiResult<AppSettings> {
    let settings = state.app_config.get_settings()?;
    Ok(ApiResponse::ok("Configuration retrieved", settings))
}

pub async fn update_config(
    State(state): State<AppState>,
    ApiJson(patch): ApiJson<SettingsPatch>,
) -> ApiResult<AppSettings> {
    if patch.is_empty() {
        return Err(ApiError::validation("No settings to update"));
    }
    let settings = state.app_config.update_settings(patch)?;
    Ok(ApiResponse::ok("Configuration updated", settings))
}
