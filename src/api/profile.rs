use axum::{extract::State, Json};
use serde::Deserialize;

use crate::{
    error::{AppError, Result, StoreError},
    models::{ApiResponse, PlayerDetails},
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateUsernameRequest {
    pub username: String,
}

/// GET /api/v1/player
pub async fn get_player(State(state): State<AppState>) -> Result<Json<ApiResponse<PlayerDetails>>> {
    let snapshot = state.session.snapshot().await;
    let address = snapshot.address.ok_or(AppError::NotConnected)?;
    // connected but the last sync failed before producing details
    let player = snapshot
        .player
        .ok_or_else(|| AppError::Store(StoreError::RecordMissing(address)))?;
    Ok(Json(ApiResponse::success(player)))
}

/// PUT /api/v1/player/username
pub async fn update_username(
    State(state): State<AppState>,
    Json(req): Json<UpdateUsernameRequest>,
) -> Result<Json<ApiResponse<PlayerDetails>>> {
    let details = state.session.rename(&req.username).await?;
    Ok(Json(ApiResponse::success(details)))
}
