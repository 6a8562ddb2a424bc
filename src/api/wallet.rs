use axum::{extract::State, Json};
use serde::Serialize;

use crate::{
    error::{AppError, Result},
    models::{ApiResponse, PlayerDetails},
    services::{
        error_classifier::user_message,
        identity_sync::IdentityStatus,
        wallet_session::{ConnectOutcome, SessionSnapshot},
    },
};

use super::AppState;

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<IdentityStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player: Option<PlayerDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl ConnectResponse {
    fn disconnected() -> Self {
        Self {
            connected: false,
            address: None,
            status: None,
            player: None,
            warning: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DisconnectResponse {
    pub connected: bool,
}

/// POST /api/v1/wallet/connect
///
/// Toggles: connects when disconnected, disconnects when already connected.
pub async fn connect(State(state): State<AppState>) -> Result<Json<ApiResponse<ConnectResponse>>> {
    let response = match state.session.connect().await? {
        ConnectOutcome::Connected { address, sync } => {
            // the wallet stays connected; the client may reconnect to retry the sync
            let outcome = sync?;
            let warning = outcome
                .warning
                .map(|err| user_message(&AppError::Store(err)).0);
            ConnectResponse {
                connected: true,
                address: Some(address),
                status: Some(outcome.status),
                player: Some(outcome.player),
                warning,
            }
        }
        ConnectOutcome::Disconnected | ConnectOutcome::Superseded => ConnectResponse::disconnected(),
    };

    Ok(Json(ApiResponse::success(response)))
}

/// POST /api/v1/wallet/disconnect
pub async fn disconnect(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DisconnectResponse>>> {
    state.session.disconnect().await?;
    Ok(Json(ApiResponse::success(DisconnectResponse { connected: false })))
}

/// GET /api/v1/wallet/session
pub async fn get_session(State(state): State<AppState>) -> Json<ApiResponse<SessionSnapshot>> {
    Json(ApiResponse::success(state.session.snapshot().await))
}
