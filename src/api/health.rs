use axum::{extract::State, Json};
use serde::Serialize;

use super::AppState;
use crate::services::wallet_session::ConnectionState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub identity_store: String,
    pub wallet: ConnectionState,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let wallet = state.session.snapshot().await.state;

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config.environment.clone(),
        identity_store: state.store_kind.to_string(),
        wallet,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_state::default_state;

    #[tokio::test]
    async fn health_reports_store_and_wallet_state() {
        let (state, _, _) = default_state("0x1");
        let Json(body) = health_check(State(state)).await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.identity_store, "recording");
        assert_eq!(body.wallet, ConnectionState::Disconnected);
    }
}
