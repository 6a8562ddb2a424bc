use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::services::error_classifier::{user_message, ErrorKind};

/// Failures raised by the wallet connector at the call site.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("No StarkNet wallet detected: {0}")]
    Unavailable(String),

    #[error("User rejected the wallet request: {0}")]
    UserRejected(String),

    #[error("Wallet version mismatch: {0}")]
    VersionMismatch(String),

    #[error("{0}")]
    ConnectionFailure(String),

    #[error("Failed to disconnect wallet: {0}")]
    DisconnectFailure(String),

    #[error("Wallet connection already in progress")]
    ConnectInProgress,
}

/// Failures raised by an identity store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("User not found: {0}")]
    RecordMissing(String),

    #[error("User already exists: {0}")]
    Duplicate(String),

    #[error("Identity store unavailable: {0}")]
    Connectivity(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Connectivity(err.to_string())
    }
}

/// Failures raised by the contract gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("No transaction hash returned from contract call")]
    MissingTransactionHash,

    #[error("Contract call rejected: {0}")]
    SubmissionRejected(String),

    #[error("Transaction {tx_hash} failed to confirm: {reason}")]
    ConfirmationFailed { tx_hash: String, reason: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error("Invalid username: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Contract call failed: {0}")]
    Contract(#[from] ContractError),

    #[error("Wallet not connected")]
    NotConnected,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Wallet(WalletError::Unavailable(_)) => "WALLET_UNAVAILABLE",
            AppError::Wallet(WalletError::UserRejected(_)) => "USER_REJECTED",
            AppError::Wallet(WalletError::VersionMismatch(_)) => "VERSION_MISMATCH",
            AppError::Wallet(WalletError::DisconnectFailure(_)) => "DISCONNECT_FAILURE",
            AppError::Wallet(WalletError::ConnectInProgress) => "CONNECT_IN_PROGRESS",
            AppError::Wallet(WalletError::ConnectionFailure(_)) => "CONNECTION_FAILURE",
            AppError::Validation(_) => "VALIDATION_FAILURE",
            AppError::Store(StoreError::RecordMissing(_)) => "RECORD_MISSING",
            AppError::Store(_) => "STORE_FAILURE",
            AppError::Contract(_) => "CONTRACT_CALL_FAILURE",
            AppError::NotConnected => "NOT_CONNECTED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Wallet(WalletError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Wallet(WalletError::UserRejected(_)) => StatusCode::FORBIDDEN,
            AppError::Wallet(WalletError::ConnectInProgress) => StatusCode::CONFLICT,
            AppError::Wallet(_) => StatusCode::BAD_GATEWAY,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Store(StoreError::RecordMissing(_)) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::Duplicate(_)) => StatusCode::CONFLICT,
            AppError::Store(StoreError::Connectivity(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Contract(_) => StatusCode::BAD_GATEWAY,
            AppError::NotConnected => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, kind) = user_message(&self);
        let details = match kind {
            ErrorKind::ConnectionFailure(raw) => Some(serde_json::json!({ "raw": raw })),
            _ => None,
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        let body = Json(ErrorResponse {
            success: false,
            error: ErrorDetail {
                code: self.code().to_string(),
                message,
                details,
            },
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
