//! Presentation-only error classification.
//!
//! Coordinators branch on the structured errors in [`crate::error`]. Nothing in this
//! module may feed back into saga control flow; it only turns failures into one
//! sentence a player can act on.

use serde::Serialize;

use crate::error::{AppError, ContractError, StoreError, WalletError};

/// Display kind for a surfaced failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "raw", rename_all = "snake_case")]
pub enum ErrorKind {
    WalletUnavailable,
    UserRejected,
    VersionMismatch,
    ConnectionFailure(String),
    ValidationFailure(String),
    StoreFailure(String),
    ContractCallFailure(String),
}

// Keyword rules, checked in this order; the first group with a matching phrase wins.
const REJECTION_PHRASES: &[&str] = &["user rejected", "rejected by user", "user abort", "authorize"];
const DETECTION_PHRASES: &[&str] = &["not detected", "detected", "no wallet"];
const VERSION_PHRASES: &[&str] = &["version"];

// Explicit abort signals a signer may put in a rejected submission.
const SIGNER_ABORT_PHRASES: &[&str] = &["user rejected", "rejected by user", "user abort"];

/// Classify free-form failure text from a wallet, store or contract collaborator.
pub fn classify(raw: &str) -> ErrorKind {
    let haystack = raw.to_ascii_lowercase();
    let mentions = |phrases: &[&str]| phrases.iter().any(|phrase| haystack.contains(phrase));

    if mentions(REJECTION_PHRASES) {
        ErrorKind::UserRejected
    } else if mentions(DETECTION_PHRASES) {
        ErrorKind::WalletUnavailable
    } else if mentions(VERSION_PHRASES) {
        ErrorKind::VersionMismatch
    } else {
        ErrorKind::ConnectionFailure(raw.to_string())
    }
}

impl ErrorKind {
    /// One human-readable sentence for this kind.
    pub fn message(&self) -> String {
        match self {
            ErrorKind::UserRejected => {
                "Connection cancelled. Please approve the connection in your wallet.".to_string()
            }
            ErrorKind::WalletUnavailable => {
                "No StarkNet wallet found. Please install Argent X or Braavos and refresh the page."
                    .to_string()
            }
            ErrorKind::VersionMismatch => {
                "Wallet version issue. Please update your wallet extension to the latest version."
                    .to_string()
            }
            ErrorKind::ConnectionFailure(raw) => format!(
                "Wallet connection failed: {}. Please ensure your wallet is unlocked and set to Sepolia testnet.",
                raw
            ),
            ErrorKind::ValidationFailure(reason) => format!("Invalid username: {}.", reason),
            ErrorKind::StoreFailure(_) => {
                "Player profile is temporarily unavailable. Please try again shortly.".to_string()
            }
            ErrorKind::ContractCallFailure(_) => {
                "The on-chain transaction did not complete. Please reconnect your wallet and try again."
                    .to_string()
            }
        }
    }
}

/// Render an application error as a display kind plus its sentence.
pub fn user_message(err: &AppError) -> (String, ErrorKind) {
    let kind = match err {
        AppError::Wallet(WalletError::Unavailable(_)) => ErrorKind::WalletUnavailable,
        AppError::Wallet(WalletError::UserRejected(_)) => ErrorKind::UserRejected,
        AppError::Wallet(WalletError::VersionMismatch(_)) => ErrorKind::VersionMismatch,
        AppError::Wallet(WalletError::ConnectInProgress) => {
            ErrorKind::ConnectionFailure("a connection request is already pending".to_string())
        }
        AppError::Wallet(other) => classify(&other.to_string()),
        AppError::Validation(reason) => ErrorKind::ValidationFailure(reason.clone()),
        AppError::Store(StoreError::RecordMissing(_)) => {
            return (
                "No player profile exists for this wallet yet. Please reconnect your wallet."
                    .to_string(),
                ErrorKind::StoreFailure(err.to_string()),
            )
        }
        AppError::Store(store) => ErrorKind::StoreFailure(store.to_string()),
        AppError::Contract(ContractError::SubmissionRejected(raw)) if signer_aborted(raw) => {
            ErrorKind::UserRejected
        }
        AppError::Contract(contract) => ErrorKind::ContractCallFailure(contract.to_string()),
        AppError::NotConnected => {
            return (
                "Connect your wallet first.".to_string(),
                ErrorKind::ConnectionFailure(err.to_string()),
            )
        }
        AppError::Internal(raw) => ErrorKind::ConnectionFailure(raw.clone()),
    };
    (kind.message(), kind)
}

fn signer_aborted(raw: &str) -> bool {
    let raw = raw.to_ascii_lowercase();
    SIGNER_ABORT_PHRASES.iter().any(|phrase| raw.contains(phrase))
}
