use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::{address_key, default_username};

// ==================== IDENTITY RECORD ====================
/// Off-chain player identity, one row per wallet address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct IdentityRecord {
    pub wallet_address: String,
    pub username: String,
    pub highest_score: i64,
    pub total_accumulated_score: i64,
    pub games_played: i64,
    /// Set once the username has been anchored on-chain.
    #[sqlx(rename = "updated")]
    #[serde(rename = "updated", default)]
    pub on_chain_confirmed: bool,
    #[serde(default)]
    pub registration_tx: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewIdentityRecord {
    pub wallet_address: String,
    pub username: String,
    pub highest_score: i64,
    pub total_accumulated_score: i64,
    pub games_played: i64,
}

impl NewIdentityRecord {
    /// Fresh record for a wallet seen for the first time.
    pub fn for_new_wallet(address: &str) -> Self {
        Self {
            wallet_address: address.to_string(),
            username: default_username(address),
            highest_score: 0,
            total_accumulated_score: 0,
            games_played: 0,
        }
    }

    /// Same record with `wallet_address` in the canonical form persistent stores key on.
    pub fn keyed(self) -> Self {
        Self {
            wallet_address: address_key(&self.wallet_address),
            ..self
        }
    }
}

/// Partial update applied by `IdentityStore::update`; `updated_at` is always bumped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdentityPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(rename = "updated", skip_serializing_if = "Option::is_none")]
    pub on_chain_confirmed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_tx: Option<String>,
}

impl IdentityPatch {
    pub fn rename(username: &str, anchored_on_chain: bool) -> Self {
        Self {
            username: Some(username.to_string()),
            on_chain_confirmed: anchored_on_chain.then_some(true),
            registration_tx: None,
        }
    }

    pub fn registration(tx_hash: &str) -> Self {
        Self {
            registration_tx: Some(tx_hash.to_string()),
            ..Self::default()
        }
    }
}

// ==================== PLAYER DETAILS ====================
/// Projection handed to the dashboard after every sync or rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerDetails {
    pub username: String,
    pub wallet_address: String,
    pub score: String,
    pub leaderboard_position: u32,
}

impl PlayerDetails {
    pub fn from_record(record: &IdentityRecord) -> Self {
        Self {
            username: record.username.clone(),
            wallet_address: record.wallet_address.clone(),
            score: record.highest_score.to_string(),
            leaderboard_position: 0,
        }
    }

    /// Degraded view used when the store cannot be read.
    pub fn fallback(address: &str) -> Self {
        Self {
            username: default_username(address),
            wallet_address: address.to_string(),
            score: "0".to_string(),
            leaderboard_position: 0,
        }
    }
}

// ==================== CONTRACT CALLS ====================
/// What the gateway hands back right after submitting a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxSubmission {
    pub transaction_hash: Option<String>,
}

impl TxSubmission {
    pub fn accepted(hash: impl Into<String>) -> Self {
        Self {
            transaction_hash: Some(hash.into()),
        }
    }

    /// The hash, if the node returned a non-empty one.
    pub fn hash(&self) -> Option<&str> {
        self.transaction_hash
            .as_deref()
            .map(str::trim)
            .filter(|hash| !hash.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationReceipt {
    pub transaction_hash: String,
    pub confirmed: bool,
    pub block_number: Option<u64>,
}

// ==================== API RESPONSE ====================
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
