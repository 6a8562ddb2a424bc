use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    error::StoreError,
    models::{IdentityPatch, IdentityRecord, NewIdentityRecord},
    utils::address_key,
};

/// Off-chain identity records, keyed by wallet address.
#[async_trait::async_trait]
pub trait IdentityStore: Send + Sync {
    /// `Ok(None)` when the wallet has no record; errors are reserved for store failures.
    async fn get(&self, address: &str) -> Result<Option<IdentityRecord>, StoreError>;

    /// Fails with [`StoreError::Duplicate`] if a record already exists for the address.
    async fn create(&self, record: NewIdentityRecord) -> Result<IdentityRecord, StoreError>;

    /// Fails with [`StoreError::RecordMissing`] if there is nothing to update.
    async fn update(
        &self,
        address: &str,
        patch: IdentityPatch,
    ) -> Result<IdentityRecord, StoreError>;

    /// Only used to compensate a failed registration.
    async fn delete(&self, address: &str) -> Result<(), StoreError>;

    fn kind(&self) -> &'static str;
}

// ==================== IN-MEMORY ====================

/// Process-local store for development runs and tests.
#[derive(Clone, Default)]
pub struct MemoryIdentityStore {
    records: Arc<RwLock<HashMap<String, IdentityRecord>>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait::async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn get(&self, address: &str) -> Result<Option<IdentityRecord>, StoreError> {
        Ok(self.records.read().await.get(&address_key(address)).cloned())
    }

    async fn create(&self, record: NewIdentityRecord) -> Result<IdentityRecord, StoreError> {
        let key = address_key(&record.wallet_address);
        let mut records = self.records.write().await;
        if records.contains_key(&key) {
            return Err(StoreError::Duplicate(record.wallet_address));
        }

        let now = Utc::now();
        let created = IdentityRecord {
            wallet_address: record.wallet_address,
            username: record.username,
            highest_score: record.highest_score,
            total_accumulated_score: record.total_accumulated_score,
            games_played: record.games_played,
            on_chain_confirmed: false,
            registration_tx: None,
            created_at: now,
            updated_at: now,
        };
        records.insert(key, created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        address: &str,
        patch: IdentityPatch,
    ) -> Result<IdentityRecord, StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&address_key(address))
            .ok_or_else(|| StoreError::RecordMissing(address.to_string()))?;

        if let Some(username) = patch.username {
            record.username = username;
        }
        if let Some(confirmed) = patch.on_chain_confirmed {
            record.on_chain_confirmed = confirmed;
        }
        if let Some(tx) = patch.registration_tx {
            record.registration_tx = Some(tx);
        }
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn delete(&self, address: &str) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .remove(&address_key(address))
            .map(|_| ())
            .ok_or_else(|| StoreError::RecordMissing(address.to_string()))
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
