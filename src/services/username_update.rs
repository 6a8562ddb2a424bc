use std::sync::Arc;

use crate::{
    constants::USERNAME_MAX_LEN,
    error::{AppError, Result, StoreError},
    models::{IdentityPatch, PlayerDetails},
    services::{
        address_lock::AddressLocks, contract_gateway::confirm_submission,
        identity_store::IdentityStore, wallet_session::Session,
    },
};

/// Checks a requested username before anything touches the store or the chain.
pub fn validate_username(raw: &str) -> Result<&str> {
    if raw.is_empty() || raw.chars().count() > USERNAME_MAX_LEN {
        return Err(AppError::Validation(format!(
            "please enter a valid username (1-{} characters)",
            USERNAME_MAX_LEN
        )));
    }
    if !raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AppError::Validation(
            "username must contain only alphanumeric characters or underscores".to_string(),
        ));
    }
    Ok(raw)
}

/// Applies renames; only the first one is anchored on-chain.
pub struct UsernameUpdateCoordinator {
    store: Arc<dyn IdentityStore>,
    locks: AddressLocks,
}

impl UsernameUpdateCoordinator {
    pub fn new(store: Arc<dyn IdentityStore>, locks: AddressLocks) -> Self {
        Self { store, locks }
    }

    pub async fn rename(&self, session: &Session, new_username: &str) -> Result<PlayerDetails> {
        let username = validate_username(new_username)?;
        let address = session.address();
        let _guard = self.locks.acquire(address).await;

        let record = self
            .store
            .get(address)
            .await?
            .ok_or_else(|| StoreError::RecordMissing(address.to_string()))?;

        let anchored = if record.on_chain_confirmed {
            tracing::info!("User {} already updated on-chain, skipping contract call", address);
            false
        } else {
            let gateway = session.account();
            let submission = gateway.update_username(username).await?;
            let receipt = confirm_submission(gateway, submission).await?;
            tracing::info!(
                "Username for {} anchored on-chain in {}",
                address,
                receipt.transaction_hash
            );
            true
        };

        let updated = self
            .store
            .update(address, IdentityPatch::rename(username, anchored))
            .await
            .map_err(|err| {
                if anchored {
                    // The chain now holds the new name but the record still says
                    // "not anchored"; a retry would call the contract again.
                    tracing::error!(
                        "Username anchored on-chain for {} but store update failed: {}",
                        address,
                        err
                    );
                }
                err
            })?;

        tracing::info!("Username updated for {}: {}", address, updated.username);
        Ok(PlayerDetails::from_record(&updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ContractError;
    use crate::services::test_support::{session_for, FakeGateway, RecordingStore, StoreOp};

    fn coordinator(store: &RecordingStore) -> UsernameUpdateCoordinator {
        UsernameUpdateCoordinator::new(Arc::new(store.clone()), AddressLocks::new())
    }

    #[test]
    fn validate_username_rules() {
        assert!(validate_username("snake_42").is_ok());
        assert!(validate_username(&"a".repeat(50)).is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
        assert!(validate_username("bad name!").is_err());
        assert!(validate_username("émile").is_err());
    }

    #[tokio::test]
    async fn invalid_usernames_touch_no_collaborator() {
        let store = RecordingStore::new();
        let gateway = FakeGateway::new();
        let rename = coordinator(&store);
        let session = session_for("0x1", &gateway);

        for bad in ["", "a".repeat(51).as_str(), "bad name!"] {
            let err = rename.rename(&session, bad).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
        assert!(store.ops().is_empty());
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn first_rename_is_anchored_on_chain() {
        let store = RecordingStore::new();
        store.seed("0x1", false).await;
        let gateway = FakeGateway::new();

        let details = coordinator(&store)
            .rename(&session_for("0x1", &gateway), "snake_king")
            .await
            .unwrap();

        assert_eq!(details.username, "snake_king");
        assert_eq!(gateway.update_calls(), 1);
        assert_eq!(gateway.wait_calls(), 1);
        let record = store.record("0x1").await.unwrap();
        assert!(record.on_chain_confirmed);
        assert_eq!(record.username, "snake_king");
    }

    #[tokio::test]
    async fn later_renames_only_touch_store() {
        let store = RecordingStore::new();
        store.seed("0x1", false).await;
        let gateway = FakeGateway::new();
        let rename = coordinator(&store);
        let session = session_for("0x1", &gateway);

        rename.rename(&session, "first").await.unwrap();
        rename.rename(&session, "second").await.unwrap();
        let details = rename.rename(&session, "third").await.unwrap();

        assert_eq!(details.username, "third");
        assert_eq!(gateway.update_calls(), 1);
    }

    #[tokio::test]
    async fn confirmed_record_skips_contract() {
        let store = RecordingStore::new();
        store.seed("0x1", true).await;
        let gateway = FakeGateway::new();

        coordinator(&store)
            .rename(&session_for("0x1", &gateway), "renamed")
            .await
            .unwrap();
        assert!(gateway.calls().is_empty());
        assert_eq!(store.writes(), vec![StoreOp::Update("0x1".to_string())]);
    }

    #[tokio::test]
    async fn missing_record_is_record_missing() {
        let store = RecordingStore::new();
        let gateway = FakeGateway::new();
        let err = coordinator(&store)
            .rename(&session_for("0x1", &gateway), "snake")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Store(StoreError::RecordMissing(_))));
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn contract_failure_leaves_record_unchanged() {
        let store = RecordingStore::new();
        let seeded = store.seed("0x1", false).await;
        let gateway = FakeGateway::new().failing_confirmation();

        let err = coordinator(&store)
            .rename(&session_for("0x1", &gateway), "snake")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Contract(ContractError::ConfirmationFailed { .. })
        ));
        assert!(store.writes().is_empty());
        assert_eq!(store.record("0x1").await.unwrap(), seeded);
    }

    #[tokio::test]
    async fn missing_hash_aborts_before_store_write() {
        let store = RecordingStore::new();
        store.seed("0x1", false).await;
        let gateway = FakeGateway::new().without_hash();

        let err = coordinator(&store)
            .rename(&session_for("0x1", &gateway), "snake")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Contract(ContractError::MissingTransactionHash)
        ));
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn store_outage_on_read_is_surfaced() {
        let store = RecordingStore::new().failing_reads();
        let gateway = FakeGateway::new();
        let err = coordinator(&store)
            .rename(&session_for("0x1", &gateway), "snake")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Store(StoreError::Connectivity(_))));
    }

    #[tokio::test]
    async fn store_failure_after_anchoring_is_surfaced() {
        let store = RecordingStore::new().failing_updates();
        store.seed("0x1", false).await;
        let gateway = FakeGateway::new();

        let err = coordinator(&store)
            .rename(&session_for("0x1", &gateway), "snake")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Store(StoreError::Connectivity(_))));
        assert_eq!(gateway.update_calls(), 1);
        assert!(!store.record("0x1").await.unwrap().on_chain_confirmed);
    }
}
