//! First-sighting registration of a wallet across the off-chain store and the
//! identity contract.
//!
//! A new wallet gets its record created first, then registered on-chain. If the
//! contract call or its confirmation fails, the record is deleted again so the next
//! connect starts from a clean "new wallet" state:
//!
//! ```text
//! Created -> Registering -> Confirmed
//!                        \-> RegistrationFailed -> Compensated
//!                                               \-> CompensationFailed
//! ```

use serde::Serialize;
use std::sync::Arc;

use crate::{
    error::{AppError, ContractError, Result, StoreError},
    models::{IdentityPatch, IdentityRecord, NewIdentityRecord, PlayerDetails, RegistrationReceipt},
    services::{
        address_lock::AddressLocks,
        contract_gateway::{confirm_submission, ContractGateway},
        identity_store::IdentityStore,
        wallet_session::Session,
    },
    utils::short_address,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityStatus {
    New,
    Existing,
    /// Store unreachable; details were synthesized from the address alone.
    Degraded,
}

#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub status: IdentityStatus,
    pub player: PlayerDetails,
    pub warning: Option<StoreError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SagaState {
    Created,
    Registering,
    Confirmed { tx_hash: String },
    RegistrationFailed,
    Compensated,
    CompensationFailed,
}

impl SagaState {
    pub fn can_advance_to(&self, next: &SagaState) -> bool {
        matches!(
            (self, next),
            (SagaState::Created, SagaState::Registering)
                | (SagaState::Registering, SagaState::Confirmed { .. })
                | (SagaState::Registering, SagaState::RegistrationFailed)
                | (SagaState::RegistrationFailed, SagaState::Compensated)
                | (SagaState::RegistrationFailed, SagaState::CompensationFailed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SagaState::Confirmed { .. } | SagaState::Compensated | SagaState::CompensationFailed
        )
    }
}

/// One registration attempt for a freshly created record.
struct RegistrationSaga<'a> {
    record: &'a IdentityRecord,
    store: &'a dyn IdentityStore,
    state: SagaState,
}

impl<'a> RegistrationSaga<'a> {
    fn start(record: &'a IdentityRecord, store: &'a dyn IdentityStore) -> Self {
        tracing::info!(
            "Registration saga for {}: Created",
            short_address(&record.wallet_address)
        );
        Self {
            record,
            store,
            state: SagaState::Created,
        }
    }

    fn advance(&mut self, next: SagaState) {
        debug_assert!(
            self.state.can_advance_to(&next),
            "invalid saga transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::info!(
            "Registration saga for {}: {:?} -> {:?}",
            short_address(&self.record.wallet_address),
            self.state,
            next
        );
        self.state = next;
    }

    async fn run(
        mut self,
        gateway: &dyn ContractGateway,
    ) -> std::result::Result<RegistrationReceipt, ContractError> {
        self.advance(SagaState::Registering);

        let record = self.record;
        let attempt = async {
            let submission = gateway
                .register(&record.wallet_address, &record.username)
                .await?;
            confirm_submission(gateway, submission).await
        };

        match attempt.await {
            Ok(receipt) => {
                self.advance(SagaState::Confirmed {
                    tx_hash: receipt.transaction_hash.clone(),
                });
                Ok(receipt)
            }
            Err(err) => {
                tracing::error!(
                    "Contract registration failed for {}: {}",
                    self.record.wallet_address,
                    err
                );
                self.advance(SagaState::RegistrationFailed);
                self.compensate().await;
                debug_assert!(self.state.is_terminal());
                Err(err)
            }
        }
    }

    async fn compensate(&mut self) {
        match self.store.delete(&self.record.wallet_address).await {
            Ok(()) => self.advance(SagaState::Compensated),
            Err(delete_err) => {
                tracing::error!(
                    "Failed to delete user {} after registration failure: {}",
                    self.record.wallet_address,
                    delete_err
                );
                self.advance(SagaState::CompensationFailed);
            }
        }
    }
}

/// Decides whether a connected wallet is new or returning and registers new ones.
pub struct IdentitySyncCoordinator {
    store: Arc<dyn IdentityStore>,
    locks: AddressLocks,
}

impl IdentitySyncCoordinator {
    pub fn new(store: Arc<dyn IdentityStore>, locks: AddressLocks) -> Self {
        Self { store, locks }
    }

    pub async fn sync(&self, session: &Session) -> Result<SyncOutcome> {
        let address = session.address();
        let _guard = self.locks.acquire(address).await;

        tracing::info!("Checking/creating user: {}", address);
        let existing = match self.store.get(address).await {
            Ok(existing) => existing,
            Err(err) => return Ok(Self::degraded(address, err)),
        };

        if let Some(record) = existing {
            tracing::info!("Existing user {}, skipping contract registration", address);
            return Ok(Self::existing(&record));
        }

        let record = match self
            .store
            .create(NewIdentityRecord::for_new_wallet(address))
            .await
        {
            Ok(record) => record,
            // Another process created it between our read and write.
            Err(StoreError::Duplicate(_)) => {
                tracing::info!("User {} created concurrently elsewhere", address);
                return Ok(match self.store.get(address).await {
                    Ok(Some(record)) => Self::existing(&record),
                    Ok(None) => {
                        Self::degraded(address, StoreError::RecordMissing(address.to_string()))
                    }
                    Err(err) => Self::degraded(address, err),
                });
            }
            // Nothing was written, so there is nothing to compensate.
            Err(err) => return Ok(Self::degraded(address, err)),
        };

        let receipt = RegistrationSaga::start(&record, self.store.as_ref())
            .run(session.account())
            .await
            .map_err(AppError::Contract)?;

        let record = match self
            .store
            .update(address, IdentityPatch::registration(&receipt.transaction_hash))
            .await
        {
            Ok(updated) => updated,
            Err(err) => {
                tracing::warn!(
                    "Registration {} confirmed but not recorded for {}: {}",
                    receipt.transaction_hash,
                    address,
                    err
                );
                record
            }
        };

        tracing::info!("Connected: {}...", address.chars().take(10).collect::<String>());
        Ok(SyncOutcome {
            status: IdentityStatus::New,
            player: PlayerDetails::from_record(&record),
            warning: None,
        })
    }

    /// The store could not be used; the dashboard still gets details built from the
    /// address alone.
    fn degraded(address: &str, err: StoreError) -> SyncOutcome {
        tracing::warn!("User sync failed for {}, using fallback: {}", address, err);
        SyncOutcome {
            status: IdentityStatus::Degraded,
            player: PlayerDetails::fallback(address),
            warning: Some(err),
        }
    }

    fn existing(record: &IdentityRecord) -> SyncOutcome {
        SyncOutcome {
            status: IdentityStatus::Existing,
            player: PlayerDetails::from_record(record),
            warning: None,
        }
    }
}
