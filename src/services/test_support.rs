//! Recording fakes for the coordinator collaborators.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use crate::{
    error::{ContractError, StoreError, WalletError},
    models::{IdentityPatch, IdentityRecord, NewIdentityRecord, RegistrationReceipt, TxSubmission},
    services::{
        contract_gateway::ContractGateway,
        identity_store::{IdentityStore, MemoryIdentityStore},
        wallet_session::{Session, WalletConnector},
    },
};

// ==================== GATEWAY ====================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Register { address: String, username: String },
    UpdateUsername { username: String },
    Wait { tx_hash: String },
}

#[derive(Default)]
struct GatewayState {
    calls: Mutex<Vec<GatewayCall>>,
    submitted: AtomicUsize,
    omit_hash: AtomicBool,
    reject_submission: AtomicBool,
    fail_confirmation: AtomicBool,
    unconfirmed: AtomicBool,
    confirm_gate: Mutex<Option<Arc<Notify>>>,
}

#[derive(Clone, Default)]
pub struct FakeGateway {
    state: Arc<GatewayState>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_hash(self) -> Self {
        self.state.omit_hash.store(true, Ordering::SeqCst);
        self
    }

    pub fn rejecting_submissions(self) -> Self {
        self.state.reject_submission.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_confirmation(self) -> Self {
        self.state.fail_confirmation.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_unconfirmed_receipts(self) -> Self {
        self.state.unconfirmed.store(true, Ordering::SeqCst);
        self
    }

    /// Confirmation waits block until the returned handle is notified.
    pub fn gated(self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        *self.state.confirm_gate.lock().unwrap() = Some(gate.clone());
        (self, gate)
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn register_calls(&self) -> usize {
        self.count(|call| matches!(call, GatewayCall::Register { .. }))
    }

    pub fn update_calls(&self) -> usize {
        self.count(|call| matches!(call, GatewayCall::UpdateUsername { .. }))
    }

    pub fn wait_calls(&self) -> usize {
        self.count(|call| matches!(call, GatewayCall::Wait { .. }))
    }

    fn count(&self, pred: impl Fn(&GatewayCall) -> bool) -> usize {
        self.state.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: GatewayCall) {
        self.state.calls.lock().unwrap().push(call);
    }

    fn submit(&self) -> Result<TxSubmission, ContractError> {
        if self.state.reject_submission.load(Ordering::SeqCst) {
            return Err(ContractError::SubmissionRejected("execution failed".into()));
        }
        if self.state.omit_hash.load(Ordering::SeqCst) {
            return Ok(TxSubmission {
                transaction_hash: None,
            });
        }
        let n = self.state.submitted.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TxSubmission::accepted(format!("tx{n}")))
    }
}

#[async_trait::async_trait]
impl ContractGateway for FakeGateway {
    async fn register(&self, address: &str, username: &str) -> Result<TxSubmission, ContractError> {
        self.record(GatewayCall::Register {
            address: address.to_string(),
            username: username.to_string(),
        });
        self.submit()
    }

    async fn update_username(&self, username: &str) -> Result<TxSubmission, ContractError> {
        self.record(GatewayCall::UpdateUsername {
            username: username.to_string(),
        });
        self.submit()
    }

    async fn wait_for_transaction(
        &self,
        tx_hash: &str,
    ) -> Result<RegistrationReceipt, ContractError> {
        self.record(GatewayCall::Wait {
            tx_hash: tx_hash.to_string(),
        });

        let gate = self.state.confirm_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.state.fail_confirmation.load(Ordering::SeqCst) {
            return Err(ContractError::ConfirmationFailed {
                tx_hash: tx_hash.to_string(),
                reason: "reverted".to_string(),
            });
        }
        Ok(RegistrationReceipt {
            transaction_hash: tx_hash.to_string(),
            confirmed: !self.state.unconfirmed.load(Ordering::SeqCst),
            block_number: Some(1),
        })
    }
}

// ==================== STORE ====================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Get(String),
    Create(String),
    Update(String),
    Delete(String),
}

#[derive(Default)]
struct StoreFaults {
    fail_reads: AtomicBool,
    fail_creates: AtomicBool,
    fail_updates: AtomicBool,
    fail_deletes: AtomicBool,
    slow_creates: AtomicBool,
}

/// Memory store that logs every call and can be told to fail.
#[derive(Clone, Default)]
pub struct RecordingStore {
    inner: MemoryIdentityStore,
    ops: Arc<Mutex<Vec<StoreOp>>>,
    faults: Arc<StoreFaults>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_reads(self) -> Self {
        self.faults.fail_reads.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_creates(self) -> Self {
        self.faults.fail_creates.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_updates(self) -> Self {
        self.faults.fail_updates.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_deletes(self) -> Self {
        self.faults.fail_deletes.store(true, Ordering::SeqCst);
        self
    }

    pub fn slow_creates(self) -> Self {
        self.faults.slow_creates.store(true, Ordering::SeqCst);
        self
    }

    pub fn ops(&self) -> Vec<StoreOp> {
        self.ops.lock().unwrap().clone()
    }

    /// Log without reads, for asserting on mutations only.
    pub fn writes(&self) -> Vec<StoreOp> {
        self.ops()
            .into_iter()
            .filter(|op| !matches!(op, StoreOp::Get(_)))
            .collect()
    }

    pub async fn seed(&self, address: &str, confirmed: bool) -> IdentityRecord {
        let record = self
            .inner
            .create(NewIdentityRecord::for_new_wallet(address))
            .await
            .unwrap();
        if confirmed {
            return self
                .inner
                .update(address, IdentityPatch::rename(&record.username, true))
                .await
                .unwrap();
        }
        record
    }

    pub async fn record(&self, address: &str) -> Option<IdentityRecord> {
        self.inner.get(address).await.unwrap()
    }

    fn log(&self, op: StoreOp) {
        self.ops.lock().unwrap().push(op);
    }

    fn outage(flag: &AtomicBool) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Connectivity("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl IdentityStore for RecordingStore {
    async fn get(&self, address: &str) -> Result<Option<IdentityRecord>, StoreError> {
        self.log(StoreOp::Get(address.to_string()));
        Self::outage(&self.faults.fail_reads)?;
        self.inner.get(address).await
    }

    async fn create(&self, record: NewIdentityRecord) -> Result<IdentityRecord, StoreError> {
        self.log(StoreOp::Create(record.wallet_address.clone()));
        Self::outage(&self.faults.fail_creates)?;
        if self.faults.slow_creates.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.inner.create(record).await
    }

    async fn update(
        &self,
        address: &str,
        patch: IdentityPatch,
    ) -> Result<IdentityRecord, StoreError> {
        self.log(StoreOp::Update(address.to_string()));
        Self::outage(&self.faults.fail_updates)?;
        self.inner.update(address, patch).await
    }

    async fn delete(&self, address: &str) -> Result<(), StoreError> {
        self.log(StoreOp::Delete(address.to_string()));
        Self::outage(&self.faults.fail_deletes)?;
        self.inner.delete(address).await
    }

    fn kind(&self) -> &'static str {
        "recording"
    }
}

// ==================== CONNECTOR ====================

#[derive(Default)]
struct ConnectorState {
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    connect_error: Mutex<Option<WalletError>>,
    disconnect_error: Mutex<Option<WalletError>>,
    connect_gate: Mutex<Option<Arc<Notify>>>,
}

#[derive(Clone)]
pub struct FakeConnector {
    address: String,
    gateway: FakeGateway,
    state: Arc<ConnectorState>,
}

impl FakeConnector {
    pub fn new(address: &str, gateway: FakeGateway) -> Self {
        Self {
            address: address.to_string(),
            gateway,
            state: Arc::default(),
        }
    }

    pub fn failing_with(self, err: WalletError) -> Self {
        *self.state.connect_error.lock().unwrap() = Some(err);
        self
    }

    pub fn failing_disconnect(self, err: WalletError) -> Self {
        *self.state.disconnect_error.lock().unwrap() = Some(err);
        self
    }

    /// Connect blocks until the returned handle is notified, like a pending popup.
    pub fn gated(self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        *self.state.connect_gate.lock().unwrap() = Some(gate.clone());
        (self, gate)
    }

    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.state.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl WalletConnector for FakeConnector {
    async fn connect(&self) -> Result<Session, WalletError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        let gate = self.state.connect_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(err) = self.state.connect_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(Session::new(&self.address, Arc::new(self.gateway.clone())))
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        self.state.disconnects.fetch_add(1, Ordering::SeqCst);
        match self.state.disconnect_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub fn session_for(address: &str, gateway: &FakeGateway) -> Session {
    Session::new(address, Arc::new(gateway.clone()))
}
