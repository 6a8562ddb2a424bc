//! The connected wallet for this process and its connect/disconnect transitions.
//!
//! `Disconnected -> Connecting -> Connected -> Disconnected`. Calling `connect` while
//! connected disconnects instead. A sync or rename still in flight when the session
//! changes runs to completion; its result is discarded rather than cached, and the
//! store keeps whatever the last finished step wrote.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{
    error::{AppError, Result, WalletError},
    models::PlayerDetails,
    services::{
        contract_gateway::ContractGateway,
        identity_sync::{IdentitySyncCoordinator, SyncOutcome},
        username_update::UsernameUpdateCoordinator,
    },
};

/// An authenticated wallet: its address plus the contract gateway bound to its
/// signing account and chain provider.
#[derive(Clone)]
pub struct Session {
    address: String,
    account: Arc<dyn ContractGateway>,
}

impl Session {
    pub fn new(address: &str, account: Arc<dyn ContractGateway>) -> Self {
        Self {
            address: address.to_string(),
            account,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn account(&self) -> &dyn ContractGateway {
        self.account.as_ref()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Wallet extension boundary.
#[async_trait::async_trait]
pub trait WalletConnector: Send + Sync {
    async fn connect(&self) -> std::result::Result<Session, WalletError>;

    async fn disconnect(&self) -> std::result::Result<(), WalletError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug)]
pub enum ConnectOutcome {
    /// Connected; carries the identity sync triggered by this connect.
    Connected {
        address: String,
        sync: Result<SyncOutcome>,
    },
    /// Already connected, so the call toggled the session off.
    Disconnected,
    /// A disconnect happened while this connect was still running.
    Superseded,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub state: ConnectionState,
    pub address: Option<String>,
    pub player: Option<PlayerDetails>,
}

#[derive(Default)]
enum Phase {
    #[default]
    Disconnected,
    Connecting,
    Connected(Session),
}

#[derive(Default)]
struct Inner {
    phase: Phase,
    // bumped on every connect and disconnect; stale results compare against it
    generation: u64,
    player: Option<PlayerDetails>,
}

pub struct WalletSession {
    connector: Arc<dyn WalletConnector>,
    sync: Arc<IdentitySyncCoordinator>,
    renamer: Arc<UsernameUpdateCoordinator>,
    inner: Mutex<Inner>,
}

impl WalletSession {
    pub fn new(
        connector: Arc<dyn WalletConnector>,
        sync: Arc<IdentitySyncCoordinator>,
        renamer: Arc<UsernameUpdateCoordinator>,
    ) -> Self {
        Self {
            connector,
            sync,
            renamer,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Runs on its own task so a dropped caller cannot cut a registration saga short.
    pub async fn connect(self: &Arc<Self>) -> Result<ConnectOutcome> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run_connect().await })
            .await
            .map_err(|err| AppError::Internal(format!("wallet connect task failed: {}", err)))?
    }

    async fn run_connect(&self) -> Result<ConnectOutcome> {
        let generation = {
            let mut inner = self.inner.lock().await;
            if matches!(inner.phase, Phase::Connecting) {
                return Err(WalletError::ConnectInProgress.into());
            }
            if matches!(inner.phase, Phase::Connected(_)) {
                None
            } else {
                inner.phase = Phase::Connecting;
                inner.generation += 1;
                Some(inner.generation)
            }
        };
        let Some(generation) = generation else {
            self.disconnect().await?;
            return Ok(ConnectOutcome::Disconnected);
        };

        tracing::info!("Connecting to wallet...");
        let session = match self.connector.connect().await {
            Ok(session) => session,
            Err(err) => {
                let mut inner = self.inner.lock().await;
                if inner.generation == generation {
                    inner.phase = Phase::Disconnected;
                    inner.player = None;
                }
                tracing::error!("Connection error: {}", err);
                return Err(err.into());
            }
        };

        {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                drop(inner);
                tracing::info!("Wallet {} connected after disconnect; releasing", session.address());
                if let Err(err) = self.connector.disconnect().await {
                    tracing::warn!("Disconnect error: {}", err);
                }
                return Ok(ConnectOutcome::Superseded);
            }
            inner.phase = Phase::Connected(session.clone());
        }

        let sync = self.sync.sync(&session).await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            tracing::info!(
                "Discarding identity sync for {}: session changed while it ran",
                session.address()
            );
            return Ok(ConnectOutcome::Superseded);
        }
        inner.player = sync.as_ref().ok().map(|outcome| outcome.player.clone());

        Ok(ConnectOutcome::Connected {
            address: session.address().to_string(),
            sync,
        })
    }

    /// Clears the session even when the connector fails to disconnect.
    pub async fn disconnect(&self) -> Result<()> {
        let previous = {
            let mut inner = self.inner.lock().await;
            inner.generation += 1;
            inner.player = None;
            std::mem::take(&mut inner.phase)
        };

        match previous {
            Phase::Connected(session) => {
                self.connector.disconnect().await.map_err(|err| {
                    tracing::error!("Disconnect error: {}", err);
                    AppError::Wallet(WalletError::DisconnectFailure(err.to_string()))
                })?;
                tracing::info!("Wallet {} disconnected", session.address());
                Ok(())
            }
            Phase::Connecting => {
                tracing::info!("Pending wallet connection abandoned");
                Ok(())
            }
            Phase::Disconnected => Ok(()),
        }
    }

    /// Detached like `connect`, so an on-chain rename is always followed by its store write.
    pub async fn rename(self: &Arc<Self>, new_username: &str) -> Result<PlayerDetails> {
        let this = Arc::clone(self);
        let new_username = new_username.to_string();
        tokio::spawn(async move { this.run_rename(&new_username).await })
            .await
            .map_err(|err| AppError::Internal(format!("username update task failed: {}", err)))?
    }

    async fn run_rename(&self, new_username: &str) -> Result<PlayerDetails> {
        let (session, generation) = {
            let inner = self.inner.lock().await;
            match &inner.phase {
                Phase::Connected(session) => (session.clone(), inner.generation),
                _ => return Err(AppError::NotConnected),
            }
        };

        let details = self.renamer.rename(&session, new_username).await?;

        let mut inner = self.inner.lock().await;
        if inner.generation == generation {
            inner.player = Some(details.clone());
        } else {
            tracing::info!(
                "Rename for {} finished after the session changed; not caching",
                session.address()
            );
        }
        Ok(details)
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock().await;
        let (state, address) = match &inner.phase {
            Phase::Disconnected => (ConnectionState::Disconnected, None),
            Phase::Connecting => (ConnectionState::Connecting, None),
            Phase::Connected(session) => (
                ConnectionState::Connected,
                Some(session.address().to_string()),
            ),
        };
        SessionSnapshot {
            state,
            address,
            player: inner.player.clone(),
        }
    }
}
