use std::sync::Arc;

use crate::{
    config::Config,
    constants::MIN_RPC_SPEC_VERSION,
    error::WalletError,
    services::{
        onchain::{GatewaySettings, StarknetGateway},
        wallet_session::{Session, WalletConnector},
    },
};

/// Server-side wallet: a single-owner account whose key lives in the environment.
///
/// "Connecting" builds the signing account and checks that the node is on the
/// expected chain and speaks a supported RPC version.
#[derive(Clone)]
pub struct LocalWalletConnector {
    settings: GatewaySettings,
    account_address: Option<String>,
    private_key: Option<String>,
}

impl LocalWalletConnector {
    pub fn from_config(config: &Config) -> Self {
        Self {
            settings: GatewaySettings::from_config(config),
            account_address: config.wallet_account_address.clone(),
            private_key: config.wallet_private_key.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.account_address.is_some() && self.private_key.is_some()
    }
}

#[async_trait::async_trait]
impl WalletConnector for LocalWalletConnector {
    async fn connect(&self) -> Result<Session, WalletError> {
        let (Some(address), Some(key)) = (&self.account_address, &self.private_key) else {
            return Err(WalletError::Unavailable(
                "set WALLET_ACCOUNT_ADDRESS and WALLET_PRIVATE_KEY".to_string(),
            ));
        };

        let gateway =
            StarknetGateway::new(&self.settings, address, key).map_err(WalletError::ConnectionFailure)?;

        let (chain_id, spec_version) = gateway
            .node_info()
            .await
            .map_err(|e| WalletError::ConnectionFailure(format!("RPC node unreachable: {}", e)))?;

        if chain_id != gateway.expected_chain_id() {
            return Err(WalletError::ConnectionFailure(format!(
                "node is on chain {:#x}, expected {}",
                chain_id, self.settings.chain_id
            )));
        }
        if !spec_version_supported(&spec_version) {
            return Err(WalletError::VersionMismatch(format!(
                "RPC spec version {} is older than {}.{}",
                spec_version, MIN_RPC_SPEC_VERSION.0, MIN_RPC_SPEC_VERSION.1
            )));
        }

        tracing::info!(
            "Wallet {} connected via {} (RPC spec {})",
            address,
            self.settings.rpc_url,
            spec_version
        );
        Ok(Session::new(address, Arc::new(gateway)))
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        // nothing to release; the account is dropped with the session
        Ok(())
    }
}

fn spec_version_supported(raw: &str) -> bool {
    let mut parts = raw.trim().split('.').map(|p| p.parse::<u64>().ok());
    match (parts.next().flatten(), parts.next().flatten()) {
        (Some(major), Some(minor)) => (major, minor) >= MIN_RPC_SPEC_VERSION,
        _ => false,
    }
}
