use serde::Deserialize;
use std::env;

use crate::constants::{
    DEFAULT_BACKEND_URL, DEFAULT_CHAIN_ID, DEFAULT_CONTRACT_ADDRESS, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_RPC_URL,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Postgres,
    Rest,
    Memory,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Postgres => "postgres",
            StoreKind::Rest => "rest",
            StoreKind::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Identity store
    pub identity_store: StoreKind,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub backend_url: String,
    pub backend_api_key: Option<String>,

    // Blockchain
    pub starknet_rpc_url: String,
    pub starknet_chain_id: String,
    pub contract_address: String,

    // Local signing wallet
    pub wallet_account_address: Option<String>,
    pub wallet_private_key: Option<String>,

    // Transaction confirmation
    pub confirmation_timeout_secs: Option<u64>,
    pub confirmation_poll_interval_ms: u64,

    // CORS
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let database_url = non_empty_var("DATABASE_URL");
        let identity_store = match non_empty_var("IDENTITY_STORE") {
            Some(raw) => parse_store_kind(&raw)?,
            None if database_url.is_some() => StoreKind::Postgres,
            None => StoreKind::Rest,
        };

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            identity_store,
            database_url,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
            backend_url: env::var("BACKEND_URL")
                .unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string()),
            backend_api_key: non_empty_var("BACKEND_API_KEY"),

            starknet_rpc_url: env::var("STARKNET_RPC_URL")
                .unwrap_or_else(|_| DEFAULT_RPC_URL.to_string()),
            starknet_chain_id: env::var("STARKNET_CHAIN_ID")
                .unwrap_or_else(|_| DEFAULT_CHAIN_ID.to_string()),
            contract_address: env::var("CONTRACT_ADDRESS")
                .unwrap_or_else(|_| DEFAULT_CONTRACT_ADDRESS.to_string()),

            wallet_account_address: non_empty_var("WALLET_ACCOUNT_ADDRESS"),
            wallet_private_key: non_empty_var("WALLET_PRIVATE_KEY"),

            confirmation_timeout_secs: match non_empty_var("CONFIRMATION_TIMEOUT_SECS") {
                Some(raw) => Some(raw.parse()?),
                None => None,
            },
            confirmation_poll_interval_ms: env::var("CONFIRMATION_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| DEFAULT_POLL_INTERVAL_MS.to_string())
                .parse()?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default(),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.identity_store == StoreKind::Postgres && self.database_url.is_none() {
            anyhow::bail!("IDENTITY_STORE=postgres requires DATABASE_URL");
        }
        if self.identity_store == StoreKind::Rest && self.backend_url.trim().is_empty() {
            anyhow::bail!("BACKEND_URL is empty");
        }
        if self.starknet_rpc_url.trim().is_empty() {
            anyhow::bail!("STARKNET_RPC_URL is empty");
        }
        if self.contract_address.trim().is_empty() {
            anyhow::bail!("CONTRACT_ADDRESS is empty");
        }
        if self.confirmation_poll_interval_ms == 0 {
            anyhow::bail!("CONFIRMATION_POLL_INTERVAL_MS must be > 0");
        }

        if self.contract_address.starts_with("0x0000") {
            tracing::warn!("Using placeholder identity contract address");
        }
        if self.confirmation_timeout_secs.is_none() {
            tracing::warn!("CONFIRMATION_TIMEOUT_SECS not set; confirmation waits are unbounded");
        }
        if self.identity_store == StoreKind::Memory && !self.is_development() {
            tracing::warn!("In-memory identity store outside development; records are not durable");
        }
        if self.cors_allowed_origins.trim().is_empty() && !self.is_development() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; cross-origin requests are rejected");
        }

        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development" || self.environment == "test"
    }

    pub fn is_testnet(&self) -> bool {
        if self.is_development() {
            return true;
        }
        let chain = self.starknet_chain_id.to_ascii_uppercase();
        chain.contains("SEPOLIA") || chain.contains("GOERLI")
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_store_kind(raw: &str) -> anyhow::Result<StoreKind> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "postgres" | "postgresql" | "database" => Ok(StoreKind::Postgres),
        "rest" | "postgrest" | "backend" => Ok(StoreKind::Rest),
        "memory" | "in-memory" => Ok(StoreKind::Memory),
        other => anyhow::bail!("Unknown IDENTITY_STORE '{}'", other),
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 8080,
        environment: "test".to_string(),
        identity_store: StoreKind::Memory,
        database_url: None,
        database_max_connections: 1,
        backend_url: DEFAULT_BACKEND_URL.to_string(),
        backend_api_key: None,
        starknet_rpc_url: "http://localhost:5050".to_string(),
        starknet_chain_id: "SN_SEPOLIA".to_string(),
        contract_address: DEFAULT_CONTRACT_ADDRESS.to_string(),
        wallet_account_address: None,
        wallet_private_key: None,
        confirmation_timeout_secs: Some(5),
        confirmation_poll_interval_ms: 10,
        cors_allowed_origins: "*".to_string(),
    }
}
