use std::time::Duration;

use starknet_accounts::{Account, ExecutionEncoding, SingleOwnerAccount};
use starknet_core::types::{
    BlockId, BlockTag, Call, ExecutionResult, Felt, StarknetError, TransactionFinalityStatus,
};
use starknet_core::utils::get_selector_from_name;
use starknet_providers::jsonrpc::{HttpTransport, JsonRpcClient};
use starknet_providers::{Provider, ProviderError};
use starknet_signers::{LocalWallet, SigningKey};
use url::Url;

use crate::{
    config::Config,
    constants::{BYTES31_LEN, ENTRY_PLAYER_REGISTERS, ENTRY_PLAYER_UPDATE_USERNAME},
    error::ContractError,
    models::{RegistrationReceipt, TxSubmission},
    services::contract_gateway::ContractGateway,
};

/// Everything needed to bind a gateway to one signing account.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub rpc_url: String,
    pub chain_id: String,
    pub contract_address: String,
    pub poll_interval: Duration,
    pub confirmation_timeout: Option<Duration>,
}

impl GatewaySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            rpc_url: config.starknet_rpc_url.clone(),
            chain_id: config.starknet_chain_id.clone(),
            contract_address: config.contract_address.clone(),
            poll_interval: Duration::from_millis(config.confirmation_poll_interval_ms),
            confirmation_timeout: config.confirmation_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Identity contract client signing with a single-owner account.
pub struct StarknetGateway {
    account: SingleOwnerAccount<JsonRpcClient<HttpTransport>, LocalWallet>,
    provider: JsonRpcClient<HttpTransport>,
    contract: Felt,
    chain_id: Felt,
    poll_interval: Duration,
    confirmation_timeout: Option<Duration>,
}

impl StarknetGateway {
    pub fn new(
        settings: &GatewaySettings,
        account_address: &str,
        private_key: &str,
    ) -> Result<Self, String> {
        let rpc_url =
            Url::parse(&settings.rpc_url).map_err(|e| format!("Invalid RPC URL: {}", e))?;

        let signer = LocalWallet::from_signing_key(SigningKey::from_secret_scalar(parse_felt(
            private_key,
        )?));
        let chain_id = parse_chain_id(&settings.chain_id)?;
        let mut account = SingleOwnerAccount::new(
            JsonRpcClient::new(HttpTransport::new(rpc_url.clone())),
            signer,
            parse_felt(account_address)?,
            chain_id,
            ExecutionEncoding::New,
        );
        // Some public RPC providers don't support "pre_confirmed" yet.
        account.set_block_id(BlockId::Tag(BlockTag::Latest));

        Ok(Self {
            account,
            provider: JsonRpcClient::new(HttpTransport::new(rpc_url)),
            contract: parse_felt(&settings.contract_address)?,
            chain_id,
            poll_interval: settings.poll_interval,
            confirmation_timeout: settings.confirmation_timeout,
        })
    }

    pub fn expected_chain_id(&self) -> Felt {
        self.chain_id
    }

    /// Chain id and JSON-RPC spec version reported by the node.
    pub async fn node_info(&self) -> Result<(Felt, String), ProviderError> {
        let chain_id = self.provider.chain_id().await?;
        let spec_version = self.provider.spec_version().await?;
        Ok((chain_id, spec_version))
    }

    async fn invoke(&self, entry_point: &str, calldata: Vec<Felt>) -> Result<TxSubmission, ContractError> {
        let selector = get_selector_from_name(entry_point)
            .map_err(|e| ContractError::SubmissionRejected(format!("Selector error: {}", e)))?;
        let call = Call {
            to: self.contract,
            selector,
            calldata,
        };

        let result = self
            .account
            .execute_v3(vec![call])
            .send()
            .await
            .map_err(|e| ContractError::SubmissionRejected(e.to_string()))?;

        if result.transaction_hash == Felt::ZERO {
            return Ok(TxSubmission {
                transaction_hash: None,
            });
        }
        Ok(TxSubmission::accepted(format!("{:#x}", result.transaction_hash)))
    }

    async fn poll_receipt(&self, tx_hash: &str, hash: Felt) -> Result<RegistrationReceipt, ContractError> {
        loop {
            match self.provider.get_transaction_receipt(&hash).await {
                Ok(receipt) => {
                    if let ExecutionResult::Reverted { reason } = receipt.receipt.execution_result() {
                        return Err(ContractError::ConfirmationFailed {
                            tx_hash: tx_hash.to_string(),
                            reason: format!("reverted: {}", reason),
                        });
                    }
                    if !matches!(
                        receipt.receipt.finality_status(),
                        TransactionFinalityStatus::PreConfirmed
                    ) {
                        return Ok(RegistrationReceipt {
                            transaction_hash: tx_hash.to_string(),
                            confirmed: true,
                            block_number: Some(receipt.block.block_number()),
                        });
                    }
                    tracing::debug!("Transaction {} still pre-confirmed", tx_hash);
                }
                Err(ProviderError::StarknetError(StarknetError::TransactionHashNotFound)) => {
                    tracing::debug!("Transaction {} not yet known to the node", tx_hash);
                }
                Err(err) => {
                    tracing::warn!("Receipt lookup for {} failed: {}", tx_hash, err);
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait::async_trait]
impl ContractGateway for StarknetGateway {
    async fn register(&self, address: &str, username: &str) -> Result<TxSubmission, ContractError> {
        let player = parse_felt(address).map_err(ContractError::SubmissionRejected)?;
        let mut calldata = vec![player];
        calldata.extend(encode_byte_array(username));
        self.invoke(ENTRY_PLAYER_REGISTERS, calldata).await
    }

    async fn update_username(&self, username: &str) -> Result<TxSubmission, ContractError> {
        self.invoke(ENTRY_PLAYER_UPDATE_USERNAME, encode_byte_array(username))
            .await
    }

    async fn wait_for_transaction(
        &self,
        tx_hash: &str,
    ) -> Result<RegistrationReceipt, ContractError> {
        let hash = parse_felt(tx_hash).map_err(|reason| ContractError::ConfirmationFailed {
            tx_hash: tx_hash.to_string(),
            reason,
        })?;

        match self.confirmation_timeout {
            Some(limit) => tokio::time::timeout(limit, self.poll_receipt(tx_hash, hash))
                .await
                .map_err(|_| ContractError::ConfirmationFailed {
                    tx_hash: tx_hash.to_string(),
                    reason: format!("not confirmed within {}s", limit.as_secs()),
                })?,
            None => self.poll_receipt(tx_hash, hash).await,
        }
    }
}

/// Cairo `ByteArray` calldata: full 31-byte words, then the pending word and its length.
pub fn encode_byte_array(value: &str) -> Vec<Felt> {
    let bytes = value.as_bytes();
    let full_words = bytes.len() / BYTES31_LEN;
    let (full, pending) = bytes.split_at(full_words * BYTES31_LEN);

    let mut out = Vec::with_capacity(full_words + 3);
    out.push(Felt::from(full_words as u64));
    out.extend(full.chunks(BYTES31_LEN).map(Felt::from_bytes_be_slice));
    out.push(Felt::from_bytes_be_slice(pending));
    out.push(Felt::from(pending.len() as u64));
    out
}

pub fn parse_chain_id(chain_id: &str) -> Result<Felt, String> {
    if chain_id.starts_with("0x") {
        return parse_felt(chain_id);
    }
    let hex = hex::encode(chain_id.as_bytes());
    parse_felt(&format!("0x{hex}"))
}

pub fn parse_felt(value: &str) -> Result<Felt, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("Empty field element".to_string());
    }
    if trimmed.starts_with("0x") {
        return Felt::from_hex(trimmed).map_err(|e| format!("Invalid felt hex: {}", e));
    }
    Felt::from_dec_str(trimmed).map_err(|e| format!("Invalid felt dec: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_felt_accepts_hex_and_decimal() {
        assert_eq!(parse_felt("0x10").unwrap(), Felt::from(16_u64));
        assert_eq!(parse_felt("16").unwrap(), Felt::from(16_u64));
        assert!(parse_felt("  ").is_err());
        assert!(parse_felt("0xzz").is_err());
    }

    #[test]
    fn parse_chain_id_encodes_short_string() {
        // "SN_SEPOLIA" as a Cairo short string
        assert_eq!(
            parse_chain_id("SN_SEPOLIA").unwrap(),
            Felt::from_hex("0x534e5f5345504f4c4941").unwrap()
        );
    }

    #[test]
    fn encode_byte_array_short_value() {
        let encoded = encode_byte_array("abc");
        assert_eq!(encoded.len(), 3);
        assert_eq!(encoded[0], Felt::ZERO);
        assert_eq!(encoded[1], Felt::from(0x616263_u64));
        assert_eq!(encoded[2], Felt::from(3_u64));
    }

    #[test]
    fn encode_byte_array_splits_full_words() {
        let value = "a".repeat(40);
        let encoded = encode_byte_array(&value);
        assert_eq!(encoded[0], Felt::from(1_u64));
        assert_eq!(encoded[1], Felt::from_bytes_be_slice(&[b'a'; 31]));
        assert_eq!(encoded[2], Felt::from_bytes_be_slice(&[b'a'; 9]));
        assert_eq!(encoded[3], Felt::from(9_u64));
    }

    #[test]
    fn encode_byte_array_empty_value() {
        assert_eq!(
            encode_byte_array(""),
            vec![Felt::ZERO, Felt::ZERO, Felt::ZERO]
        );
    }

    #[test]
    fn gateway_rejects_invalid_private_key() {
        let settings = GatewaySettings::from_config(&crate::config::test_config());
        assert!(StarknetGateway::new(&settings, "0x123", "not-a-key").is_err());
    }
}
