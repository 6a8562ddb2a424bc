use crate::{
    error::ContractError,
    models::{RegistrationReceipt, TxSubmission},
};

/// Typed boundary to the identity contract, bound to one signing account.
///
/// Submission and confirmation are separate calls: `register` and `update_username`
/// return as soon as the node accepts the invoke, `wait_for_transaction` suspends until
/// the chain reports the transaction final or rejected.
#[async_trait::async_trait]
pub trait ContractGateway: Send + Sync {
    async fn register(&self, address: &str, username: &str) -> Result<TxSubmission, ContractError>;

    async fn update_username(&self, username: &str) -> Result<TxSubmission, ContractError>;

    async fn wait_for_transaction(&self, tx_hash: &str)
        -> Result<RegistrationReceipt, ContractError>;
}

/// Require a transaction hash from `submission` and wait for it to reach finality.
pub async fn confirm_submission(
    gateway: &dyn ContractGateway,
    submission: TxSubmission,
) -> Result<RegistrationReceipt, ContractError> {
    let tx_hash = submission
        .hash()
        .ok_or(ContractError::MissingTransactionHash)?
        .to_string();

    tracing::debug!("Waiting for transaction {}", tx_hash);
    let receipt = gateway.wait_for_transaction(&tx_hash).await?;
    if !receipt.confirmed {
        return Err(ContractError::ConfirmationFailed {
            tx_hash,
            reason: "transaction was not accepted".to_string(),
        });
    }

    tracing::info!("Transaction {} confirmed", receipt.transaction_hash);
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::FakeGateway;

    #[tokio::test]
    async fn missing_hash_fails_without_waiting() {
        let gateway = FakeGateway::new();
        let err = confirm_submission(&gateway, TxSubmission { transaction_hash: None })
            .await
            .unwrap_err();
        assert_eq!(err, ContractError::MissingTransactionHash);
        assert_eq!(gateway.wait_calls(), 0);
    }

    #[tokio::test]
    async fn unconfirmed_receipt_is_a_confirmation_failure() {
        let gateway = FakeGateway::new().with_unconfirmed_receipts();
        let err = confirm_submission(&gateway, TxSubmission::accepted("0xabc"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::ConfirmationFailed { .. }));
    }

    #[tokio::test]
    async fn confirmed_receipt_is_returned() {
        let gateway = FakeGateway::new();
        let receipt = confirm_submission(&gateway, TxSubmission::accepted("0xabc"))
            .await
            .unwrap();
        assert_eq!(receipt.transaction_hash, "0xabc");
        assert!(receipt.confirmed);
        assert_eq!(gateway.wait_calls(), 1);
    }
}
