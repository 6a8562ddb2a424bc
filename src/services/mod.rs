pub mod address_lock;
pub mod contract_gateway;
pub mod error_classifier;
pub mod identity_store;
pub mod identity_sync;
pub mod onchain;
pub mod username_update;
pub mod wallet_session;

#[cfg(test)]
pub mod test_support;
