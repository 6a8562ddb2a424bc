pub mod health;
pub mod profile;
pub mod wallet;

use std::sync::Arc;

use crate::config::Config;
use crate::services::wallet_session::WalletSession;

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<WalletSession>,
    pub config: Config,
    pub store_kind: &'static str,
}
