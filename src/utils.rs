// Utility helpers

use crate::constants::{DEFAULT_USERNAME_PREFIX, DEFAULT_USERNAME_SUFFIX_LEN};

/// Deterministic username for a wallet seen for the first time: the prefix plus the
/// eight characters following `0x`.
pub fn default_username(address: &str) -> String {
    let body = address.trim();
    let body = body
        .strip_prefix("0x")
        .or_else(|| body.strip_prefix("0X"))
        .unwrap_or(body);
    let suffix: String = body.chars().take(DEFAULT_USERNAME_SUFFIX_LEN).collect();
    format!("{DEFAULT_USERNAME_PREFIX}{suffix}")
}

/// Key used to serialize work per wallet; addresses differ only by case or padding
/// across wallets and RPC nodes.
pub fn address_key(address: &str) -> String {
    let lowered = address.trim().to_ascii_lowercase();
    match lowered.strip_prefix("0x") {
        Some(digits) => {
            let trimmed = digits.trim_start_matches('0');
            format!("0x{}", if trimmed.is_empty() { "0" } else { trimmed })
        }
        None => lowered,
    }
}

/// `0x12345678...9abcdef0` style shortening for logs.
pub fn short_address(address: &str) -> String {
    if address.len() <= 18 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..10], &address[address.len() - 8..])
}
