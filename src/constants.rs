/// Application constants

// Defaults for externally supplied endpoints
pub const DEFAULT_CONTRACT_ADDRESS: &str =
    "0x3060854ecff13fd7f72caf971475823ff457fed1de616e70cd5342ffa345d88";
pub const DEFAULT_RPC_URL: &str = "https://free-rpc.nethermind.io/sepolia-juno";
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_CHAIN_ID: &str = "SN_SEPOLIA";

// Identity contract entry points
pub const ENTRY_PLAYER_REGISTERS: &str = "player_registers";
pub const ENTRY_PLAYER_UPDATE_USERNAME: &str = "player_update_username";

// Usernames
pub const USERNAME_MAX_LEN: usize = 50;
pub const DEFAULT_USERNAME_PREFIX: &str = "player_";
pub const DEFAULT_USERNAME_SUFFIX_LEN: usize = 8;

// Cairo ByteArray packs 31 bytes per full word
pub const BYTES31_LEN: usize = 31;

// Transaction confirmation polling
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

// Identity table (relational store and PostgREST resource)
pub const USERS_TABLE: &str = "users";

// API version
pub const API_VERSION: &str = "v1";

// Oldest JSON-RPC spec version (major, minor) the wallet connector accepts
pub const MIN_RPC_SPEC_VERSION: (u64, u64) = (0, 8);
