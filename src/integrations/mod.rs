pub mod local_wallet;
pub mod postgrest;
