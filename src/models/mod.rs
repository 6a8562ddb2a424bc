// src/models/mod.rs
pub mod player;

pub use player::{
    ApiResponse,
    IdentityPatch,
    IdentityRecord,
    NewIdentityRecord,
    PlayerDetails,
    RegistrationReceipt,
    TxSubmission,
};
