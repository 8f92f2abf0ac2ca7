//! Credential store and the encoding of stored credentials

mod store;
mod types;

pub use store::CredentialStore;
pub use types::*;
