//! # lockdown-core
//!
//! Core functionality for Lockdown including:
//! - RSA key pair generation with PKCS#1 PEM key files
//! - RSA PKCS#1 v1.5 encryption of username/password pairs
//! - A flat, lookup-keyed credential store file with atomic rewrites
//! - Zeroize-on-drop handling of decrypted credentials

pub mod credential;
pub mod crypto;
pub mod error;
pub mod settings;
pub mod storage;

pub use credential::{CredentialRecord, CredentialStore};
pub use crypto::{
    CryptoContext, KeyFiles, KeyGenerator, KeyKind, KeyMaterial, RsaCipher, SecretString,
    DEFAULT_KEY_BITS,
};
pub use error::{CryptoError, FormatError, LockdownError, Result};
pub use settings::{Settings, SettingsManager};
