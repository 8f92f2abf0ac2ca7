//! Cryptographic primitives for the credential store
//!
//! This module provides:
//! - PEM armor for PKCS#1 RSA keys, with the key role in the type
//! - RSA PKCS#1 v1.5 block encryption
//! - RSA key pair generation
//! - Secure memory handling with zeroize

mod key_generator;
pub mod pem_codec;
mod rsa_cipher;
mod secure_memory;

pub use key_generator::{validate_bits, KeyFiles, KeyGenerator, DEFAULT_KEY_BITS, MIN_KEY_BITS};
pub use pem_codec::{KeyKind, KeyMaterial, KeyRole, Private, Public};
pub use rsa_cipher::{CryptoContext, RsaCipher, PKCS1_V15_OVERHEAD};
pub use secure_memory::{SecretBytes, SecretString};
