//! RSA block encryption with PKCS#1 v1.5 padding
//!
//! One block per message: plaintext is limited to `modulus_bytes - 11`.
//! Padding is randomized, so encrypting the same plaintext twice yields
//! different ciphertexts.

use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};

use super::pem_codec::{KeyMaterial, Private, Public};
use super::SecretBytes;
use crate::error::{CryptoError, LockdownError, Result};

/// Bytes of PKCS#1 v1.5 type 2 padding per block
pub const PKCS1_V15_OVERHEAD: usize = 11;

/// Source of randomness shared by key generation and encryption.
///
/// Constructed once by the caller and handed to [`RsaCipher`] and
/// [`KeyGenerator`](super::KeyGenerator); there is no process-wide provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct CryptoContext {
    rng: OsRng,
}

impl CryptoContext {
    /// Context backed by the operating system CSPRNG
    pub fn new() -> Self {
        Self { rng: OsRng }
    }

    pub(crate) fn rng(&self) -> OsRng {
        self.rng
    }
}

/// Encrypt with a public key, decrypt with the matching private key
#[derive(Debug, Clone, Copy, Default)]
pub struct RsaCipher {
    context: CryptoContext,
}

impl RsaCipher {
    pub fn new(context: CryptoContext) -> Self {
        Self { context }
    }

    /// Largest plaintext a key of `modulus_bytes` can carry in one block
    pub fn max_plaintext_len(modulus_bytes: usize) -> usize {
        modulus_bytes.saturating_sub(PKCS1_V15_OVERHEAD)
    }

    /// Encrypt a single block
    pub fn encrypt(&self, plaintext: &[u8], key: &KeyMaterial<Public>) -> Result<Vec<u8>> {
        let public_key = parse_public(key)?;

        let max = Self::max_plaintext_len(public_key.size());
        if plaintext.len() > max {
            return Err(CryptoError::MessageTooLong {
                len: plaintext.len(),
                max,
            }
            .into());
        }

        let mut rng = self.context.rng();
        public_key
            .encrypt(&mut rng, Pkcs1v15Encrypt, plaintext)
            .map_err(|e| match e {
                rsa::Error::MessageTooLong => CryptoError::MessageTooLong {
                    len: plaintext.len(),
                    max,
                }
                .into(),
                other => LockdownError::malformed(format!("Unusable public key: {}", other)),
            })
    }

    /// Decrypt a single block.
    ///
    /// Every failure after the key parses (bad padding, wrong key, truncated
    /// or oversized ciphertext) is reported as [`CryptoError::InvalidPadding`].
    /// The private-key operation is blinded with the context RNG.
    pub fn decrypt(&self, ciphertext: &[u8], key: &KeyMaterial<Private>) -> Result<SecretBytes> {
        let private_key = parse_private(key)?;

        let mut rng = self.context.rng();
        private_key
            .decrypt_blinded(&mut rng, Pkcs1v15Encrypt, ciphertext)
            .map(SecretBytes::from)
            .map_err(|_| CryptoError::InvalidPadding.into())
    }
}

fn parse_public(key: &KeyMaterial<Public>) -> Result<RsaPublicKey> {
    RsaPublicKey::from_pkcs1_der(key.der())
        .map_err(|e| LockdownError::malformed(format!("Invalid PKCS#1 public key body: {}", e)))
}

fn parse_private(key: &KeyMaterial<Private>) -> Result<RsaPrivateKey> {
    // The pkcs1 error text never includes key bytes
    RsaPrivateKey::from_pkcs1_der(key.der())
        .map_err(|e| LockdownError::malformed(format!("Invalid PKCS#1 private key body: {}", e)))
}
