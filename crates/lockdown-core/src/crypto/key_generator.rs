//! RSA key pair generation
//!
//! Both halves are written as PKCS#1 PEM through a temp file in the
//! destination directory followed by a rename, so a reader sees either no
//! file or a complete one.

use std::path::{Path, PathBuf};

use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::RsaPrivateKey;
use tracing::{info, warn};

use super::pem_codec::{self, KeyMaterial, Private, Public};
use super::{CryptoContext, SecretString};
use crate::error::{CryptoError, LockdownError, Result};
use crate::storage::write_atomic;

/// Default modulus size for new key pairs
pub const DEFAULT_KEY_BITS: usize = 2048;

/// Smallest modulus accepted; only meant for legacy stores and tests
pub const MIN_KEY_BITS: usize = 1024;

/// Locations of a generated public/private key pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyFiles {
    public_key_file: PathBuf,
    private_key_file: PathBuf,
}

impl KeyFiles {
    pub fn new(public_key_file: impl Into<PathBuf>, private_key_file: impl Into<PathBuf>) -> Self {
        Self {
            public_key_file: public_key_file.into(),
            private_key_file: private_key_file.into(),
        }
    }

    /// `<dir>/<base_name>` for the private key, `<dir>/<base_name><suffix>` for the public key
    pub fn in_directory(dir: &Path, base_name: &str, public_suffix: &str) -> Self {
        Self::new(
            dir.join(format!("{}{}", base_name, public_suffix)),
            dir.join(base_name),
        )
    }

    /// Path to the public key file, used for encryption
    pub fn public_key_file(&self) -> &Path {
        &self.public_key_file
    }

    /// Path to the private key file, used for decryption
    pub fn private_key_file(&self) -> &Path {
        &self.private_key_file
    }
}

/// Produces fresh RSA key pairs
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    context: CryptoContext,
    bits: usize,
}

impl KeyGenerator {
    pub fn new(context: CryptoContext, bits: usize) -> Self {
        Self { context, bits }
    }

    pub fn bits(&self) -> usize {
        self.bits
    }

    /// Generate a key pair in memory
    pub fn generate_material(&self) -> Result<(KeyMaterial<Public>, KeyMaterial<Private>)> {
        validate_bits(self.bits)?;

        let mut rng = self.context.rng();
        let private_key = RsaPrivateKey::new(&mut rng, self.bits)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        let public_key = private_key.to_public_key();

        let public_der = public_key
            .to_pkcs1_der()
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        let private_der = private_key
            .to_pkcs1_der()
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;

        Ok((
            KeyMaterial::from_der(public_der.as_bytes().to_vec()),
            KeyMaterial::from_der(private_der.as_bytes().to_vec()),
        ))
    }

    /// Generate a key pair and write both halves as PEM files.
    ///
    /// Parent directories must already exist. Existing files at either
    /// destination are replaced.
    pub fn generate(&self, public_destination: &Path, private_destination: &Path) -> Result<KeyFiles> {
        if self.bits < DEFAULT_KEY_BITS {
            warn!(
                "Generating a {}-bit RSA key; {} bits or more is recommended",
                self.bits, DEFAULT_KEY_BITS
            );
        }

        let (public_key, private_key) = self.generate_material()?;

        let private_pem = SecretString::new(pem_codec::encode(&private_key));
        let public_pem = pem_codec::encode(&public_key);

        write_atomic(private_destination, private_pem.expose().as_bytes())?;
        write_atomic(public_destination, public_pem.as_bytes())?;

        info!(
            "Key files generated - public: {:?}, private: {:?}",
            public_destination, private_destination
        );

        Ok(KeyFiles::new(public_destination, private_destination))
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new(CryptoContext::new(), DEFAULT_KEY_BITS)
    }
}

/// Reject moduli the generator will not produce
pub fn validate_bits(bits: usize) -> Result<()> {
    if bits < MIN_KEY_BITS || bits % 8 != 0 {
        return Err(LockdownError::Validation(format!(
            "RSA key size must be a multiple of 8 and at least {} bits (got {})",
            MIN_KEY_BITS, bits
        )));
    }
    Ok(())
}
