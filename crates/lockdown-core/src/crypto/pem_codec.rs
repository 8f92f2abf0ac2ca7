//! PEM armor for PKCS#1 RSA keys
//!
//! A key's role is carried in its type: `KeyMaterial<Public>` can only come
//! from a `RSA PUBLIC KEY` block and `KeyMaterial<Private>` only from a
//! `RSA PRIVATE KEY` block, so the cipher can demand the right half at
//! compile time.
//!
//! Only buffers owned here are zeroed. The `pem` crate's internal scratch
//! copies (including the base64 text of a private key) are freed unzeroed.

use std::marker::PhantomData;
use std::path::Path;

use pem::{EncodeConfig, LineEnding, Pem};
use zeroize::Zeroize;

use super::SecretBytes;
use crate::error::{FormatError, Result};

/// The closed set of key roles, with their PEM header tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    PublicKey,
    PrivateKey,
}

impl KeyKind {
    /// Header/footer tag for this role
    pub fn pem_tag(self) -> &'static str {
        match self {
            KeyKind::PublicKey => "RSA PUBLIC KEY",
            KeyKind::PrivateKey => "RSA PRIVATE KEY",
        }
    }
}

impl std::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.pem_tag())
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Public {}
    impl Sealed for super::Private {}
}

/// Type-level key role. Sealed: only `Public` and `Private` exist.
pub trait KeyRole: sealed::Sealed {
    const KIND: KeyKind;
}

/// Marker for the encrypting half
#[derive(Debug, Clone, Copy)]
pub struct Public;

/// Marker for the decrypting half
#[derive(Debug, Clone, Copy)]
pub struct Private;

impl KeyRole for Public {
    const KIND: KeyKind = KeyKind::PublicKey;
}

impl KeyRole for Private {
    const KIND: KeyKind = KeyKind::PrivateKey;
}

/// Raw PKCS#1 DER bytes of one key half. Zeroed when dropped.
pub struct KeyMaterial<R: KeyRole> {
    der: SecretBytes,
    role: PhantomData<R>,
}

impl<R: KeyRole> KeyMaterial<R> {
    /// Wrap DER bytes already known to belong to role `R`
    pub fn from_der(der: Vec<u8>) -> Self {
        Self {
            der: SecretBytes::new(der),
            role: PhantomData,
        }
    }

    pub fn kind(&self) -> KeyKind {
        R::KIND
    }

    pub fn der(&self) -> &[u8] {
        self.der.expose()
    }

    /// Read and decode a PEM key file
    pub fn read_pem_file(path: &Path) -> Result<Self> {
        let mut contents = std::fs::read(path)?;
        let decoded = decode::<R>(&contents);
        contents.zeroize();
        Ok(decoded?)
    }
}

impl<R: KeyRole> std::fmt::Debug for KeyMaterial<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("kind", &R::KIND)
            .field("der", &self.der)
            .finish()
    }
}

/// Parse one PEM block whose tag must match role `R`
///
/// The returned DER is zeroed on drop; the intermediate base64 buffers inside
/// `pem::parse` are not.
pub fn decode<R: KeyRole>(input: &[u8]) -> std::result::Result<KeyMaterial<R>, FormatError> {
    let block = pem::parse(input).map_err(|e| {
        FormatError::Malformed(format!(
            "Invalid key provided - only PEM (PKCS1 format) is supported ({})",
            e
        ))
    })?;

    let expected = R::KIND.pem_tag();
    if block.tag() != expected {
        return Err(FormatError::WrongType {
            expected: expected.to_string(),
            found: block.tag().to_string(),
        });
    }

    Ok(KeyMaterial::from_der(block.into_contents()))
}

/// Wrap a key's DER body in PEM framing (LF line endings, 64 column body).
///
/// The returned armor is plain `String`; callers own zeroing it. Buffers
/// allocated inside `pem::encode_config` are not zeroed.
pub fn encode<R: KeyRole>(key: &KeyMaterial<R>) -> String {
    let block = Pem::new(R::KIND.pem_tag(), key.der().to_vec());
    let armored = pem::encode_config(&block, EncodeConfig::new().set_line_ending(LineEnding::LF));

    // Pem keeps its own copy of the body
    block.into_contents().zeroize();

    armored
}
