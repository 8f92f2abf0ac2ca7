//! Credential type definitions

use base64::{engine::general_purpose::STANDARD, Engine};
use zeroize::Zeroizing;

use crate::crypto::{SecretBytes, SecretString};
use crate::error::FormatError;

/// Separator between the two base64 fields of the credential plaintext
const FIELD_SEPARATOR: u8 = b':';

/// One stored entry: a plain-text lookup key and the RSA ciphertext of its credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    lookup_key: String,
    ciphertext: Vec<u8>,
}

impl CredentialRecord {
    pub fn new(lookup_key: impl Into<String>, ciphertext: Vec<u8>) -> Self {
        Self {
            lookup_key: lookup_key.into(),
            ciphertext,
        }
    }

    /// Rebuild a record from its stored (base64) value
    pub fn from_stored_value(lookup_key: impl Into<String>, value: &str) -> Result<Self, FormatError> {
        let lookup_key = lookup_key.into();
        let ciphertext = STANDARD.decode(value.trim()).map_err(|_| {
            FormatError::Malformed(format!(
                "Stored credentials for lookup key {} are not valid base64",
                lookup_key
            ))
        })?;

        Ok(Self { lookup_key, ciphertext })
    }

    pub fn lookup_key(&self) -> &str {
        &self.lookup_key
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Base64 form written to the record file
    pub fn stored_value(&self) -> String {
        STANDARD.encode(&self.ciphertext)
    }
}

/// Build `base64(username) ":" base64(password)`.
///
/// Each field is armored separately so a colon or newline in either one
/// cannot shift the split point.
pub fn encode_plaintext(username: &str, password: &SecretString) -> SecretBytes {
    let encoded_username = Zeroizing::new(STANDARD.encode(username.as_bytes()));
    let encoded_password = Zeroizing::new(STANDARD.encode(password.expose().as_bytes()));

    // Sized up front so no reallocation leaves a stray copy behind
    let mut joined = Vec::with_capacity(encoded_username.len() + 1 + encoded_password.len());
    joined.extend_from_slice(encoded_username.as_bytes());
    joined.push(FIELD_SEPARATOR);
    joined.extend_from_slice(encoded_password.as_bytes());

    SecretBytes::new(joined)
}

/// Split decrypted plaintext back into `(username, password)`
pub fn decode_plaintext(plaintext: &SecretBytes) -> Result<(SecretString, SecretString), FormatError> {
    let fields: Vec<&[u8]> = plaintext.expose().split(|&b| b == FIELD_SEPARATOR).collect();

    let (encoded_username, encoded_password) = match fields.as_slice() {
        [username, password] => (*username, *password),
        _ => {
            return Err(FormatError::Malformed(
                "Encrypted credentials not of expected form".to_string(),
            ))
        }
    };

    let username = decode_field(encoded_username)?;
    let password = decode_field(encoded_password)?;

    Ok((username, password))
}

fn decode_field(encoded: &[u8]) -> Result<SecretString, FormatError> {
    let malformed = || FormatError::Malformed("Encrypted credentials not of expected form".to_string());

    let decoded = STANDARD.decode(encoded).map_err(|_| malformed())?;
    SecretString::from_utf8(decoded).ok_or_else(malformed)
}
