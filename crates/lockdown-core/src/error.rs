//! Error types for lockdown-core

use thiserror::Error;

/// Result type alias for lockdown operations
pub type Result<T> = std::result::Result<T, LockdownError>;

/// Lockdown error types
#[derive(Error, Debug)]
pub enum LockdownError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    Validation(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

/// Malformed input: PEM armor, key bodies, stored records
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("{0}")]
    Malformed(String),

    #[error("Invalid key provided - only PEM (PKCS1 format) is supported. Expected header '{expected}', found '{found}'")]
    WrongType { expected: String, found: String },
}

/// Failures of the RSA layer
///
/// `InvalidPadding` is deliberately uninformative: a corrupted ciphertext and a
/// mismatched private key produce the same error and the same message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Message too long: {len} bytes exceeds the {max} byte limit for this key")]
    MessageTooLong { len: usize, max: usize },

    #[error("Decryption failed")]
    InvalidPadding,

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),
}

impl LockdownError {
    /// Shorthand for a malformed-format error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Format(FormatError::Malformed(message.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_padding_message_is_fixed() {
        let err: LockdownError = CryptoError::InvalidPadding.into();
        assert_eq!(err.to_string(), "Crypto error: Decryption failed");
    }

    #[test]
    fn test_wrong_type_names_both_tags() {
        let err = FormatError::WrongType {
            expected: "RSA PUBLIC KEY".to_string(),
            found: "PUBLIC KEY".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("'RSA PUBLIC KEY'"));
        assert!(message.contains("'PUBLIC KEY'"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: LockdownError = io.into();
        assert!(matches!(err, LockdownError::Io(_)));
    }
}
