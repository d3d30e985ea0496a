//! Crypto error types.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors produced by key derivation and the cipher engine.
///
/// Messages never include key material, passwords, or payload bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("password must not be empty")]
    EmptyPassword,

    #[error("account identifier must not be empty")]
    EmptyAccountIdentifier,

    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Authentication tag mismatch. Almost always a wrong password or tampering.
    #[error("integrity check failed")]
    IntegrityCheckFailed,

    /// IV, tag, or ciphertext missing or of the wrong length.
    #[error("malformed input: {0}")]
    MalformedInput(String),
}

impl CryptoError {
    /// Whether this error came out of `decrypt` rejecting its input.
    ///
    /// Callers must collapse all of these into one user-facing message so
    /// the specific cause is not observable.
    pub fn is_decryption_failure(&self) -> bool {
        matches!(
            self,
            CryptoError::IntegrityCheckFailed | CryptoError::MalformedInput(_)
        )
    }
}
