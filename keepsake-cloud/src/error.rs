//! Memory upload/retrieval error types.

use keepsake_crypto::CryptoError;
use thiserror::Error;

use crate::validator::ValidationError;

/// Result type for cloud operations.
pub type CloudResult<T> = Result<T, CloudError>;

/// Why a decryption was rejected.
///
/// Kept for diagnostics and logging only. Every cause renders the same
/// `Display` text so the distinction never reaches the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecryptionCause {
    IntegrityCheckFailed,
    MalformedInput,
}

/// Coarse classification used for session state and UI affordances.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    ValidationFailed,
    PasswordRequired,
    KeyDerivationFailed,
    EncryptionFailed,
    DecryptionFailed,
    TransportFailed,
    NotEncrypted,
    NotFound,
    Config,
}

/// Errors that can occur while uploading, fetching, or decrypting memories.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("file rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error("a password is required for zero-knowledge memories")]
    PasswordRequired,

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("decryption failed: wrong password or corrupted file")]
    Decryption(DecryptionCause),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("storage request failed: {0}")]
    Transport(String),

    #[error("storage request timed out")]
    Timeout,

    #[error("memory is not zero-knowledge encrypted")]
    NotEncrypted,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// A storage response body did not decode.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<CryptoError> for CloudError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::IntegrityCheckFailed => {
                CloudError::Decryption(DecryptionCause::IntegrityCheckFailed)
            }
            CryptoError::MalformedInput(_) => {
                CloudError::Decryption(DecryptionCause::MalformedInput)
            }
            CryptoError::EmptyPassword => CloudError::PasswordRequired,
            CryptoError::EmptyAccountIdentifier => CloudError::KeyDerivation(e.to_string()),
            CryptoError::Encryption(msg) => CloudError::Encryption(msg),
        }
    }
}

impl From<reqwest::Error> for CloudError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return CloudError::Timeout;
        }
        if e.status() == Some(reqwest::StatusCode::NOT_FOUND) {
            return CloudError::NotFound(
                e.url().map(|u| u.path().to_string()).unwrap_or_default(),
            );
        }
        // Drop the URL: signed access URLs carry credentials in the query.
        CloudError::Transport(e.without_url().to_string())
    }
}

impl CloudError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CloudError::Validation(_) => ErrorKind::ValidationFailed,
            CloudError::PasswordRequired => ErrorKind::PasswordRequired,
            CloudError::KeyDerivation(_) => ErrorKind::KeyDerivationFailed,
            CloudError::Encryption(_) => ErrorKind::EncryptionFailed,
            CloudError::Decryption(_) => ErrorKind::DecryptionFailed,
            CloudError::Transport(_) | CloudError::Timeout | CloudError::Serialization(_) => {
                ErrorKind::TransportFailed
            }
            CloudError::NotEncrypted => ErrorKind::NotEncrypted,
            CloudError::NotFound(_) => ErrorKind::NotFound,
            CloudError::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether the user can reasonably try again (new file, re-entered
    /// password, or a second network attempt).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ValidationFailed
                | ErrorKind::PasswordRequired
                | ErrorKind::DecryptionFailed
                | ErrorKind::TransportFailed
        )
    }

    /// The single message shown to the user for this error.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::ValidationFailed => match self {
                CloudError::Validation(v) => v.to_string(),
                _ => "This file can't be uploaded.".to_string(),
            },
            ErrorKind::PasswordRequired => {
                "Enter your encryption password to continue.".to_string()
            }
            ErrorKind::KeyDerivationFailed | ErrorKind::EncryptionFailed => {
                "Something went wrong preparing encryption. Please try again.".to_string()
            }
            ErrorKind::DecryptionFailed => "Wrong password or corrupted file. \
                Memories encrypted with a forgotten password cannot be recovered by anyone, \
                including us."
                .to_string(),
            ErrorKind::TransportFailed => {
                "Couldn't reach storage. Check your connection and retry.".to_string()
            }
            ErrorKind::NotEncrypted => "This memory is not encrypted.".to_string(),
            ErrorKind::NotFound => "This memory no longer exists.".to_string(),
            ErrorKind::Config => "The app is misconfigured.".to_string(),
        }
    }
}
