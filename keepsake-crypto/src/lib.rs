//! Encryption layer for Keepsake.
//!
//! Provides zero-knowledge protection for memories using:
//! - PBKDF2-HMAC-SHA256 (100,000 rounds) for key derivation
//! - AES-256-GCM with a 128-bit IV and detached tag for file content
//! - Zeroization of key material on drop
//!
//! # Key model
//!
//! There is exactly one key per (password, account) pair:
//!
//! ```text
//! salt = account_identifier || "keepsake-memory-vault-v1"
//! key  = PBKDF2-HMAC-SHA256(password, salt, 100_000, 32 bytes)
//! ```
//!
//! The key is never stored or transmitted. It is rebuilt from what the user
//! remembers (the password) and what the account already knows (its email),
//! which is also why a forgotten password means the data is gone.

mod cipher;
mod error;
mod kdf;

pub use cipher::{decode_iv_hex, decode_tag_hex, decrypt, encrypt, EncryptedPayload, IV_SIZE, TAG_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use kdf::{account_salt, derive_keys, EncryptionKeys, KEY_SIZE, PBKDF2_ITERATIONS, SALT_SUFFIX};
