//! Key derivation: password + account identifier → 256-bit key.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::error::{CryptoError, CryptoResult};

/// Size of a derived key in bytes (256-bit).
pub const KEY_SIZE: usize = 32;

/// Fixed, public, application-specific salt component.
///
/// Appended to the account identifier so precomputed tables for other
/// applications are useless here and every key is bound to one account.
pub const SALT_SUFFIX: &str = "keepsake-memory-vault-v1";

/// PBKDF2 round count.
///
/// Not stored with records: changing it makes every existing zero-knowledge
/// memory undecryptable.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Symmetric key material derived from a password.
///
/// Zeroized on drop. Never serialized or transmitted.
#[derive(Clone)]
pub struct EncryptionKeys {
    bytes: [u8; KEY_SIZE],
}

impl EncryptionKeys {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Lowercase hex form of the key (64 characters).
    ///
    /// The returned string is wiped when dropped.
    pub fn raw_key_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.bytes))
    }
}

impl Drop for EncryptionKeys {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for EncryptionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKeys")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Builds the salt: account identifier followed by [`SALT_SUFFIX`].
pub fn account_salt(account_identifier: &str) -> Vec<u8> {
    let mut salt = Vec::with_capacity(account_identifier.len() + SALT_SUFFIX.len());
    salt.extend_from_slice(account_identifier.as_bytes());
    salt.extend_from_slice(SALT_SUFFIX.as_bytes());
    salt
}

/// Derives the key for `(password, account_identifier)`.
///
/// Deterministic: identical inputs always produce identical key bytes, which
/// is what lets the key be rebuilt without the server ever storing it.
pub fn derive_keys(password: &str, account_identifier: &str) -> CryptoResult<EncryptionKeys> {
    if password.is_empty() {
        return Err(CryptoError::EmptyPassword);
    }
    if account_identifier.is_empty() {
        return Err(CryptoError::EmptyAccountIdentifier);
    }

    let salt = account_salt(account_identifier);
    let mut key = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut key);

    let keys = EncryptionKeys::from_bytes(key);
    key.zeroize();
    Ok(keys)
}
