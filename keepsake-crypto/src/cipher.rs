//! AES-256 file encryption.
//!
//! Payloads are always AES-256-GCM with a random 128-bit IV and a
//! detached 128-bit tag:
//! ```text
//! ciphertext: N bytes (same length as plaintext)
//! iv:         16 bytes, fresh per call      → 32 hex chars on the wire
//! tag:        16 bytes, GCM authentication  → 32 hex chars on the wire
//! ```
//!
//! The tag is mandatory. A payload without one cannot be represented, so
//! there is no unauthenticated read path.

use aes::Aes256;
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{AesGcm, Nonce, Tag};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};
use crate::kdf::EncryptionKeys;

/// Size of the per-encryption IV (128-bit).
pub const IV_SIZE: usize = 16;

/// Size of the GCM authentication tag (128-bit).
pub const TAG_SIZE: usize = 16;

/// AES-256-GCM with a 16-byte nonce.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Output of [`encrypt`], input of [`decrypt`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    pub ciphertext: Vec<u8>,
    pub iv: [u8; IV_SIZE],
    pub integrity_tag: [u8; TAG_SIZE],
}

impl EncryptedPayload {
    /// Rebuilds a payload from the hex metadata stored alongside a record.
    ///
    /// An empty or missing tag is `MalformedInput`.
    pub fn from_hex_parts(
        ciphertext: Vec<u8>,
        iv_hex: &str,
        integrity_tag_hex: &str,
    ) -> CryptoResult<Self> {
        let iv = decode_iv_hex(iv_hex)?;
        let integrity_tag = decode_tag_hex(integrity_tag_hex)?;
        Ok(Self {
            ciphertext,
            iv,
            integrity_tag,
        })
    }

    pub fn iv_hex(&self) -> String {
        hex::encode(self.iv)
    }

    pub fn integrity_tag_hex(&self) -> String {
        hex::encode(self.integrity_tag)
    }

    pub fn len(&self) -> usize {
        self.ciphertext.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ciphertext.is_empty()
    }
}

/// Parses a 32-hex-char IV.
pub fn decode_iv_hex(iv_hex: &str) -> CryptoResult<[u8; IV_SIZE]> {
    decode_fixed_hex::<IV_SIZE>(iv_hex, "iv")
}

/// Parses a 32-hex-char integrity tag.
pub fn decode_tag_hex(tag_hex: &str) -> CryptoResult<[u8; TAG_SIZE]> {
    decode_fixed_hex::<TAG_SIZE>(tag_hex, "integrity tag")
}

fn decode_fixed_hex<const N: usize>(s: &str, what: &str) -> CryptoResult<[u8; N]> {
    let bytes = hex::decode(s.trim())
        .map_err(|_| CryptoError::MalformedInput(format!("{what} is not valid hex")))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        CryptoError::MalformedInput(format!("{what} must be {N} bytes, got {}", b.len()))
    })
}

/// Encrypts `plaintext` with AES-256-GCM under a fresh random IV.
pub fn encrypt(plaintext: &[u8], keys: &EncryptionKeys) -> CryptoResult<EncryptedPayload> {
    let cipher = Aes256Gcm16::new(keys.as_bytes().into());

    let mut iv = [0u8; IV_SIZE];
    rand::rng().fill_bytes(&mut iv);

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::<U16>::from_slice(&iv), b"", &mut buffer)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut integrity_tag = [0u8; TAG_SIZE];
    integrity_tag.copy_from_slice(&tag);

    Ok(EncryptedPayload {
        ciphertext: buffer,
        iv,
        integrity_tag,
    })
}

/// Decrypts and authenticates a payload produced by [`encrypt`].
///
/// Fails closed: on any error no plaintext bytes escape.
pub fn decrypt(payload: &EncryptedPayload, keys: &EncryptionKeys) -> CryptoResult<Vec<u8>> {
    let cipher = Aes256Gcm16::new(keys.as_bytes().into());

    let mut buffer = Zeroizing::new(payload.ciphertext.clone());
    cipher
        .decrypt_in_place_detached(
            Nonce::<U16>::from_slice(&payload.iv),
            b"",
            &mut buffer,
            Tag::<U16>::from_slice(&payload.integrity_tag),
        )
        .map_err(|_| CryptoError::IntegrityCheckFailed)?;

    Ok(std::mem::take(&mut *buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::KEY_SIZE;

    fn key(byte: u8) -> EncryptionKeys {
        EncryptionKeys::from_bytes([byte; KEY_SIZE])
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let k = key(1);
        let payload = encrypt(b"hello, memory", &k).unwrap();
        assert_eq!(decrypt(&payload, &k).unwrap(), b"hello, memory");
    }

    #[test]
    fn tag_differs_per_encryption() {
        let k = key(1);
        let a = encrypt(b"x", &k).unwrap();
        let b = encrypt(b"x", &k).unwrap();
        assert_ne!(a.integrity_tag, b.integrity_tag);
    }

    #[test]
    fn ciphertext_length_matches_plaintext() {
        let payload = encrypt(&[0u8; 1000], &key(1)).unwrap();
        assert_eq!(payload.len(), 1000);
    }

    #[test]
    fn wrong_key_fails_integrity() {
        let payload = encrypt(b"secret", &key(1)).unwrap();
        assert_eq!(
            decrypt(&payload, &key(2)).unwrap_err(),
            CryptoError::IntegrityCheckFailed
        );
    }

    #[test]
    fn tampered_tag_fails() {
        let k = key(1);
        let mut payload = encrypt(b"secret", &k).unwrap();
        payload.integrity_tag[0] ^= 0x01;
        assert_eq!(decrypt(&payload, &k).unwrap_err(), CryptoError::IntegrityCheckFailed);
    }

    #[test]
    fn missing_tag_is_malformed() {
        let k = key(3);
        let payload = encrypt(b"written last week", &k).unwrap();
        for tag_hex in ["", "   "] {
            let err =
                EncryptedPayload::from_hex_parts(payload.ciphertext.clone(), &payload.iv_hex(), tag_hex)
                    .unwrap_err();
            assert!(matches!(err, CryptoError::MalformedInput(_)), "{tag_hex:?}: {err:?}");
        }
    }

    #[test]
    fn zeroed_tag_never_yields_plaintext() {
        let k = key(3);
        let mut payload = encrypt(b"written last week", &k).unwrap();
        payload.integrity_tag = [0u8; TAG_SIZE];
        assert_eq!(decrypt(&payload, &k).unwrap_err(), CryptoError::IntegrityCheckFailed);
    }

    #[test]
    fn hex_parts_roundtrip() {
        let k = key(5);
        let payload = encrypt(b"abc", &k).unwrap();
        let iv_hex = payload.iv_hex();
        let tag_hex = payload.integrity_tag_hex();
        assert_eq!(iv_hex.len(), 32);
        assert_eq!(tag_hex.len(), 32);

        let rebuilt =
            EncryptedPayload::from_hex_parts(payload.ciphertext.clone(), &iv_hex, &tag_hex)
                .unwrap();
        assert_eq!(rebuilt, payload);
    }

    #[test]
    fn short_iv_hex_is_malformed() {
        assert!(matches!(
            decode_iv_hex("abcd").unwrap_err(),
            CryptoError::MalformedInput(_)
        ));
    }

    #[test]
    fn non_hex_tag_is_malformed() {
        assert!(matches!(
            decode_tag_hex("zz").unwrap_err(),
            CryptoError::MalformedInput(_)
        ));
    }
}
