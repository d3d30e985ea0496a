//! Pre-flight checks on files before any key derivation or encryption.

use thiserror::Error;

use crate::types::{MemoryFile, PrivacyTier};

/// Hard upper bound on a single memory (50 MiB).
pub const MAX_FILE_BYTES: u64 = 50 * 1024 * 1024;

/// Media types accepted for upload.
pub const ALLOWED_MEDIA_TYPES: &[&str] = &[
    // text
    "text/plain",
    "text/markdown",
    // images
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/heic",
    // audio
    "audio/mpeg",
    "audio/mp4",
    "audio/wav",
    "audio/aac",
    "audio/ogg",
    "audio/webm",
    // video
    "video/mp4",
    "video/quicktime",
    "video/webm",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("file is {size} bytes; the limit is {max} bytes")]
    TooLarge { size: u64, max: u64 },

    #[error("file type '{0}' is not supported")]
    UnsupportedType(String),

    #[error("file is empty")]
    Empty,
}

/// Size and media-type gate. Cheap, synchronous, side-effect free.
#[derive(Clone, Copy, Debug)]
pub struct FileValidator {
    max_file_bytes: u64,
}

impl Default for FileValidator {
    fn default() -> Self {
        Self {
            max_file_bytes: MAX_FILE_BYTES,
        }
    }
}

impl FileValidator {
    /// Limits above [`MAX_FILE_BYTES`] are clamped to it.
    pub fn with_max_bytes(max_file_bytes: u64) -> Self {
        Self {
            max_file_bytes: max_file_bytes.min(MAX_FILE_BYTES),
        }
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_bytes
    }

    /// Size and media-type checks shared by every tier.
    pub fn validate(&self, file: &MemoryFile) -> Result<(), ValidationError> {
        if file.len() > self.max_file_bytes {
            return Err(ValidationError::TooLarge {
                size: file.len(),
                max: self.max_file_bytes,
            });
        }
        if !is_allowed_media_type(&file.media_type) {
            return Err(ValidationError::UnsupportedType(file.media_type.clone()));
        }
        Ok(())
    }

    /// [`validate`](Self::validate) plus the tier's own rules.
    ///
    /// Zero-knowledge files must be non-empty: an empty ciphertext would tell
    /// the server the plaintext was empty.
    pub fn validate_for_tier(
        &self,
        file: &MemoryFile,
        tier: PrivacyTier,
    ) -> Result<(), ValidationError> {
        self.validate(file)?;
        if tier.is_encrypted() && file.is_empty() {
            return Err(ValidationError::Empty);
        }
        Ok(())
    }
}

/// Case-insensitive allow-list lookup ignoring parameters like `; charset=utf-8`.
pub fn is_allowed_media_type(media_type: &str) -> bool {
    let essence = media_type.split(';').next().unwrap_or_default().trim();
    ALLOWED_MEDIA_TYPES
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(essence))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(media_type: &str, len: usize) -> MemoryFile {
        MemoryFile::new("f", media_type, vec![7u8; len])
    }

    #[test]
    fn accepts_common_media() {
        let v = FileValidator::default();
        for mt in ["image/jpeg", "audio/mpeg", "video/mp4", "text/plain"] {
            assert!(v.validate(&file(mt, 10)).is_ok(), "{mt} should pass");
        }
    }

    #[test]
    fn media_type_match_ignores_case_and_params() {
        assert!(is_allowed_media_type("IMAGE/PNG"));
        assert!(is_allowed_media_type("text/plain; charset=utf-8"));
        assert!(!is_allowed_media_type("application/pdf"));
        assert!(!is_allowed_media_type(""));
    }

    #[test]
    fn rejects_unsupported_type() {
        let err = FileValidator::default()
            .validate(&file("application/x-msdownload", 10))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnsupportedType("application/x-msdownload".into())
        );
    }

    #[test]
    fn exactly_at_limit_is_allowed() {
        let v = FileValidator::with_max_bytes(1024);
        assert!(v.validate(&file("image/png", 1024)).is_ok());
        assert_eq!(
            v.validate(&file("image/png", 1025)).unwrap_err(),
            ValidationError::TooLarge {
                size: 1025,
                max: 1024
            }
        );
    }

    #[test]
    fn empty_zero_knowledge_file_rejected() {
        assert_eq!(
            FileValidator::default()
                .validate_for_tier(&file("image/png", 0), PrivacyTier::ZeroKnowledge)
                .unwrap_err(),
            ValidationError::Empty
        );
    }

    #[test]
    fn empty_server_managed_file_accepted() {
        let v = FileValidator::default();
        assert!(v.validate(&file("text/plain", 0)).is_ok());
        assert!(
            v.validate_for_tier(&file("text/plain", 0), PrivacyTier::ServerManaged)
                .is_ok()
        );
    }

    #[test]
    fn tier_rules_still_apply_size_and_type() {
        let v = FileValidator::with_max_bytes(4);
        assert!(matches!(
            v.validate_for_tier(&file("image/png", 5), PrivacyTier::ServerManaged),
            Err(ValidationError::TooLarge { .. })
        ));
        assert!(matches!(
            v.validate_for_tier(&file("application/pdf", 0), PrivacyTier::ZeroKnowledge),
            Err(ValidationError::UnsupportedType(_))
        ));
    }

    #[test]
    fn configured_limit_cannot_exceed_hard_cap() {
        let v = FileValidator::with_max_bytes(u64::MAX);
        assert_eq!(v.max_file_bytes(), MAX_FILE_BYTES);
    }

    #[test]
    fn size_is_checked_before_type() {
        // An oversized unsupported file reports the size problem first.
        let v = FileValidator::with_max_bytes(4);
        assert!(matches!(
            v.validate(&file("application/pdf", 5)),
            Err(ValidationError::TooLarge { .. })
        ));
    }
}
