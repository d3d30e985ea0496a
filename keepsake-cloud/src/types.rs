//! Shared types for memory upload and retrieval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

/// Confidentiality tier, fixed when a memory is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyTier {
    /// Encrypted on device; the server only ever stores ciphertext.
    ZeroKnowledge,
    /// Sent as-is so the server can read it for AI features.
    ServerManaged,
}

impl PrivacyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyTier::ZeroKnowledge => "zero_knowledge",
            PrivacyTier::ServerManaged => "server_managed",
        }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, PrivacyTier::ZeroKnowledge)
    }
}

impl fmt::Display for PrivacyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    Text,
    Image,
    Audio,
    Video,
}

impl MemoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::Text => "text",
            MemoryType::Image => "image",
            MemoryType::Audio => "audio",
            MemoryType::Video => "video",
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file selected for upload. Bytes are wiped when dropped.
#[derive(Clone)]
pub struct MemoryFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Zeroizing<Vec<u8>>,
}

impl MemoryFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes: Zeroizing::new(bytes),
        }
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for MemoryFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Everything the UI collects for one upload.
pub struct UploadRequest {
    pub file: MemoryFile,
    pub title: String,
    pub memory_type: MemoryType,
    pub privacy_tier: PrivacyTier,
    /// Required for [`PrivacyTier::ZeroKnowledge`], ignored otherwise.
    pub password: Option<Zeroizing<String>>,
    pub associated_person_id: Option<String>,
}

impl UploadRequest {
    pub fn new(
        file: MemoryFile,
        title: impl Into<String>,
        memory_type: MemoryType,
        privacy_tier: PrivacyTier,
    ) -> Self {
        Self {
            file,
            title: title.into(),
            memory_type,
            privacy_tier,
            password: None,
            associated_person_id: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(Zeroizing::new(password.into()));
        self
    }

    pub fn with_associated_person(mut self, person_id: impl Into<String>) -> Self {
        self.associated_person_id = Some(person_id.into());
        self
    }
}

impl fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadRequest")
            .field("file", &self.file)
            .field("title", &self.title)
            .field("memory_type", &self.memory_type)
            .field("privacy_tier", &self.privacy_tier)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("associated_person_id", &self.associated_person_id)
            .finish()
    }
}

/// The outgoing body for `PUT /files`, after the tier decision was applied.
///
/// For zero-knowledge memories `payload` is ciphertext and `iv` is set;
/// for server-managed memories it is the original file bytes.
#[derive(Clone, Debug)]
pub struct FileUpload {
    pub payload: Vec<u8>,
    pub file_name: String,
    pub title: String,
    pub media_type: String,
    pub memory_type: MemoryType,
    pub privacy_tier: PrivacyTier,
    pub iv: Option<String>,
    pub integrity_tag: Option<String>,
    pub associated_person_id: Option<String>,
}

/// Response from `PUT /files`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub memory_id: String,
    pub storage_reference: String,
}

/// Response from `GET /files/{id}/access`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    pub url: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessGrant {
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }
}

/// Result of a completed upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadReceipt {
    pub memory_id: String,
    pub storage_reference: String,
    pub privacy_tier: PrivacyTier,
}

/// A persisted memory as the app knows it. Never carries a password or key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecord {
    pub memory_id: String,
    pub storage_reference: String,
    pub title: String,
    #[serde(rename = "mimeType")]
    pub media_type: String,
    pub memory_type: MemoryType,
    pub privacy_tier: PrivacyTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associated_person_id: Option<String>,
}

impl MemoryRecord {
    /// True when the record can go through the decrypt path.
    pub fn is_zero_knowledge(&self) -> bool {
        self.privacy_tier.is_encrypted() && self.iv.as_deref().is_some_and(|iv| !iv.is_empty())
    }
}
