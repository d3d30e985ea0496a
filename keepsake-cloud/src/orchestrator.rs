//! Upload and retrieval pipelines that bind a privacy tier to crypto behavior.
//!
//! Zero-knowledge memories go validate → derive → encrypt → transmit, and
//! come back fetch → decrypt → materialize. Server-managed memories skip
//! the cipher in both directions and never touch the key cache.

use keepsake_crypto::{decode_iv_hex, decode_tag_hex, decrypt, encrypt, EncryptedPayload};
use std::sync::Arc;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::api_client::StorageApi;
use crate::artifacts::{Artifact, ArtifactHandle, ArtifactManager};
use crate::config::CloudConfig;
use crate::error::{CloudError, CloudResult};
use crate::key_cache::KeyCache;
use crate::session::{OperationSession, OperationState};
use crate::types::{FileUpload, MemoryRecord, PrivacyTier, UploadReceipt, UploadRequest};
use crate::validator::FileValidator;

/// Progress checkpoints reported to the session.
mod progress {
    pub const VALIDATED: u8 = 10;
    pub const DERIVING: u8 = 20;
    pub const DERIVED: u8 = 30;
    pub const ENCRYPTED: u8 = 60;
    pub const FETCHING: u8 = 30;
    pub const FETCHED: u8 = 70;
    pub const DECRYPTED: u8 = 90;
}

/// Runs uploads and retrievals for one signed-in account.
///
/// Owns the session's key cache and artifact registry; [`logout`](Self::logout)
/// wipes both. Storage is reached only through [`StorageApi`].
pub struct MemoryOrchestrator {
    storage: Arc<dyn StorageApi>,
    key_cache: Arc<KeyCache>,
    validator: FileValidator,
    artifacts: Arc<ArtifactManager>,
    account: String,
}

impl MemoryOrchestrator {
    /// Builds an orchestrator with a fresh key cache and artifact registry.
    ///
    /// `account` is the stable identifier from the auth provider; it is used
    /// as-is in the key derivation salt and must not be blank.
    pub fn new(
        storage: Arc<dyn StorageApi>,
        account: impl Into<String>,
        config: &CloudConfig,
    ) -> CloudResult<Self> {
        config.validate()?;
        let account = account.into();
        if account.trim().is_empty() {
            return Err(CloudError::Config("account identifier is empty".into()));
        }
        Ok(Self::with_parts(
            storage,
            Arc::new(KeyCache::new()),
            Arc::new(ArtifactManager::new()),
            FileValidator::with_max_bytes(config.max_file_bytes),
            account,
        ))
    }

    pub fn with_parts(
        storage: Arc<dyn StorageApi>,
        key_cache: Arc<KeyCache>,
        artifacts: Arc<ArtifactManager>,
        validator: FileValidator,
        account: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            key_cache,
            validator,
            artifacts,
            account: account.into(),
        }
    }

    pub fn key_cache(&self) -> &Arc<KeyCache> {
        &self.key_cache
    }

    pub fn artifacts(&self) -> &Arc<ArtifactManager> {
        &self.artifacts
    }

    // ── Upload ──

    /// Validates, optionally encrypts, and stores a new memory.
    ///
    /// On failure nothing is persisted and the session ends `Errored` with
    /// the error's kind.
    pub async fn upload_memory(
        &self,
        request: UploadRequest,
        session: &OperationSession,
    ) -> CloudResult<UploadReceipt> {
        let tier = request.privacy_tier;
        let result = self.run_upload(request, session).await;
        match &result {
            Ok(receipt) => {
                session.complete();
                info!(memory_id = %receipt.memory_id, %tier, "memory uploaded");
            }
            Err(e) => {
                session.fail(e.kind());
                warn!(kind = ?e.kind(), %tier, "memory upload failed");
            }
        }
        result
    }

    async fn run_upload(
        &self,
        request: UploadRequest,
        session: &OperationSession,
    ) -> CloudResult<UploadReceipt> {
        let UploadRequest {
            mut file,
            title,
            memory_type,
            privacy_tier,
            password,
            associated_person_id,
        } = request;

        session.advance(OperationState::Validating, 0);
        self.validator.validate_for_tier(&file, privacy_tier)?;
        session.report_progress(progress::VALIDATED);

        let (payload, iv, integrity_tag) = match privacy_tier {
            PrivacyTier::ZeroKnowledge => {
                let password = password
                    .filter(|p| !p.is_empty())
                    .ok_or(CloudError::PasswordRequired)?;

                session.advance(OperationState::DerivingKeys, progress::DERIVING);
                let keys = self.key_cache.get_or_derive(&password, &self.account).await?;
                drop(password);

                session.advance(OperationState::Encrypting, progress::DERIVED);
                let plaintext = Zeroizing::new(std::mem::take(&mut *file.bytes));
                let encrypted = tokio::task::spawn_blocking(move || encrypt(&plaintext, &keys))
                    .await
                    .map_err(|e| CloudError::Encryption(format!("encryption task failed: {e}")))??;
                session.report_progress(progress::ENCRYPTED);

                debug!(bytes = encrypted.len(), "memory encrypted");
                let iv = encrypted.iv_hex();
                let tag = encrypted.integrity_tag_hex();
                (encrypted.ciphertext, Some(iv), Some(tag))
            }
            PrivacyTier::ServerManaged => {
                session.advance(OperationState::Skipped, progress::ENCRYPTED);
                (std::mem::take(&mut *file.bytes), None, None)
            }
        };

        session.advance(OperationState::Transmitting, progress::ENCRYPTED);
        let stored = self
            .storage
            .put_file(FileUpload {
                payload,
                file_name: std::mem::take(&mut file.name),
                title,
                media_type: std::mem::take(&mut file.media_type),
                memory_type,
                privacy_tier,
                iv,
                integrity_tag,
                associated_person_id,
            })
            .await?;

        Ok(UploadReceipt {
            memory_id: stored.memory_id,
            storage_reference: stored.storage_reference,
            privacy_tier,
        })
    }

    // ── Retrieval ──

    /// Fetches and decrypts a zero-knowledge memory into a displayable artifact.
    ///
    /// Every decryption failure surfaces as the same `Decryption` error; the
    /// underlying cause is only logged.
    pub async fn decrypt_and_display(
        &self,
        record: &MemoryRecord,
        password: &str,
        session: &OperationSession,
    ) -> CloudResult<ArtifactHandle> {
        let result = self.run_decrypt(record, password, session).await;
        self.finish_retrieval(record, session, result)
    }

    async fn run_decrypt(
        &self,
        record: &MemoryRecord,
        password: &str,
        session: &OperationSession,
    ) -> CloudResult<ArtifactHandle> {
        if !record.is_zero_knowledge() {
            return Err(CloudError::NotEncrypted);
        }
        if password.is_empty() {
            return Err(CloudError::PasswordRequired);
        }

        // Both are required; a missing tag fails here, before any fetch.
        let iv = decode_iv_hex(record.iv.as_deref().unwrap_or_default())?;
        let integrity_tag = decode_tag_hex(record.integrity_tag.as_deref().unwrap_or_default())?;

        session.advance(OperationState::DerivingKeys, progress::DERIVING);
        let keys = self.key_cache.get_or_derive(password, &self.account).await?;

        session.advance(OperationState::Fetching, progress::FETCHING);
        let ciphertext = self.storage.fetch_payload(&record.memory_id).await?;

        session.advance(OperationState::Decrypting, progress::FETCHED);
        let payload = EncryptedPayload {
            ciphertext,
            iv,
            integrity_tag,
        };
        let plaintext = tokio::task::spawn_blocking(move || decrypt(&payload, &keys))
            .await
            .map_err(|e| CloudError::Encryption(format!("decryption task failed: {e}")))?
            .map_err(|e| {
                debug!(memory_id = %record.memory_id, cause = ?e, "decrypt rejected");
                CloudError::from(e)
            })?;
        session.report_progress(progress::DECRYPTED);

        Ok(self.artifacts.materialize(plaintext, &record.media_type))
    }

    /// Opens any memory for display, decrypting only when the tier requires it.
    pub async fn open_memory(
        &self,
        record: &MemoryRecord,
        password: Option<&str>,
        session: &OperationSession,
    ) -> CloudResult<ArtifactHandle> {
        match record.privacy_tier {
            PrivacyTier::ZeroKnowledge => {
                self.decrypt_and_display(record, password.unwrap_or_default(), session)
                    .await
            }
            PrivacyTier::ServerManaged => {
                let result = self.run_plain_fetch(record, session).await;
                self.finish_retrieval(record, session, result)
            }
        }
    }

    async fn run_plain_fetch(
        &self,
        record: &MemoryRecord,
        session: &OperationSession,
    ) -> CloudResult<ArtifactHandle> {
        session.advance(OperationState::Fetching, progress::FETCHING);
        let bytes = self.storage.fetch_payload(&record.memory_id).await?;
        session.report_progress(progress::DECRYPTED);
        Ok(self.artifacts.materialize(bytes, &record.media_type))
    }

    fn finish_retrieval(
        &self,
        record: &MemoryRecord,
        session: &OperationSession,
        result: CloudResult<ArtifactHandle>,
    ) -> CloudResult<ArtifactHandle> {
        match &result {
            Ok(handle) => {
                session.complete();
                debug!(memory_id = %record.memory_id, %handle, "memory opened");
            }
            Err(e) => {
                session.fail(e.kind());
                warn!(memory_id = %record.memory_id, kind = ?e.kind(), "memory retrieval failed");
            }
        }
        result
    }

    // ── Lifecycle ──

    pub async fn delete_memory(&self, memory_id: &str) -> CloudResult<()> {
        self.storage.delete_file(memory_id).await?;
        info!(memory_id, "memory deleted");
        Ok(())
    }

    pub fn artifact(&self, handle: &ArtifactHandle) -> Option<Artifact> {
        self.artifacts.get(handle)
    }

    /// Idempotent; returns whether anything was freed.
    pub fn release_artifact(&self, handle: &ArtifactHandle) -> bool {
        self.artifacts.release(handle)
    }

    /// Drops the cached key so the next zero-knowledge operation re-prompts.
    pub fn forget_password(&self) {
        self.key_cache.clear();
    }

    /// Wipes all session secrets: the cached key and every live artifact.
    pub fn logout(&self) {
        self.key_cache.clear();
        let released = self.artifacts.release_all();
        info!(released, "session secrets cleared");
    }
}
