//! In-memory storage double for orchestrator tests.

#![allow(dead_code)]

use async_trait::async_trait;
use keepsake_cloud::api_client::StorageApi;
use keepsake_cloud::error::{CloudError, CloudResult};
use keepsake_cloud::types::{FileUpload, MemoryRecord, StoredFile};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

pub const ACCOUNT: &str = "ada@example.com";

/// Records every upload and serves stored payloads back by memory id.
#[derive(Default)]
pub struct RecordingStorage {
    uploads: Mutex<Vec<FileUpload>>,
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fail_transport: AtomicBool,
    fetches: AtomicUsize,
}

impl RecordingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with a transport error.
    pub fn fail_transport(&self, fail: bool) {
        self.fail_transport.store(fail, Ordering::SeqCst);
    }

    pub fn uploads(&self) -> Vec<FileUpload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn last_upload(&self) -> FileUpload {
        self.uploads().pop().expect("no upload recorded")
    }

    pub fn stored_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Overwrites a stored payload, e.g. to simulate corruption at rest.
    pub fn replace_object(&self, memory_id: &str, bytes: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert(memory_id.to_string(), bytes);
    }

    fn check_transport(&self) -> CloudResult<()> {
        if self.fail_transport.load(Ordering::SeqCst) {
            return Err(CloudError::Transport("connection reset".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageApi for RecordingStorage {
    async fn put_file(&self, upload: FileUpload) -> CloudResult<StoredFile> {
        self.check_transport()?;
        let mut uploads = self.uploads.lock().unwrap();
        let memory_id = format!("mem-{}", uploads.len() + 1);
        self.objects
            .lock()
            .unwrap()
            .insert(memory_id.clone(), upload.payload.clone());
        uploads.push(upload);
        Ok(StoredFile {
            storage_reference: format!("memories/{memory_id}"),
            memory_id,
        })
    }

    async fn fetch_payload(&self, memory_id: &str) -> CloudResult<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check_transport()?;
        self.objects
            .lock()
            .unwrap()
            .get(memory_id)
            .cloned()
            .ok_or_else(|| CloudError::NotFound(memory_id.to_string()))
    }

    async fn delete_file(&self, memory_id: &str) -> CloudResult<()> {
        self.check_transport()?;
        self.objects
            .lock()
            .unwrap()
            .remove(memory_id)
            .map(|_| ())
            .ok_or_else(|| CloudError::NotFound(memory_id.to_string()))
    }
}

/// Builds the record the app would persist for an upload the fake received.
pub fn record_for(memory_id: &str, upload: &FileUpload) -> MemoryRecord {
    MemoryRecord {
        memory_id: memory_id.to_string(),
        storage_reference: format!("memories/{memory_id}"),
        title: upload.title.clone(),
        media_type: upload.media_type.clone(),
        memory_type: upload.memory_type,
        privacy_tier: upload.privacy_tier,
        iv: upload.iv.clone(),
        integrity_tag: upload.integrity_tag.clone(),
        associated_person_id: upload.associated_person_id.clone(),
    }
}

/// Deterministic pseudo-text of exactly `len` bytes.
pub fn text_of_len(len: usize) -> Vec<u8> {
    b"dear future me, "
        .iter()
        .copied()
        .cycle()
        .take(len)
        .collect()
}
