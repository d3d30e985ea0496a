//! HTTP client for the Keepsake file storage API.
//!
//! This is the only code that talks to storage. The orchestrator reaches it
//! through the [`StorageApi`] trait so tests can swap in a fake. Payloads
//! are opaque here: zero-knowledge uploads arrive already encrypted.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::config::CloudConfig;
use crate::error::{CloudError, CloudResult};
use crate::types::{AccessGrant, FileUpload, StoredFile};

/// Operations the orchestrator needs from remote storage.
#[async_trait]
pub trait StorageApi: Send + Sync {
    /// `PUT /files`: stores the payload and its metadata.
    async fn put_file(&self, upload: FileUpload) -> CloudResult<StoredFile>;

    /// Resolves a signed URL for the memory and downloads its raw bytes.
    async fn fetch_payload(&self, memory_id: &str) -> CloudResult<Vec<u8>>;

    /// `DELETE /files/{id}`: removes the object and its record.
    async fn delete_file(&self, memory_id: &str) -> CloudResult<()>;
}

pub struct StorageApiClient {
    client: Client,
    base: Url,
    access_token: RwLock<Option<Zeroizing<String>>>,
}

impl StorageApiClient {
    pub fn new(config: &CloudConfig) -> CloudResult<Self> {
        config.validate()?;
        let base = Url::parse(config.base_url())
            .map_err(|e| CloudError::Config(format!("invalid api_base_url: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(CloudError::Config(format!(
                "api_base_url cannot be a base: {base}"
            )));
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| CloudError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base,
            access_token: RwLock::new(None),
        })
    }

    /// Sets the bearer token forwarded on API calls (not on signed URLs).
    pub async fn set_access_token(&self, token: impl Into<String>) {
        *self.access_token.write().await = Some(Zeroizing::new(token.into()));
    }

    pub async fn clear_access_token(&self) {
        *self.access_token.write().await = None;
    }

    pub async fn has_access_token(&self) -> bool {
        self.access_token.read().await.is_some()
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // Checked in `new`: the base URL always has path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match self.access_token.read().await.as_ref() {
            Some(token) => req.bearer_auth(token.as_str()),
            None => req,
        }
    }

    async fn get_access_grant(&self, memory_id: &str) -> CloudResult<AccessGrant> {
        let url = self.endpoint(&["files", memory_id, "access"]);
        let resp = self.authorized(self.client.get(url)).await.send().await?;
        let grant: AccessGrant = decode_json(check_status(resp, memory_id)?).await?;
        if grant.is_expired() {
            warn!(memory_id, "storage returned an already-expired access URL");
            return Err(CloudError::Transport("access URL expired".into()));
        }
        Ok(grant)
    }
}

#[async_trait]
impl StorageApi for StorageApiClient {
    async fn put_file(&self, upload: FileUpload) -> CloudResult<StoredFile> {
        let FileUpload {
            payload,
            file_name,
            title,
            media_type,
            memory_type,
            privacy_tier,
            iv,
            integrity_tag,
            associated_person_id,
        } = upload;
        let payload_len = payload.len();

        let part = Part::bytes(payload)
            .file_name(file_name)
            .mime_str(&media_type)?;
        let mut form = Form::new()
            .part("payload", part)
            .text("title", title)
            .text("mimeType", media_type)
            .text("memoryType", memory_type.as_str())
            .text("privacyTier", privacy_tier.as_str());
        if let Some(iv) = iv {
            form = form.text("iv", iv);
        }
        if let Some(tag) = integrity_tag {
            form = form.text("integrityTag", tag);
        }
        if let Some(person) = associated_person_id {
            form = form.text("associatedPersonId", person);
        }

        let url = self.endpoint(&["files"]);
        let resp = self
            .authorized(self.client.put(url))
            .await
            .multipart(form)
            .send()
            .await?;
        let stored: StoredFile = decode_json(check_status(resp, "files")?).await?;

        debug!(
            memory_id = %stored.memory_id,
            tier = %privacy_tier,
            bytes = payload_len,
            "file stored"
        );
        Ok(stored)
    }

    async fn fetch_payload(&self, memory_id: &str) -> CloudResult<Vec<u8>> {
        let grant = self.get_access_grant(memory_id).await?;
        let url = Url::parse(&grant.url)
            .map_err(|e| CloudError::Transport(format!("invalid access URL: {e}")))?;

        // Signed URLs carry their own credentials; the bearer token stays home.
        let resp = self.client.get(url).send().await?;
        let bytes = check_status(resp, memory_id)?.bytes().await?;

        debug!(memory_id, bytes = bytes.len(), "payload fetched");
        Ok(bytes.to_vec())
    }

    async fn delete_file(&self, memory_id: &str) -> CloudResult<()> {
        let url = self.endpoint(&["files", memory_id]);
        let resp = self.authorized(self.client.delete(url)).await.send().await?;
        check_status(resp, memory_id)?;
        debug!(memory_id, "file deleted");
        Ok(())
    }
}

/// Decodes a JSON body. A body that doesn't parse is `Serialization`.
async fn decode_json<T: DeserializeOwned>(resp: Response) -> CloudResult<T> {
    let body = resp.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

/// Maps 404 to `NotFound(what)` and every other non-2xx status to `Transport`.
fn check_status(resp: Response, what: &str) -> CloudResult<Response> {
    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        return Err(CloudError::NotFound(what.to_string()));
    }
    if !status.is_success() {
        return Err(CloudError::Transport(format!("storage returned {status}")));
    }
    Ok(resp)
}
