//! In-memory displayable artifacts for decrypted memories.
//!
//! Decrypted bytes never touch disk. The UI gets an opaque
//! `blob:keepsake/<uuid>` handle to render from and must release it when
//! the artifact leaves the screen.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

const HANDLE_PREFIX: &str = "blob:keepsake/";

/// Opaque reference to a materialized artifact.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArtifactHandle(String);

impl ArtifactHandle {
    fn generate() -> Self {
        Self(format!("{HANDLE_PREFIX}{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decrypted content plus its media type.
#[derive(Clone)]
pub struct Artifact {
    pub media_type: String,
    bytes: Arc<Zeroizing<Vec<u8>>>,
}

impl Artifact {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Default)]
pub struct ArtifactManager {
    live: RwLock<HashMap<ArtifactHandle, Artifact>>,
}

impl ArtifactManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ArtifactHandle, Artifact>> {
        self.live.read().unwrap_or_else(|poisoned| {
            warn!("artifact registry lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ArtifactHandle, Artifact>> {
        self.live.write().unwrap_or_else(|poisoned| {
            warn!("artifact registry lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Takes ownership of `bytes` and returns a handle to display them.
    pub fn materialize(&self, bytes: Vec<u8>, media_type: &str) -> ArtifactHandle {
        let handle = ArtifactHandle::generate();
        let artifact = Artifact {
            media_type: media_type.to_string(),
            bytes: Arc::new(Zeroizing::new(bytes)),
        };
        debug!(handle = %handle, len = artifact.len(), "artifact materialized");
        self.write().insert(handle.clone(), artifact);
        handle
    }

    pub fn get(&self, handle: &ArtifactHandle) -> Option<Artifact> {
        self.read().get(handle).cloned()
    }

    /// Frees the artifact. Returns `false` if it was already released or unknown.
    pub fn release(&self, handle: &ArtifactHandle) -> bool {
        let released = self.write().remove(handle).is_some();
        if released {
            debug!(handle = %handle, "artifact released");
        }
        released
    }

    /// Frees every live artifact, returning how many there were.
    pub fn release_all(&self) -> usize {
        let drained: Vec<_> = self.write().drain().collect();
        if !drained.is_empty() {
            debug!(count = drained.len(), "released all artifacts");
        }
        drained.len()
    }

    pub fn live_count(&self) -> usize {
        self.read().len()
    }
}

impl Drop for ArtifactManager {
    fn drop(&mut self) {
        self.release_all();
    }
}

impl fmt::Debug for ArtifactManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactManager")
            .field("live", &self.live_count())
            .finish()
    }
}
