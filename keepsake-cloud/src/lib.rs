//! Client-side memory pipeline for Keepsake.
//!
//! Provides:
//! - Pre-flight file validation (size cap, media-type allow-list)
//! - A session-scoped key cache over PBKDF2 derivation
//! - Upload/decrypt orchestration bound to each memory's privacy tier
//! - An HTTP client for the file storage API
//! - In-memory artifacts for displaying decrypted content
//!
//! Zero-knowledge memories are encrypted before they leave the device and
//! can only be read back with the user's password. Server-managed memories
//! travel as-is.

pub mod api_client;
pub mod artifacts;
pub mod config;
pub mod error;
pub mod key_cache;
pub mod orchestrator;
pub mod session;
pub mod telemetry;
pub mod types;
pub mod validator;

pub use api_client::{StorageApi, StorageApiClient};
pub use artifacts::{Artifact, ArtifactHandle, ArtifactManager};
pub use config::CloudConfig;
pub use error::{CloudError, CloudResult, DecryptionCause, ErrorKind};
pub use key_cache::KeyCache;
pub use orchestrator::MemoryOrchestrator;
pub use session::{OperationKind, OperationSession, OperationState, SessionSnapshot};
pub use types::*;
pub use validator::{FileValidator, ValidationError, ALLOWED_MEDIA_TYPES, MAX_FILE_BYTES};
