//! Memory storage client configuration.

use serde::{Deserialize, Serialize};

use crate::error::{CloudError, CloudResult};
use crate::validator::MAX_FILE_BYTES;

/// Configuration for the storage client and upload pipeline.
///
/// Nothing here affects key derivation: a memory encrypted under one config
/// decrypts under any other.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CloudConfig {
    /// Base URL for the Keepsake file API (e.g., "https://api.keepsake.app").
    pub api_base_url: String,

    /// Upper bound for any single storage request, in seconds.
    pub request_timeout_secs: u64,

    /// Largest file accepted for upload. Cannot exceed [`MAX_FILE_BYTES`].
    pub max_file_bytes: u64,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.keepsake.app".to_string(),
            request_timeout_secs: 30,
            max_file_bytes: MAX_FILE_BYTES,
        }
    }
}

impl CloudConfig {
    /// Checks the config before any client is built from it.
    pub fn validate(&self) -> CloudResult<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(CloudError::Config("api_base_url is empty".into()));
        }
        if !(self.api_base_url.starts_with("https://") || self.api_base_url.starts_with("http://"))
        {
            return Err(CloudError::Config(format!(
                "api_base_url must be an http(s) URL, got {}",
                self.api_base_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(CloudError::Config("request_timeout_secs must be > 0".into()));
        }
        if self.max_file_bytes == 0 || self.max_file_bytes > MAX_FILE_BYTES {
            return Err(CloudError::Config(format!(
                "max_file_bytes must be in 1..={MAX_FILE_BYTES}, got {}",
                self.max_file_bytes
            )));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    /// API base URL without a trailing slash.
    pub(crate) fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}
