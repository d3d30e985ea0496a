//! Session-scoped cache for the most recently derived encryption key.
//!
//! PBKDF2 is slow on purpose, so re-deriving for every file in a session
//! would be noticeable. The cache keeps exactly one entry: the last
//! (password, account) pair and the key it produced. It lives in memory
//! only and is wiped on [`KeyCache::clear`] or when the cache is dropped.

use keepsake_crypto::{derive_keys, EncryptionKeys, PBKDF2_ITERATIONS};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::error::{CloudError, CloudResult};

struct CachedEntry {
    password: Zeroizing<String>,
    account: Zeroizing<String>,
    keys: Arc<EncryptionKeys>,
}

impl CachedEntry {
    fn matches(&self, password: &str, account: &str) -> bool {
        self.password.as_str() == password && self.account.as_str() == account
    }
}

#[derive(Default)]
pub struct KeyCache {
    entry: Mutex<Option<CachedEntry>>,
    derivations: AtomicU64,
}

impl KeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_entry(&self) -> MutexGuard<'_, Option<CachedEntry>> {
        self.entry.lock().unwrap_or_else(|poisoned| {
            warn!("key cache mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Returns the cached key for this exact pair, or derives and caches a new one.
    ///
    /// Derivation runs on the blocking pool with no lock held. Two callers
    /// racing on a miss both derive; whichever finishes last is kept. If the
    /// returned future is dropped mid-derivation the cache is left as it was.
    pub async fn get_or_derive(
        &self,
        password: &str,
        account: &str,
    ) -> CloudResult<Arc<EncryptionKeys>> {
        if password.is_empty() {
            return Err(CloudError::PasswordRequired);
        }

        if let Some(entry) = self.lock_entry().as_ref()
            && entry.matches(password, account)
        {
            debug!("key cache hit");
            return Ok(Arc::clone(&entry.keys));
        }

        debug!(iterations = PBKDF2_ITERATIONS, "key cache miss, deriving");
        let owned_password = Zeroizing::new(password.to_owned());
        let owned_account = Zeroizing::new(account.to_owned());

        let keys = {
            let password = owned_password.clone();
            let account = owned_account.clone();
            tokio::task::spawn_blocking(move || derive_keys(&password, &account))
                .await
                .map_err(|e| CloudError::KeyDerivation(format!("derivation task failed: {e}")))??
        };
        self.derivations.fetch_add(1, Ordering::Relaxed);

        let keys = Arc::new(keys);
        *self.lock_entry() = Some(CachedEntry {
            password: owned_password,
            account: owned_account,
            keys: Arc::clone(&keys),
        });
        Ok(keys)
    }

    /// Drops the cached key and wipes the stored credentials.
    ///
    /// Holders of an `Arc` from an earlier call keep their copy until they
    /// drop it; the key bytes are zeroized on the last drop.
    pub fn clear(&self) {
        if self.lock_entry().take().is_some() {
            debug!("key cache cleared");
        }
    }

    pub fn is_populated(&self) -> bool {
        self.lock_entry().is_some()
    }

    /// Number of derivations this cache has completed.
    pub fn derivation_count(&self) -> u64 {
        self.derivations.load(Ordering::Relaxed)
    }
}

impl Drop for KeyCache {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCache")
            .field("populated", &self.is_populated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNT: &str = "ada@example.com";

    #[tokio::test]
    async fn second_lookup_is_a_hit() {
        let cache = KeyCache::default();
        let a = cache.get_or_derive("pw-one", ACCOUNT).await.unwrap();
        let b = cache.get_or_derive("pw-one", ACCOUNT).await.unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.derivation_count(), 1);
    }

    #[tokio::test]
    async fn clear_forces_fresh_derivation() {
        let cache = KeyCache::default();
        let a = cache.get_or_derive("pw-one", ACCOUNT).await.unwrap();
        cache.clear();
        assert!(!cache.is_populated());

        let b = cache.get_or_derive("pw-one", ACCOUNT).await.unwrap();
        assert!(!Arc::ptr_eq(&a, &b), "must not hand back a stale handle");
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_eq!(cache.derivation_count(), 2);
    }

    #[tokio::test]
    async fn different_password_replaces_entry() {
        let cache = KeyCache::default();
        let a = cache.get_or_derive("pw-one", ACCOUNT).await.unwrap();
        let b = cache.get_or_derive("pw-two", ACCOUNT).await.unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());

        // Only the latest pair is remembered.
        let c = cache.get_or_derive("pw-one", ACCOUNT).await.unwrap();
        assert_eq!(cache.derivation_count(), 3);
        assert_eq!(a.as_bytes(), c.as_bytes());
    }

    #[tokio::test]
    async fn account_is_part_of_the_cache_key() {
        let cache = KeyCache::default();
        let a = cache.get_or_derive("pw", "a@example.com").await.unwrap();
        let b = cache.get_or_derive("pw", "b@example.com").await.unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[tokio::test]
    async fn empty_password_is_rejected_without_deriving() {
        let cache = KeyCache::default();
        let err = cache.get_or_derive("", ACCOUNT).await.unwrap_err();
        assert!(matches!(err, CloudError::PasswordRequired));
        assert!(!cache.is_populated());
        assert_eq!(cache.derivation_count(), 0);
    }

    #[tokio::test]
    async fn debug_does_not_show_credentials() {
        let cache = KeyCache::default();
        cache.get_or_derive("hunter2", ACCOUNT).await.unwrap();
        let dbg = format!("{cache:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(!dbg.contains(ACCOUNT));
    }
}
