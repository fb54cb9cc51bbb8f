//! Round-robin API key rotation

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::error::CatalogError;

/// The configured API keys and the index of the one in use.
///
/// The index is shared by every request, so a key that ran out of quota
/// stays skipped for later calls too.
#[derive(Debug)]
pub struct ApiKeyRing {
    keys: Vec<String>,
    current: AtomicUsize,
}

impl ApiKeyRing {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            current: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn current_index(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    fn current_key(&self) -> Option<String> {
        self.keys.get(self.current_index()).cloned()
    }

    /// Advance to the next key and return its index.
    pub fn rotate(&self) -> usize {
        let len = self.len().max(1);
        let next = (self.current_index() + 1) % len;
        self.current.store(next, Ordering::SeqCst);
        next
    }

    /// Run `attempt` with the current key, moving on to the next key each
    /// time it reports `QuotaExceeded`. Every key is tried at most once.
    /// `Ok(None)` means all keys are exhausted.
    pub async fn with_rotation<T, F, Fut>(
        &self,
        operation: &'static str,
        mut attempt: F,
    ) -> Result<Option<T>, CatalogError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, CatalogError>>,
    {
        for _ in 0..self.len() {
            let Some(key) = self.current_key() else {
                break;
            };
            match attempt(key).await {
                Err(CatalogError::QuotaExceeded) => {
                    let next = self.rotate();
                    tracing::warn!(operation, key_index = next, "Quota exceeded, switched to next API key");
                }
                other => return other.map(Some),
            }
        }
        tracing::error!(operation, keys = self.len(), "All catalog API keys have exceeded their quota");
        Ok(None)
    }
}
