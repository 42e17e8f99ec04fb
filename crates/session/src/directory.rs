//! Cached directories (branch list, role list) fed by a remote source.
//!
//! A failed fetch is logged and degrades to the last good entries (or an
//! empty list); callers never see the error.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

/// Where directory entries come from (usually an HTTP endpoint).
pub trait DirectorySource: Send + Sync {
    type Item: Clone + Send;

    fn fetch(&self) -> impl Future<Output = anyhow::Result<Vec<Self::Item>>> + Send;
}

#[derive(Debug)]
pub struct CachedDirectory<S: DirectorySource> {
    name: &'static str,
    source: S,
    cache: Mutex<Option<Vec<S::Item>>>,
}

impl<S: DirectorySource> CachedDirectory<S> {
    pub fn new(name: &'static str, source: S) -> Self {
        Self {
            name,
            source,
            cache: Mutex::new(None),
        }
    }

    /// Fetch fresh entries, caching them on success.
    pub async fn refresh(&self) -> Vec<S::Item> {
        match self.source.fetch().await {
            Ok(items) => {
                tracing::debug!(directory = self.name, entries = items.len(), "directory refreshed");
                *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = Some(items.clone());
                items
            }
            Err(err) => {
                let cached = self.cached();
                tracing::warn!(
                    directory = self.name,
                    error = %err,
                    cached = cached.len(),
                    "directory fetch failed; serving cached entries"
                );
                cached
            }
        }
    }

    /// Last good entries without fetching.
    pub fn cached(&self) -> Vec<S::Item> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_default()
    }

    pub fn is_loaded(&self) -> bool {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use scholaris_core::{BranchId, BranchSummary};

    use super::*;

    struct FlakyBranches {
        fail: AtomicBool,
    }

    impl DirectorySource for FlakyBranches {
        type Item = BranchSummary;

        async fn fetch(&self) -> anyhow::Result<Vec<BranchSummary>> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("connection refused");
            }
            Ok(vec![BranchSummary {
                id: BranchId::from_u128(1),
                name: "North".to_string(),
            }])
        }
    }

    fn directory(fail: bool) -> CachedDirectory<FlakyBranches> {
        CachedDirectory::new("branches", FlakyBranches { fail: AtomicBool::new(fail) })
    }

    #[tokio::test]
    async fn failure_without_cache_is_empty() {
        let branches = directory(true);
        assert!(branches.refresh().await.is_empty());
        assert!(!branches.is_loaded());
    }

    #[tokio::test]
    async fn failure_serves_last_good_entries() {
        let branches = directory(false);
        assert_eq!(branches.refresh().await.len(), 1);

        branches.source.fail.store(true, Ordering::SeqCst);
        let served = branches.refresh().await;
        assert_eq!(served.len(), 1);
        assert_eq!(served[0].name, "North");
        assert!(branches.is_loaded());
    }
}
