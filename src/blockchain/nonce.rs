//! Best-effort nonce cache for sequential submission.
//!
//! The node is the source of truth. The cache only saves a round trip
//! between back-to-back transactions and is dropped whenever the node
//! disagrees with it.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::blockchain::types::BlockchainResult;
use crate::observability::metrics;

#[derive(Debug, Default)]
struct NonceState {
    value: Option<u64>,
    refreshed_at: Option<Instant>,
}

/// In-memory nonce cache with a freshness window.
#[derive(Debug)]
pub struct NonceManager {
    state: Mutex<NonceState>,
    ttl: Duration,
}

impl NonceManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: Mutex::new(NonceState::default()),
            ttl,
        }
    }

    /// Return the nonce to use next.
    ///
    /// Uses the cached value when present, younger than the TTL and not
    /// force-refreshed; otherwise calls `fetch` and caches its result.
    pub async fn current<F, Fut>(&self, force_refresh: bool, fetch: F) -> BlockchainResult<u64>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = BlockchainResult<u64>>,
    {
        let mut state = self.state.lock().await;

        let fresh = state
            .refreshed_at
            .map(|at| at.elapsed() < self.ttl)
            .unwrap_or(false);

        if let (false, true, Some(value)) = (force_refresh, fresh, state.value) {
            return Ok(value);
        }

        let reason = if force_refresh {
            "forced"
        } else if state.value.is_none() {
            "empty"
        } else {
            "expired"
        };

        let value = fetch().await?;
        metrics::record_nonce_refresh(reason);
        tracing::debug!(nonce = value, reason, "Refreshed nonce from node");

        state.value = Some(value);
        state.refreshed_at = Some(Instant::now());
        Ok(value)
    }

    /// Bump the cached nonce after a confirmed transaction.
    pub async fn advance(&self) {
        let mut state = self.state.lock().await;
        if let Some(value) = state.value.as_mut() {
            *value += 1;
        }
    }

    /// Drop the cached nonce so the next call reads from the node.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        state.value = None;
        state.refreshed_at = None;
    }

    pub async fn cached(&self) -> Option<u64> {
        self.state.lock().await.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    async fn fetch_counting(calls: &AtomicU32, value: u64) -> BlockchainResult<u64> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    #[tokio::test]
    async fn test_cached_value_reused_within_ttl() {
        let manager = NonceManager::new(Duration::from_secs(30));
        let calls = AtomicU32::new(0);

        assert_eq!(manager.current(false, || fetch_counting(&calls, 7)).await.unwrap(), 7);
        assert_eq!(manager.current(false, || fetch_counting(&calls, 99)).await.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_reads_node() {
        let manager = NonceManager::new(Duration::from_secs(30));
        let calls = AtomicU32::new(0);

        manager.current(false, || fetch_counting(&calls, 7)).await.unwrap();
        assert_eq!(manager.current(true, || fetch_counting(&calls, 9)).await.unwrap(), 9);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_value_refetched() {
        let manager = NonceManager::new(Duration::ZERO);
        let calls = AtomicU32::new(0);

        manager.current(false, || fetch_counting(&calls, 1)).await.unwrap();
        assert_eq!(manager.current(false, || fetch_counting(&calls, 2)).await.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_advance_and_invalidate() {
        let manager = NonceManager::new(Duration::from_secs(30));
        manager.advance().await;
        assert_eq!(manager.cached().await, None);

        manager.current(false, || async { Ok(4) }).await.unwrap();
        manager.advance().await;
        assert_eq!(manager.cached().await, Some(5));
        assert_eq!(manager.current(false, || async { Ok(0) }).await.unwrap(), 5);

        manager.invalidate().await;
        assert_eq!(manager.cached().await, None);
        assert_eq!(manager.current(false, || async { Ok(11) }).await.unwrap(), 11);
    }

    #[tokio::test]
    async fn test_fetch_error_leaves_cache_untouched() {
        let manager = NonceManager::new(Duration::ZERO);
        manager.current(false, || async { Ok(3) }).await.unwrap();

        let result = manager
            .current(true, || async {
                Err(crate::blockchain::BlockchainError::Rpc("down".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(manager.cached().await, Some(3));
    }
}
