//! In-process store.

use std::collections::HashMap;
use std::time::Duration;

use callward_core::CallSignal;
use tokio::sync::RwLock;
use tokio::time::Instant;

#[cfg(feature = "metrics")]
use metrics::counter;

#[cfg(feature = "tracing")]
use tracing::{debug, info};

use crate::error::CacheError;
use crate::store::{bounded, KeyedStore};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// A [`KeyedStore`] backed by a `HashMap`, with optional per-entry TTL.
#[derive(Debug)]
pub struct MemoryStore<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    name: String,
}

impl<V> MemoryStore<V> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of entries, including ones that expired but were not yet
    /// purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drops expired entries and returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    #[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
    fn record(&self, result: &'static str) {
        #[cfg(feature = "metrics")]
        counter!("cache_requests_total", "cache" => self.name.clone(), "result" => result)
            .increment(1);
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new("<unnamed>")
    }
}

impl<V> KeyedStore<V> for MemoryStore<V>
where
    V: Clone + Send + Sync,
{
    async fn get(&self, signal: &CallSignal, key: &str, timeout: Duration) -> Result<V, CacheError> {
        let result = bounded(signal, timeout, async {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(Instant::now()) => Ok(entry.value.clone()),
                _ => Err(CacheError::Miss),
            }
        })
        .await;

        match &result {
            Ok(_) => self.record("hit"),
            Err(CacheError::Miss) => {
                self.record("miss");
                #[cfg(feature = "tracing")]
                debug!(cache = %self.name, key, "Cache miss");
            }
            Err(_) => self.record("error"),
        }
        result
    }

    async fn set(
        &self,
        signal: &CallSignal,
        key: &str,
        value: V,
        ttl: Option<Duration>,
        timeout: Duration,
    ) -> Result<(), CacheError> {
        bounded(signal, timeout, async {
            let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
            self.entries
                .write()
                .await
                .insert(key.to_string(), CacheEntry { value, expires_at });
            Ok(())
        })
        .await
    }

    async fn delete(&self, signal: &CallSignal, key: &str, timeout: Duration) -> Result<(), CacheError> {
        bounded(signal, timeout, async {
            self.entries.write().await.remove(key);
            Ok(())
        })
        .await?;

        #[cfg(feature = "tracing")]
        info!(cache = %self.name, key, "Cache invalidated for key");
        Ok(())
    }
}
