//! Shared Field Channel: the per-account key/value store used as the only
//! message-passing medium between the calling and handling contexts.
//!
//! Entries are never locked across calls. Safety relies on every call using a
//! fresh correlation key, with each key acting as a single-writer-then-single-reader
//! cell.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

use crate::error::ChannelError;

/// Default retention for entries in [`MemoryFieldChannel`].
pub const DEFAULT_ENTRY_TTL: Duration = Duration::from_secs(5 * 60);

/// Host-provided key/value store scoped by namespace.
#[async_trait]
pub trait FieldChannel: Send + Sync + 'static {
    /// Reads the value at `(namespace, key)`; an absent key is `Ok(None)`, not an error.
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>, ChannelError>;

    async fn set(&self, namespace: &str, key: &str, value: Value) -> Result<(), ChannelError>;

    /// Removes the value at `(namespace, key)`. Clearing an absent key succeeds.
    async fn clear(&self, namespace: &str, key: &str) -> Result<(), ChannelError>;
}

#[async_trait]
impl<C: FieldChannel + ?Sized> FieldChannel for Arc<C> {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>, ChannelError> {
        (**self).get(namespace, key).await
    }

    async fn set(&self, namespace: &str, key: &str, value: Value) -> Result<(), ChannelError> {
        (**self).set(namespace, key, value).await
    }

    async fn clear(&self, namespace: &str, key: &str) -> Result<(), ChannelError> {
        (**self).clear(namespace, key).await
    }
}

/// Clears `(namespace, key)`, logging and swallowing any failure.
pub async fn clear_best_effort<C: FieldChannel + ?Sized>(channel: &C, namespace: &str, key: &str) {
    if let Err(error) = channel.clear(namespace, key).await {
        tracing::warn!(namespace, key, %error, "ignoring field channel clear failure");
    }
}

#[derive(Debug, Clone)]
struct StoredEntry {
    value: Value,
    expires_at: Instant,
}

type EntryMap = HashMap<(String, String), StoredEntry>;

/// In-process [`FieldChannel`] whose entries expire after a retention window.
///
/// Expiry keeps an abandoned call (for example one that timed out before the
/// handler wrote its envelope) from leaving a permanent orphan behind.
#[derive(Debug, Clone)]
pub struct MemoryFieldChannel {
    entries: Arc<Mutex<EntryMap>>,
    ttl: Duration,
}

impl Default for MemoryFieldChannel {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_ENTRY_TTL)
    }
}

impl MemoryFieldChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns true when a live (unexpired) entry exists at `(namespace, key)`.
    #[must_use]
    pub fn contains(&self, namespace: &str, key: &str) -> bool {
        let now = Instant::now();
        lock_unpoisoned(&self.entries)
            .get(&entry_key(namespace, key))
            .is_some_and(|entry| entry.expires_at > now)
    }

    /// Number of stored entries, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        lock_unpoisoned(&self.entries).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        purge_stale(&mut lock_unpoisoned(&self.entries), Instant::now())
    }
}

fn purge_stale(entries: &mut EntryMap, now: Instant) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| entry.expires_at > now);
    before - entries.len()
}

#[async_trait]
impl FieldChannel for MemoryFieldChannel {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>, ChannelError> {
        let now = Instant::now();
        let map_key = entry_key(namespace, key);
        let mut entries = lock_unpoisoned(&self.entries);

        match entries.get(&map_key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(&map_key);
                tracing::debug!(namespace, key, "expired field channel entry purged on read");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Stores `value`, first dropping every entry whose retention has lapsed.
    async fn set(&self, namespace: &str, key: &str, value: Value) -> Result<(), ChannelError> {
        let now = Instant::now();
        let mut entries = lock_unpoisoned(&self.entries);
        let purged = purge_stale(&mut entries, now);
        if purged > 0 {
            tracing::debug!(namespace, purged, "expired field channel entries purged on write");
        }
        entries.insert(
            entry_key(namespace, key),
            StoredEntry {
                value,
                expires_at: now + self.ttl,
            },
        );
        Ok(())
    }

    async fn clear(&self, namespace: &str, key: &str) -> Result<(), ChannelError> {
        lock_unpoisoned(&self.entries).remove(&entry_key(namespace, key));
        Ok(())
    }
}

fn entry_key(namespace: &str, key: &str) -> (String, String) {
    (namespace.to_owned(), key.to_owned())
}

pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
