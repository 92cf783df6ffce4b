#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use field_bridge::{ChannelError, FieldChannel};
use serde_json::Value;

/// Channel double that counts operations and can publish a value after N reads.
#[derive(Default)]
pub struct ScriptedChannel {
    entries: Mutex<HashMap<(String, String), Value>>,
    gets: AtomicUsize,
    sets: AtomicUsize,
    clears: AtomicUsize,
    publish_after: Mutex<Option<(usize, Value)>>,
    published: AtomicBool,
    fail_clears: bool,
    fail_gets: bool,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next key read return `value` starting with read number `reads`.
    pub fn publish_on_read(reads: usize, value: Value) -> Self {
        Self {
            publish_after: Mutex::new(Some((reads, value))),
            ..Self::default()
        }
    }

    pub fn failing_clears() -> Self {
        Self {
            fail_clears: true,
            ..Self::default()
        }
    }

    pub fn failing_gets() -> Self {
        Self {
            fail_gets: true,
            ..Self::default()
        }
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::Acquire)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::Acquire)
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::Acquire)
    }

    pub fn stored_keys(&self) -> Vec<(String, String)> {
        lock_unpoisoned(&self.entries).keys().cloned().collect()
    }

    pub fn insert(&self, namespace: &str, key: &str, value: Value) {
        lock_unpoisoned(&self.entries).insert((namespace.to_owned(), key.to_owned()), value);
    }
}

#[async_trait]
impl FieldChannel for ScriptedChannel {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>, ChannelError> {
        let read = self.gets.fetch_add(1, Ordering::AcqRel) + 1;
        if self.fail_gets {
            return Err(ChannelError::new("get", namespace, key, "store offline"));
        }

        let mut entries = lock_unpoisoned(&self.entries);
        if let Some((after, value)) = lock_unpoisoned(&self.publish_after).as_ref() {
            if read >= *after {
                if !self.published.swap(true, Ordering::AcqRel) {
                    entries.insert((namespace.to_owned(), key.to_owned()), value.clone());
                }
            }
        }

        Ok(entries
            .get(&(namespace.to_owned(), key.to_owned()))
            .cloned())
    }

    async fn set(&self, namespace: &str, key: &str, value: Value) -> Result<(), ChannelError> {
        self.sets.fetch_add(1, Ordering::AcqRel);
        self.insert(namespace, key, value);
        Ok(())
    }

    async fn clear(&self, namespace: &str, key: &str) -> Result<(), ChannelError> {
        self.clears.fetch_add(1, Ordering::AcqRel);
        if self.fail_clears {
            return Err(ChannelError::new("clear", namespace, key, "permission denied"));
        }
        lock_unpoisoned(&self.entries).remove(&(namespace.to_owned(), key.to_owned()));
        Ok(())
    }
}

pub fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
