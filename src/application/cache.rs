//! Time-to-live memoization with single-flight loading.
//!
//! A value younger than the TTL is returned without running the producer.
//! Otherwise at most one caller per key runs the producer; concurrent callers
//! wait for it, unless an expired value exists, which they get immediately.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::trace;

struct Slot<V> {
    value: Option<(Arc<V>, Instant)>,
    loading: bool,
    /// Bumped by invalidation; a load started under an older generation is not stored
    generation: u64,
}

impl<V> Slot<V> {
    fn empty() -> Self {
        Self {
            value: None,
            loading: false,
            generation: 0,
        }
    }

    fn discard(&mut self) {
        self.value = None;
        self.generation = self.generation.wrapping_add(1);
    }
}

/// Key-value cache whose entries expire after a fixed TTL.
pub struct TtlCache<K, V> {
    ttl: Duration,
    slots: Mutex<HashMap<K, Slot<V>>>,
    loaded: Condvar,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
            loaded: Condvar::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached value for `key`, loading it with `producer` if needed.
    ///
    /// Producer errors are returned to the caller that ran it and are not cached.
    pub fn get_or_try_insert_with<E, F>(&self, key: K, producer: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let mut slots = self.lock();
        let generation = loop {
            let slot = slots.entry(key.clone()).or_insert_with(Slot::empty);
            if let Some((value, stored_at)) = &slot.value {
                if stored_at.elapsed() < self.ttl {
                    trace!("cache hit");
                    return Ok(Arc::clone(value));
                }
                if slot.loading {
                    trace!("stale value served while refresh is in flight");
                    return Ok(Arc::clone(value));
                }
            }
            if !slot.loading {
                slot.loading = true;
                break slot.generation;
            }
            slots = self
                .loaded
                .wait(slots)
                .unwrap_or_else(PoisonError::into_inner);
        };
        drop(slots);

        // Clears the loading flag on every exit, panics included
        let _release = LoadRelease {
            cache: self,
            key: key.clone(),
        };
        trace!("cache miss, running producer");
        let value = Arc::new(producer()?);
        match self.lock().get_mut(&key) {
            Some(slot) if slot.generation == generation => {
                slot.value = Some((Arc::clone(&value), Instant::now()));
            }
            _ => trace!("invalidated while loading, value not stored"),
        }
        Ok(value)
    }

    /// Drop the value stored for `key`, including one still being loaded.
    pub fn invalidate(&self, key: &K) {
        let mut slots = self.lock();
        let in_flight = match slots.get_mut(key) {
            Some(slot) => {
                slot.discard();
                slot.loading
            }
            None => return,
        };
        if !in_flight {
            slots.remove(key);
        }
    }

    /// Drop every stored value, including those still being loaded.
    pub fn clear(&self) {
        let mut slots = self.lock();
        slots.retain(|_, slot| slot.loading);
        slots.values_mut().for_each(Slot::discard);
    }

    /// Number of keys holding a value, fresh or stale.
    pub fn len(&self) -> usize {
        self.lock().values().filter(|s| s.value.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Slot<V>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct LoadRelease<'a, K, V>
where
    K: Eq + Hash + Clone,
{
    cache: &'a TtlCache<K, V>,
    key: K,
}

impl<K, V> Drop for LoadRelease<'_, K, V>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        let mut slots = self.cache.lock();
        let remove = match slots.get_mut(&self.key) {
            Some(slot) => {
                slot.loading = false;
                slot.value.is_none()
            }
            None => false,
        };
        if remove {
            slots.remove(&self.key);
        }
        drop(slots);
        self.cache.loaded.notify_all();
    }
}
