// ── Query cache ──
//
// Key-addressed, type-erased storage for server data. Invalidation is lazy:
// it only marks entries stale, the next read refetches. Every fetch, write
// and invalidation takes a generation from one cache-wide counter, and only
// the holder of an entry's current generation may commit, so a late response
// never overwrites a newer one, even across `clear`. Concurrent readers of a
// key share its in-flight fetch.

mod entry;
mod key;

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

pub use entry::EntryState;
pub use key::{KeyPart, QueryKey};

use entry::{AnyValue, Entry};

use crate::error::CoreError;

/// Concurrent query cache shared by everything that reads server data.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: DashMap<QueryKey, Entry>,
    generations: AtomicU64,
}

/// What a reader does after inspecting an entry under its lock.
enum Claim<T> {
    Hit(Arc<T>),
    Join(watch::Receiver<()>),
    Lead(u64),
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Return the fresh cached value for `key`, or run `fetch` and cache it.
    ///
    /// A fresh hit performs no call. A cached value of a different type
    /// than `T` counts as a miss.
    pub async fn read<T, F, Fut>(&self, key: &QueryKey, fetch: F) -> Result<Arc<T>, CoreError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, mebelplace_api::Error>>,
    {
        self.read_until(key, &CancellationToken::new(), fetch).await
    }

    /// Like [`read`](Self::read), abandoning the fetch once `cancel` fires.
    ///
    /// A cancelled fetch is dropped mid-flight and nothing is applied to
    /// the cache. If another reader is already fetching `key`, this read
    /// waits for that fetch and returns its value instead of calling
    /// `fetch`; should that fetch fail or be abandoned, this read fetches
    /// on its own.
    pub async fn read_until<T, F, Fut>(
        &self,
        key: &QueryKey,
        cancel: &CancellationToken,
        fetch: F,
    ) -> Result<Arc<T>, CoreError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, mebelplace_api::Error>>,
    {
        if let Some(hit) = self.fresh::<T>(key) {
            trace!(%key, "cache hit");
            return Ok(hit);
        }
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }

        let generation = loop {
            match self.claim::<T>(key) {
                Claim::Hit(hit) => return Ok(hit),
                Claim::Lead(generation) => break generation,
                Claim::Join(mut done) => {
                    trace!(%key, "joining in-flight fetch");
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(CoreError::Cancelled),
                        // Closes when the other fetch commits or gives up.
                        _ = done.changed() => {}
                    }
                }
            }
        };
        let mut guard = FetchGuard {
            entries: &self.entries,
            key,
            generation,
            armed: true,
        };
        debug!(%key, generation, "cache miss, fetching");

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(%key, generation, "fetch cancelled");
                return Err(CoreError::Cancelled);
            }
            outcome = fetch() => outcome,
        };

        let value = Arc::new(outcome?);
        guard.armed = false;

        let erased: AnyValue = value.clone();
        let committed = self
            .entries
            .get_mut(key)
            .is_some_and(|mut entry| entry.commit(generation, erased, Utc::now()));
        if !committed {
            debug!(%key, generation, "superseded while fetching, result not cached");
        }
        Ok(value)
    }

    /// The cached value regardless of freshness, without fetching.
    pub fn peek<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let entry = self.entries.get(key)?;
        let value = entry.value.as_ref()?;
        Arc::clone(value).downcast::<T>().ok()
    }

    pub fn state(&self, key: &QueryKey) -> Option<EntryState> {
        self.entries.get(key).map(|entry| entry.state())
    }

    pub fn fetched_at(&self, key: &QueryKey) -> Option<DateTime<Utc>> {
        self.entries.get(key).and_then(|entry| entry.fetched_at)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn claim<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Claim<T> {
        let mut entry = self.entries.entry(key.clone()).or_default();
        if let Some(hit) = entry.fresh::<T>() {
            return Claim::Hit(hit);
        }
        if let Some(done) = entry.subscribe() {
            return Claim::Join(done);
        }
        Claim::Lead(entry.begin_fetch(self.next_generation()))
    }

    fn fresh<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let entry = self.entries.get(key)?;
        let hit = entry.fresh::<T>();
        if hit.is_none() && entry.state() == EntryState::Fresh {
            debug!(%key, "cached value has a different type, treating as miss");
        }
        hit
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Seed `key` with a fresh value, superseding any in-flight fetch.
    pub fn set<T: Send + Sync + 'static>(&self, key: &QueryKey, value: T) -> Arc<T> {
        let value = Arc::new(value);
        let erased: AnyValue = value.clone();
        self.entries
            .entry(key.clone())
            .or_default()
            .write(self.next_generation(), erased, Utc::now());
        trace!(%key, "cache entry set");
        value
    }

    /// Mark every entry in the family named by `prefix` stale.
    ///
    /// Synchronous and network-free. Returns the number of entries touched.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut touched = 0;
        for mut entry in self.entries.iter_mut() {
            if entry.key().starts_with(prefix) {
                entry.value_mut().invalidate(self.next_generation());
                touched += 1;
            }
        }
        debug!(family = %prefix, touched, "invalidated");
        touched
    }

    /// Run a mutation and, only if it succeeds, invalidate each family.
    pub async fn mutate<T, Fut>(&self, invalidates: &[QueryKey], mutation: Fut) -> Result<T, CoreError>
    where
        Fut: Future<Output = Result<T, mebelplace_api::Error>>,
    {
        match mutation.await {
            Ok(value) => {
                for family in invalidates {
                    self.invalidate(family);
                }
                Ok(value)
            }
            Err(e) => {
                debug!(error = %e, "mutation failed, nothing invalidated");
                Err(e.into())
            }
        }
    }

    /// Drop every entry. In-flight fetches finish but no longer commit, even
    /// if a new fetch of the same key has started since.
    pub fn clear(&self) {
        self.entries.clear();
        debug!("query cache cleared");
    }
}

/// Releases the `Fetching` marker if a fetch ends without committing
/// (error, cancellation, or the read future being dropped).
struct FetchGuard<'a> {
    entries: &'a DashMap<QueryKey, Entry>,
    key: &'a QueryKey,
    generation: u64,
    armed: bool,
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(mut entry) = self.entries.get_mut(self.key) {
            entry.abandon(self.generation);
        }
    }
}
