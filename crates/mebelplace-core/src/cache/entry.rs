// ── Cache entry bookkeeping ──

use std::any::Any;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

/// Observable state of one cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum EntryState {
    /// A value is cached and no invalidation has touched it since.
    Fresh,
    /// Invalidated or never successfully fetched; the next read fetches.
    Stale,
    /// A fetch is in flight for the current generation.
    Fetching,
}

pub(crate) type AnyValue = Arc<dyn Any + Send + Sync>;

/// The fetch currently owning an entry. Dropping it wakes every reader
/// waiting on [`Entry::subscribe`].
struct InFlight {
    generation: u64,
    done: watch::Sender<()>,
}

#[derive(Default)]
pub(crate) struct Entry {
    pub(crate) value: Option<AnyValue>,
    pub(crate) fetched_at: Option<DateTime<Utc>>,
    pub(crate) stale: bool,
    /// Replaced by every fetch start, invalidation and direct write with a
    /// value from the cache-wide counter, so it never repeats for a key even
    /// after the entry is dropped and recreated. Only a fetch holding the
    /// current generation may commit.
    pub(crate) generation: u64,
    in_flight: Option<InFlight>,
}

impl Entry {
    pub(crate) fn state(&self) -> EntryState {
        if self.in_flight.is_some() {
            EntryState::Fetching
        } else if self.value.is_some() && !self.stale {
            EntryState::Fresh
        } else {
            EntryState::Stale
        }
    }

    /// The cached value, if fresh and of type `T`.
    pub(crate) fn fresh<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        if self.stale {
            return None;
        }
        self.value
            .as_ref()
            .and_then(|v| Arc::clone(v).downcast::<T>().ok())
    }

    pub(crate) fn begin_fetch(&mut self, generation: u64) -> u64 {
        self.generation = generation;
        self.in_flight = Some(InFlight {
            generation,
            done: watch::channel(()).0,
        });
        generation
    }

    /// A receiver that closes when the in-flight fetch ends, if one is running.
    pub(crate) fn subscribe(&self) -> Option<watch::Receiver<()>> {
        self.in_flight.as_ref().map(|fetch| fetch.done.subscribe())
    }

    /// Store a fetched value. Returns `false` if a newer generation owns the entry.
    pub(crate) fn commit(&mut self, generation: u64, value: AnyValue, now: DateTime<Utc>) -> bool {
        if self.generation != generation {
            return false;
        }
        self.value = Some(value);
        self.fetched_at = Some(now);
        self.stale = false;
        self.in_flight = None;
        true
    }

    pub(crate) fn abandon(&mut self, generation: u64) {
        if self
            .in_flight
            .as_ref()
            .is_some_and(|fetch| fetch.generation == generation)
        {
            self.in_flight = None;
        }
    }

    pub(crate) fn write(&mut self, generation: u64, value: AnyValue, now: DateTime<Utc>) {
        self.generation = generation;
        self.value = Some(value);
        self.fetched_at = Some(now);
        self.stale = false;
        self.in_flight = None;
    }

    pub(crate) fn invalidate(&mut self, generation: u64) {
        self.generation = generation;
        self.stale = true;
        self.in_flight = None;
    }
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("state", &self.state())
            .field("fetched_at", &self.fetched_at)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
