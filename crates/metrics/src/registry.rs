//! Reference-counted stats registry
//!
//! Several throttlers configured with the same stats name share one
//! `ThrottlerStats`. The entry lives as long as at least one holder has
//! not released it. Components receive the registry as
//! `Arc<dyn StatsRegistry>`, so tests can substitute their own.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::ThrottlerStats;

/// A registration of stats under a name
///
/// Returned by [`StatsRegistry::acquire`]. Give it back with
/// [`StatsRegistry::release`]; the stats stay readable through the handle
/// after release.
#[derive(Debug)]
pub struct StatsHandle {
    name: String,
    stats: Arc<ThrottlerStats>,
    released: AtomicBool,
}

impl StatsHandle {
    /// Wrap registered stats
    pub fn new(name: impl Into<String>, stats: Arc<ThrottlerStats>) -> Self {
        Self {
            name: name.into(),
            stats,
            released: AtomicBool::new(false),
        }
    }

    /// Registration name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shared counters
    #[inline]
    pub fn stats(&self) -> &Arc<ThrottlerStats> {
        &self.stats
    }

    /// Mark the handle released, returning false if it already was
    pub fn mark_released(&self) -> bool {
        !self.released.swap(true, Ordering::AcqRel)
    }

    /// Whether the handle has been released
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

/// Registry of throttler stats keyed by name
pub trait StatsRegistry: Send + Sync {
    /// Register interest in `name`, creating the stats on first use
    fn acquire(&self, name: &str) -> StatsHandle;

    /// Give back a handle; the entry is dropped with its last holder
    ///
    /// Releasing the same handle twice is a no-op.
    fn release(&self, handle: &StatsHandle);

    /// Number of unreleased handles for `name`
    fn ref_count(&self, name: &str) -> usize;

    /// Stats registered under `name`, if any
    fn get(&self, name: &str) -> Option<Arc<ThrottlerStats>>;

    /// Registered names, sorted
    fn names(&self) -> Vec<String>;
}

#[derive(Debug)]
struct Entry {
    stats: Arc<ThrottlerStats>,
    refs: usize,
}

/// In-process registry shared by every appender of a process
#[derive(Debug, Default)]
pub struct SharedStatsRegistry {
    entries: Mutex<HashMap<String, Entry>>,
}

impl SharedStatsRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry ready for injection
    pub fn shared() -> Arc<dyn StatsRegistry> {
        Arc::new(Self::new())
    }

    /// Number of registered names
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl StatsRegistry for SharedStatsRegistry {
    fn acquire(&self, name: &str) -> StatsHandle {
        let mut entries = self.entries.lock();
        let entry = entries.entry(name.to_string()).or_insert_with(|| Entry {
            stats: Arc::new(ThrottlerStats::new()),
            refs: 0,
        });
        entry.refs += 1;

        debug!(stats = name, refs = entry.refs, "stats acquired");

        StatsHandle::new(name, Arc::clone(&entry.stats))
    }

    fn release(&self, handle: &StatsHandle) {
        if !handle.mark_released() {
            warn!(stats = handle.name(), "stats handle released twice");
            return;
        }

        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(handle.name()) else {
            warn!(stats = handle.name(), "released stats are not registered");
            return;
        };

        // A name re-registered after its last release holds different stats
        if !Arc::ptr_eq(&entry.stats, handle.stats()) {
            warn!(stats = handle.name(), "released stats belong to a previous registration");
            return;
        }

        entry.refs -= 1;
        debug!(stats = handle.name(), refs = entry.refs, "stats released");

        if entry.refs == 0 {
            entries.remove(handle.name());
        }
    }

    fn ref_count(&self, name: &str) -> usize {
        self.entries.lock().get(name).map_or(0, |e| e.refs)
    }

    fn get(&self, name: &str) -> Option<Arc<ThrottlerStats>> {
        self.entries.lock().get(name).map(|e| Arc::clone(&e.stats))
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;
