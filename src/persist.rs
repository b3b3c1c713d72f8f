//! Persistence boundary.
//!
//! The grid never performs I/O itself. It hands encoded records to a
//! [`RecordStore`] owned by the caller, and a [`PersistScheduler`] decides
//! when: bursts of edits coalesce into one write, and at most one write is in
//! flight at a time. The in-memory table stays the source of truth; a failed
//! or cancelled write never rolls anything back.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

/// Default quiet period after the last edit before a write is issued.
pub const DEFAULT_COALESCE_MS: f64 = 250.0;

/// Opaque key-value byte store (localStorage, IndexedDB, a file, ...).
pub trait RecordStore {
    /// Load the record under `key`, if any.
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replace the record under `key`.
    fn save(&mut self, key: &str, bytes: &[u8]) -> Result<()>;
}

/// In-memory [`RecordStore`], for tests and memory-only mode.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    records: HashMap<String, Vec<u8>>,
    /// When set, every `save` fails with this message.
    pub fail_with: Option<String>,
}

impl MemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordStore for MemoryRecordStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.records.get(key).cloned())
    }

    fn save(&mut self, key: &str, bytes: &[u8]) -> Result<()> {
        if let Some(msg) = &self.fail_with {
            return Err(GridError::Store(msg.clone()));
        }
        self.records.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// Persistence settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistConfig {
    /// Key of the table's record in the store.
    pub table_id: String,
    pub coalesce_ms: f64,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            table_id: "grid".to_string(),
            coalesce_ms: DEFAULT_COALESCE_MS,
        }
    }
}

/// Token for one in-flight write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistTicket(u64);

/// Where the scheduler stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PersistState {
    /// Nothing to write.
    Clean,
    /// Edits waiting for the coalescing window to close.
    Pending,
    /// A write is out; more edits may be queued behind it.
    InFlight { queued: bool },
}

/// Counters for the persistence boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistStats {
    pub writes: u64,
    pub failures: u64,
    pub cancelled: u64,
    pub last_bytes: usize,
    /// Time from ticket issue to completion of the last finished write.
    pub last_duration_ms: f64,
    pub last_error: Option<String>,
}

/// Clock-driven coalescing write scheduler.
///
/// Single-threaded: the caller supplies `now` in milliseconds on every call.
#[derive(Debug, Clone)]
pub struct PersistScheduler {
    coalesce_ms: f64,
    dirty: bool,
    deadline: f64,
    in_flight: Option<(PersistTicket, f64)>,
    next_ticket: u64,
    stats: PersistStats,
}

impl PersistScheduler {
    #[must_use]
    pub fn new(coalesce_ms: f64) -> Self {
        Self {
            coalesce_ms: coalesce_ms.max(0.0),
            dirty: false,
            deadline: 0.0,
            in_flight: None,
            next_ticket: 0,
            stats: PersistStats::default(),
        }
    }

    /// Record a mutation at `now`; restarts the coalescing window.
    pub fn note_mutation(&mut self, now: f64) {
        self.dirty = true;
        self.deadline = now + self.coalesce_ms;
    }

    /// Issue a write ticket if the window has closed and nothing is in flight.
    ///
    /// The caller should snapshot the table right after receiving the ticket,
    /// so the write carries the latest state.
    pub fn poll(&mut self, now: f64) -> Option<PersistTicket> {
        if !self.dirty || self.in_flight.is_some() || now < self.deadline {
            return None;
        }
        let ticket = PersistTicket(self.next_ticket);
        self.next_ticket += 1;
        self.dirty = false;
        self.in_flight = Some((ticket, now));
        Some(ticket)
    }

    /// Report the outcome of a write at `now`. Returns `false` for a stale
    /// ticket, which is ignored.
    ///
    /// A failure re-arms the scheduler so a later poll retries with fresh data.
    pub fn complete(
        &mut self,
        ticket: PersistTicket,
        outcome: std::result::Result<usize, String>,
        now: f64,
    ) -> bool {
        let issued_at = match self.in_flight {
            Some((current, issued_at)) if current == ticket => issued_at,
            _ => {
                log::debug!("ignoring stale persist ticket {ticket:?}");
                return false;
            }
        };
        self.in_flight = None;
        self.stats.last_duration_ms = (now - issued_at).max(0.0);
        match outcome {
            Ok(bytes) => {
                self.stats.writes += 1;
                self.stats.last_bytes = bytes;
                self.stats.last_error = None;
            }
            Err(message) => {
                log::warn!("persist failed, keeping data in memory: {message}");
                self.stats.failures += 1;
                self.stats.last_error = Some(message);
                self.dirty = true;
            }
        }
        true
    }

    /// Drop the in-flight write without waiting for it.
    ///
    /// Its data is treated as unwritten; the next poll writes again.
    pub fn cancel(&mut self) {
        if self.in_flight.take().is_some() {
            self.stats.cancelled += 1;
            self.dirty = true;
        }
    }

    #[must_use]
    pub fn state(&self) -> PersistState {
        match (self.in_flight, self.dirty) {
            (Some(_), queued) => PersistState::InFlight { queued },
            (None, true) => PersistState::Pending,
            (None, false) => PersistState::Clean,
        }
    }

    #[must_use]
    pub fn stats(&self) -> &PersistStats {
        &self.stats
    }
}

impl Default for PersistScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_COALESCE_MS)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_coalesces_into_one_write() {
        let mut sched = PersistScheduler::new(100.0);
        for t in 0..10 {
            sched.note_mutation(f64::from(t) * 10.0);
            assert_eq!(sched.poll(f64::from(t) * 10.0), None);
        }
        assert_eq!(sched.poll(150.0), None);
        let ticket = sched.poll(190.0).unwrap();
        assert_eq!(sched.poll(500.0), None);
        assert!(sched.complete(ticket, Ok(42), 230.0));
        assert_eq!(sched.state(), PersistState::Clean);
        assert_eq!(sched.stats().writes, 1);
        assert_eq!(sched.stats().last_bytes, 42);
        assert!((sched.stats().last_duration_ms - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_edits_during_flight_queue_one_followup() {
        let mut sched = PersistScheduler::new(0.0);
        sched.note_mutation(0.0);
        let first = sched.poll(0.0).unwrap();
        sched.note_mutation(1.0);
        sched.note_mutation(2.0);
        assert_eq!(sched.state(), PersistState::InFlight { queued: true });
        assert_eq!(sched.poll(3.0), None);
        sched.complete(first, Ok(1), 3.0);
        let second = sched.poll(3.0).unwrap();
        assert_ne!(first, second);
        sched.complete(second, Ok(1), 4.0);
        assert_eq!(sched.poll(4.0), None);
    }

    #[test]
    fn test_failure_rearms() {
        let mut sched = PersistScheduler::new(0.0);
        sched.note_mutation(0.0);
        let ticket = sched.poll(0.0).unwrap();
        sched.complete(ticket, Err("quota".into()), 1.0);
        assert_eq!(sched.state(), PersistState::Pending);
        assert_eq!(sched.stats().last_error.as_deref(), Some("quota"));
        assert!(sched.poll(1.0).is_some());
    }

    #[test]
    fn test_cancel_and_stale_ticket() {
        let mut sched = PersistScheduler::new(0.0);
        sched.note_mutation(0.0);
        let ticket = sched.poll(0.0).unwrap();
        sched.cancel();
        assert_eq!(sched.stats().cancelled, 1);
        assert!(!sched.complete(ticket, Ok(10), 1.0));
        assert_eq!(sched.stats().writes, 0);
        assert_eq!(sched.state(), PersistState::Pending);
    }

    #[test]
    fn test_memory_store_failure() {
        let mut store = MemoryRecordStore::new();
        store.save("a", b"1").unwrap();
        store.fail_with = Some("offline".into());
        assert!(matches!(store.save("a", b"2"), Err(GridError::Store(_))));
        assert_eq!(store.load("a").unwrap().as_deref(), Some(&b"1"[..]));
    }
}
