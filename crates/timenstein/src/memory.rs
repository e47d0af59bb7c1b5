//! In-process timing store backed by [`std::time::Instant`].

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::store::{
    Entry, EntryReceiver, EntrySender, EntryType, StoreError, StoreResult, TimingStore,
};

type Clock = Box<dyn Fn() -> f64 + Send + Sync>;

struct Subscriber {
    types: Vec<EntryType>,
    sender: EntrySender,
}

#[derive(Default)]
struct StoreState {
    entries: Vec<Entry>,
    next_sequence: u64,
    subscribers: Vec<Subscriber>,
}

impl StoreState {
    fn push(&mut self, name: &str, entry_type: EntryType, start_time: f64, duration: f64) -> Entry {
        self.next_sequence += 1;
        let entry = Entry {
            name: name.to_string(),
            entry_type,
            start_time,
            duration,
            sequence: self.next_sequence,
        };
        self.entries.push(entry.clone());

        // Dropped receivers unsubscribe themselves.
        self.subscribers.retain(|sub| {
            !sub.types.contains(&entry_type) || sub.sender.send(entry.clone()).is_ok()
        });

        entry
    }
}

/// A [`TimingStore`] holding entries in memory.
///
/// Times are milliseconds since the store was created. Interval boundaries
/// resolve to the most recent mark with the given name, and clearing by name
/// removes every entry of that type and name.
///
/// # Example
///
/// ```rust
/// use timenstein::{MemoryStore, TimingStore};
///
/// let store = MemoryStore::new();
/// store.create_instant("start").unwrap();
/// store.create_instant("end").unwrap();
/// let interval = store.create_interval("work", "start", "end").unwrap();
/// assert!(interval.duration >= 0.0);
/// ```
pub struct MemoryStore {
    clock: Clock,
    available: bool,
    state: Mutex<StoreState>,
}

impl MemoryStore {
    /// Create a store whose origin is now.
    pub fn new() -> Self {
        let origin = Instant::now();
        Self::with_clock(move || origin.elapsed().as_secs_f64() * 1000.0)
    }

    /// Create a store reading milliseconds from the given clock.
    pub fn with_clock(clock: impl Fn() -> f64 + Send + Sync + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            available: true,
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Create a store that fails the capability check.
    pub fn unsupported() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.state().entries.is_empty()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn clear(&self, name: &str, entry_type: EntryType) {
        self.state()
            .entries
            .retain(|e| !(e.entry_type == entry_type && e.name == name));
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("MemoryStore")
            .field("available", &self.available)
            .field("entries", &state.entries.len())
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}

impl TimingStore for MemoryStore {
    fn is_available(&self) -> bool {
        self.available
    }

    fn create_instant(&self, name: &str) -> StoreResult<Entry> {
        let now = (self.clock)();
        Ok(self.state().push(name, EntryType::Mark, now, 0.0))
    }

    fn create_interval(&self, name: &str, start_mark: &str, end_mark: &str) -> StoreResult<Entry> {
        let mut state = self.state();
        let latest_mark = |mark: &str| {
            state
                .entries
                .iter()
                .rev()
                .find(|e| e.entry_type == EntryType::Mark && e.name == mark)
                .map(|e| e.start_time)
                .ok_or_else(|| StoreError::MarkNotFound(mark.to_string()))
        };
        let start = latest_mark(start_mark)?;
        let end = latest_mark(end_mark)?;
        Ok(state.push(name, EntryType::Measure, start, end - start))
    }

    fn entries(&self) -> Vec<Entry> {
        self.state().entries.clone()
    }

    fn clear_instants(&self, name: &str) {
        self.clear(name, EntryType::Mark);
    }

    fn clear_intervals(&self, name: &str) {
        self.clear(name, EntryType::Measure);
    }

    fn subscribe(&self, types: &[EntryType]) -> Option<EntryReceiver> {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        self.state().subscribers.push(Subscriber {
            types: types.to_vec(),
            sender,
        });
        Some(receiver)
    }
}
