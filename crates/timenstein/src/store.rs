//! Host timing store abstraction.
//!
//! The timeline never measures time itself. It creates and enumerates named
//! entries through [`TimingStore`], which a host implements over whatever
//! high-resolution timing facility it has. [`MemoryStore`](crate::MemoryStore)
//! is the in-process implementation.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Type of a raw store entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Point-in-time entry
    Mark,
    /// Interval between two marks
    Measure,
}

/// A raw entry held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Full entry name
    pub name: String,
    /// Entry type
    pub entry_type: EntryType,
    /// Start time in milliseconds since the store's origin
    pub start_time: f64,
    /// Duration in milliseconds (zero for marks)
    pub duration: f64,
    /// Store-assigned creation number, strictly increasing
    pub sequence: u64,
}

impl Entry {
    /// End time in milliseconds since the store's origin.
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// Errors raised by a timing store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An interval boundary names a mark the store doesn't hold
    #[error("no mark named {0:?} exists")]
    MarkNotFound(String),

    /// The store refused the request
    #[error("{0}")]
    Rejected(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Receiving half of a store subscription.
pub type EntryReceiver = mpsc::UnboundedReceiver<Entry>;

/// Sending half of a store subscription.
pub type EntrySender = mpsc::UnboundedSender<Entry>;

/// Capability surface of a host timing facility.
///
/// All methods take `&self`; implementations that keep state use interior
/// mutability so one store can be shared by several timelines.
pub trait TimingStore: Send + Sync {
    /// Whether the host supports every capability below.
    fn is_available(&self) -> bool {
        true
    }

    /// Record a point-in-time entry.
    fn create_instant(&self, name: &str) -> StoreResult<Entry>;

    /// Record a named interval between two existing marks.
    fn create_interval(&self, name: &str, start_mark: &str, end_mark: &str) -> StoreResult<Entry>;

    /// All entries, in creation order.
    fn entries(&self) -> Vec<Entry>;

    /// Entries with the given name, in creation order.
    fn entries_by_name(&self, name: &str) -> Vec<Entry> {
        self.entries().into_iter().filter(|e| e.name == name).collect()
    }

    /// Entries of the given type, in creation order.
    fn entries_by_type(&self, entry_type: EntryType) -> Vec<Entry> {
        self.entries()
            .into_iter()
            .filter(|e| e.entry_type == entry_type)
            .collect()
    }

    /// Remove every mark with the given name.
    fn clear_instants(&self, name: &str);

    /// Remove every measure with the given name.
    fn clear_intervals(&self, name: &str);

    /// Receive entries of the given types as they are created.
    ///
    /// Returns `None` when the host can't deliver creation notifications.
    fn subscribe(&self, _types: &[EntryType]) -> Option<EntryReceiver> {
        None
    }
}
