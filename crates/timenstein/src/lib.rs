//! Timenstein
//!
//! Namespaced marks and measures over a host timing store. Application code
//! records repeated checkpoints for a named operation (a *handle*) and later
//! measures the time between any two of them, without colliding with other
//! code writing to the same store.
//!
//! - Marks are named `namespace::handle-N`, numbered from 1 per handle
//! - Measures are named `namespace::handle-S-E` and span two existing marks
//! - A final mark locks a handle against further marks
//! - Raw store entries can be cleared by kind and name filter without
//!   touching the recorded series
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use timenstein::{EntryKind, MemoryStore, Timeline, TimelineConfig, TimelineError};
//!
//! let store = Arc::new(MemoryStore::new());
//! let mut timeline = Timeline::new(store, TimelineConfig::new("app")).unwrap();
//!
//! timeline.mark("page_load").unwrap();
//! timeline.mark_final("page_load").unwrap();
//! assert!(matches!(timeline.mark("page_load"), Err(TimelineError::EntryLocked)));
//!
//! let measure = timeline.measure("page_load").unwrap();
//! assert_eq!(measure.end_segment, 2);
//!
//! let measures = timeline.get(EntryKind::Measures, None).unwrap();
//! assert_eq!(measures.handles(), vec!["app::page_load"]);
//! ```
//!
//! # Modules
//!
//! - [`naming`] - Composite entry name encoding and decoding
//! - [`store`] - Host timing store trait
//! - [`registry`] - Per-handle series bookkeeping
//! - [`bridge`] - Ingestion of store entries into the registry

pub mod bridge;
mod config;
mod error;
mod memory;
pub mod naming;
mod query;
pub mod registry;
pub mod store;
mod timeline;

pub use bridge::{Ingest, IngestionBridge};
pub use config::{IngestionMode, LogLevel, TimelineConfig};
pub use error::{TimelineError, TimelineResult};
pub use memory::MemoryStore;
pub use naming::NameCodec;
pub use query::{EntryKind, NameFilter, Snapshot};
pub use registry::{HandleRegistry, MarkRecord, MarkSeries, MeasureRecord, MeasureSeries};
pub use store::{Entry, EntryReceiver, EntryType, StoreError, StoreResult, TimingStore};
pub use timeline::{MarkTicket, Timeline};

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_load_scenario() {
        let store = Arc::new(MemoryStore::new());
        let mut timeline = Timeline::new(store, TimelineConfig::default()).unwrap();

        timeline.mark("load").unwrap();
        timeline.mark("load").unwrap();
        let measure = timeline.measure("load").unwrap();
        assert_eq!(measure.start_segment, 1);
        assert_eq!(measure.end_segment, 2);
        assert_eq!(measure.name, "timenstein::load-1-2");

        timeline.mark_final("load").unwrap();
        assert!(matches!(timeline.mark("load"), Err(TimelineError::EntryLocked)));
        assert_eq!(timeline.mark_count("load"), Some(3));
    }

    #[test]
    fn test_two_namespaces_share_a_store() {
        let store = Arc::new(MemoryStore::new());
        let mut app = Timeline::new(store.clone(), TimelineConfig::new("app")).unwrap();
        let mut lib = Timeline::new(store.clone(), TimelineConfig::new("lib")).unwrap();

        app.mark("fetch").unwrap();
        lib.mark("fetch").unwrap();
        app.mark("fetch").unwrap();

        assert_eq!(app.mark_count("fetch"), Some(2));
        assert_eq!(lib.mark_count("fetch"), Some(1));
        assert_eq!(store.len(), 3);

        app.clear(EntryKind::Marks, None).unwrap();
        let remaining: Vec<_> = store.entries().into_iter().map(|e| e.name).collect();
        assert_eq!(remaining, vec!["lib::fetch-1"]);
    }

    #[test]
    fn test_series_survive_clear() {
        let store = Arc::new(MemoryStore::new());
        let mut timeline = Timeline::new(store.clone(), TimelineConfig::default()).unwrap();

        timeline.mark("job").unwrap();
        timeline.mark("job").unwrap();
        timeline.measure("job").unwrap();
        timeline.clear(EntryKind::Marks, None).unwrap();
        timeline.clear(EntryKind::Measures, None).unwrap();

        assert!(store.is_empty());
        let marks = timeline.marks(None).unwrap();
        assert_eq!(marks["timenstein::job"].entries.len(), 2);
        let measures = timeline.measures(None).unwrap();
        assert_eq!(measures["timenstein::job"].entries.len(), 1);

        // Segment numbers are never reused.
        assert_eq!(timeline.mark("job").unwrap().segment, 3);
    }
}
