//! The public timeline: namespaced marks and measures over a shared store.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::bridge::IngestionBridge;
use crate::config::{IngestionMode, LogLevel, TimelineConfig};
use crate::error::{TimelineError, TimelineResult};
use crate::naming::NameCodec;
use crate::query::{passes, EntryKind, NameFilter, Snapshot};
use crate::registry::{HandleRegistry, MarkSeries, MeasureRecord, MeasureSeries};
use crate::store::{Entry, EntryType, TimingStore};

/// Result of a successful mark.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkTicket {
    /// Full entry name written to the store
    pub name: String,
    /// Segment number assigned to the mark
    pub segment: usize,
    /// The entry as the store created it
    pub entry: Entry,
}

/// Namespaced timeline of marks and measures.
///
/// Each instance owns its series and writes into the shared store under its
/// own namespace prefix, so several instances can share one store.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use timenstein::{MemoryStore, Timeline, TimelineConfig};
///
/// let store = Arc::new(MemoryStore::new());
/// let mut timeline = Timeline::new(store, TimelineConfig::default()).unwrap();
///
/// timeline.mark("load").unwrap();
/// timeline.mark("load").unwrap();
/// let measure = timeline.measure("load").unwrap();
/// assert_eq!((measure.start_segment, measure.end_segment), (1, 2));
/// ```
pub struct Timeline {
    config: TimelineConfig,
    codec: NameCodec,
    compatible: bool,
    store: Arc<dyn TimingStore>,
    registry: HandleRegistry,
    bridge: IngestionBridge,
}

impl Timeline {
    /// Create a timeline, asking the store once whether it is usable.
    pub fn new(store: Arc<dyn TimingStore>, config: TimelineConfig) -> TimelineResult<Self> {
        let probe = Arc::clone(&store);
        Self::with_capability_check(store, config, move || probe.is_available())
    }

    /// Create a timeline with an explicit capability check.
    ///
    /// The check runs exactly once. When it answers `false`, every later
    /// operation fails with [`TimelineError::NotCompatible`] without touching
    /// the store.
    pub fn with_capability_check(
        store: Arc<dyn TimingStore>,
        config: TimelineConfig,
        check: impl FnOnce() -> bool,
    ) -> TimelineResult<Self> {
        config.validate()?;
        let codec = NameCodec::from_config(&config);
        let compatible = check();

        let bridge = match config.ingestion {
            IngestionMode::Observed if compatible => {
                match store.subscribe(&[EntryType::Mark, EntryType::Measure]) {
                    Some(receiver) => IngestionBridge::observing(codec.clone(), receiver),
                    None => {
                        tracing::warn!(
                            target: "timenstein",
                            namespace = %config.namespace,
                            "store can't deliver entry notifications, ingesting inline"
                        );
                        IngestionBridge::new(codec.clone())
                    }
                }
            }
            _ => IngestionBridge::new(codec.clone()),
        };

        let timeline = Self {
            config,
            codec,
            compatible,
            store,
            registry: HandleRegistry::new(),
            bridge,
        };

        if !compatible {
            timeline.log_failure(&TimelineError::NotCompatible);
        }
        Ok(timeline)
    }

    /// Record the next mark for `handle`.
    pub fn mark(&mut self, handle: &str) -> TimelineResult<MarkTicket> {
        let result = self.try_mark(handle, false);
        self.report(result)
    }

    /// Record the last mark for `handle` and lock it against further marks.
    ///
    /// Measures between existing marks remain possible.
    pub fn mark_final(&mut self, handle: &str) -> TimelineResult<MarkTicket> {
        let result = self.try_mark(handle, true);
        self.report(result)
    }

    /// Measure from the first to the latest mark of `handle`.
    pub fn measure(&mut self, handle: &str) -> TimelineResult<MeasureRecord> {
        self.measure_range(handle, None, None)
    }

    /// Measure between two segments of `handle`.
    ///
    /// A missing `start` defaults to 1 and a missing `end` to the latest
    /// segment. Bounds are checked against the mark count at call time.
    pub fn measure_range(
        &mut self,
        handle: &str,
        start: Option<usize>,
        end: Option<usize>,
    ) -> TimelineResult<MeasureRecord> {
        let result = self.try_measure(handle, start, end);
        self.report(result)
    }

    /// Remove this namespace's raw entries of `kind` from the store.
    ///
    /// The in-memory series are left intact. Returns the number of distinct
    /// entry names cleared.
    pub fn clear(&mut self, kind: EntryKind, filter: Option<&NameFilter>) -> TimelineResult<usize> {
        let result = self.try_clear(kind, filter);
        self.report(result)
    }

    /// [`clear`](Self::clear) with the kind given as `"marks"` or `"measures"`.
    pub fn clear_token(
        &mut self,
        token: &str,
        filter: Option<&NameFilter>,
    ) -> TimelineResult<usize> {
        let result = self
            .ensure_compatible()
            .and_then(|()| token.parse::<EntryKind>())
            .and_then(|kind| self.try_clear(kind, filter));
        self.report(result)
    }

    /// Copy of the series of `kind`, optionally filtered on namespaced handle.
    pub fn get(
        &mut self,
        kind: EntryKind,
        filter: Option<&NameFilter>,
    ) -> TimelineResult<Snapshot> {
        let result = self.try_get(kind, filter);
        self.report(result)
    }

    /// [`get`](Self::get) with the kind given as `"marks"` or `"measures"`.
    pub fn get_token(
        &mut self,
        token: &str,
        filter: Option<&NameFilter>,
    ) -> TimelineResult<Snapshot> {
        let result = self
            .ensure_compatible()
            .and_then(|()| token.parse::<EntryKind>())
            .and_then(|kind| self.try_get(kind, filter));
        self.report(result)
    }

    pub fn marks(
        &mut self,
        filter: Option<&NameFilter>,
    ) -> TimelineResult<BTreeMap<String, MarkSeries>> {
        self.get(EntryKind::Marks, filter)
            .map(|snapshot| snapshot.into_marks().unwrap_or_default())
    }

    pub fn measures(
        &mut self,
        filter: Option<&NameFilter>,
    ) -> TimelineResult<BTreeMap<String, MeasureSeries>> {
        self.get(EntryKind::Measures, filter)
            .map(|snapshot| snapshot.into_measures().unwrap_or_default())
    }

    /// Serialize a snapshot to pretty JSON.
    pub fn export_json(
        &mut self,
        kind: EntryKind,
        filter: Option<&NameFilter>,
    ) -> TimelineResult<String> {
        let result = self
            .try_get(kind, filter)
            .and_then(|snapshot| Ok(serde_json::to_string_pretty(&snapshot)?));
        self.report(result)
    }

    /// Ingest pending store notifications. Returns the number appended.
    ///
    /// Only does work for an instance using [`IngestionMode::Observed`].
    pub fn pump(&mut self) -> usize {
        if !self.compatible {
            return 0;
        }
        self.bridge.drain(&mut self.registry)
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Answer of the capability check made at construction.
    pub fn is_compatible(&self) -> bool {
        self.compatible
    }

    /// Ingestion design in effect (may be inline even if observed was asked for).
    pub fn ingestion_mode(&self) -> IngestionMode {
        if self.bridge.is_observing() {
            IngestionMode::Observed
        } else {
            IngestionMode::Inline
        }
    }

    /// Number of marks recorded for `handle`, if it was ever marked.
    pub fn mark_count(&self, handle: &str) -> Option<usize> {
        self.registry
            .mark_series(&self.codec.namespaced_handle(handle))
            .map(MarkSeries::mark_count)
    }

    pub fn is_locked(&self, handle: &str) -> bool {
        self.registry
            .mark_series(&self.codec.namespaced_handle(handle))
            .is_some_and(|series| series.locked)
    }

    fn try_mark(&mut self, handle: &str, is_final: bool) -> TimelineResult<MarkTicket> {
        self.ensure_compatible()?;
        self.validate_handle(handle)?;
        self.pump();

        let key = self.codec.namespaced_handle(handle);
        let segment = self.registry.next_segment(&key)?;
        let name = self.codec.encode_mark_name(handle, segment);
        let entry = self.store.create_instant(&name)?;
        self.registry.commit_mark(&key, is_final);
        self.ingest_inline(&entry);

        tracing::debug!(target: "timenstein", handle, segment, is_final, "mark recorded");
        Ok(MarkTicket {
            name,
            segment,
            entry,
        })
    }

    fn try_measure(
        &mut self,
        handle: &str,
        start: Option<usize>,
        end: Option<usize>,
    ) -> TimelineResult<MeasureRecord> {
        self.ensure_compatible()?;
        self.pump();

        let key = self.codec.namespaced_handle(handle);
        let (start, end) = self.registry.resolve_range(&key, start, end)?;
        let name = self.codec.encode_measure_name(handle, start, end);
        let start_mark = self.codec.encode_mark_name(handle, start);
        let end_mark = self.codec.encode_mark_name(handle, end);
        let entry = self.store.create_interval(&name, &start_mark, &end_mark)?;
        self.ingest_inline(&entry);

        tracing::debug!(
            target: "timenstein",
            handle,
            start,
            end,
            duration_ms = entry.duration,
            "measure recorded"
        );
        Ok(MeasureRecord::from_entry(&entry, start, end))
    }

    fn try_clear(
        &mut self,
        kind: EntryKind,
        filter: Option<&NameFilter>,
    ) -> TimelineResult<usize> {
        self.ensure_compatible()?;
        self.pump();

        let names: BTreeSet<String> = self
            .store
            .entries_by_type(kind.entry_type())
            .into_iter()
            .filter(|entry| {
                self.codec.recognizes(&entry.name, entry.entry_type)
                    && passes(filter, &entry.name)
            })
            .map(|entry| entry.name)
            .collect();

        for name in &names {
            match kind {
                EntryKind::Marks => self.store.clear_instants(name),
                EntryKind::Measures => self.store.clear_intervals(name),
            }
        }

        tracing::debug!(
            target: "timenstein",
            kind = %kind,
            cleared = names.len(),
            "entries cleared"
        );
        Ok(names.len())
    }

    fn try_get(
        &mut self,
        kind: EntryKind,
        filter: Option<&NameFilter>,
    ) -> TimelineResult<Snapshot> {
        self.ensure_compatible()?;
        self.pump();

        let snapshot = match kind {
            EntryKind::Marks => Snapshot::Marks(select(self.registry.marks(), filter)),
            EntryKind::Measures => Snapshot::Measures(select(self.registry.measures(), filter)),
        };
        Ok(snapshot)
    }

    fn ingest_inline(&mut self, entry: &Entry) {
        if !self.bridge.is_observing() {
            self.bridge.ingest(entry, &mut self.registry);
        }
    }

    fn ensure_compatible(&self) -> TimelineResult<()> {
        if self.compatible {
            Ok(())
        } else {
            Err(TimelineError::NotCompatible)
        }
    }

    fn validate_handle(&self, handle: &str) -> TimelineResult<()> {
        if handle.is_empty() {
            return Err(TimelineError::MissingHandle);
        }
        if handle.contains(self.codec.separator()) {
            return Err(TimelineError::HandleContainsNamespaceDelimiter);
        }
        if handle.contains(self.codec.delimiter()) {
            return Err(TimelineError::HandleContainsSegmentDelimiter);
        }
        Ok(())
    }

    fn report<T>(&self, result: TimelineResult<T>) -> TimelineResult<T> {
        if let Err(err) = &result {
            self.log_failure(err);
        }
        result
    }

    fn log_failure(&self, err: &TimelineError) {
        if !self.config.error_logging {
            return;
        }
        let namespace = self.config.namespace.as_str();
        match self.config.error_log_level {
            LogLevel::Log => tracing::info!(target: "timenstein", namespace, "{err}"),
            LogLevel::Warn => tracing::warn!(target: "timenstein", namespace, "{err}"),
            LogLevel::Error => tracing::error!(target: "timenstein", namespace, "{err}"),
        }
    }
}

impl fmt::Debug for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeline")
            .field("namespace", &self.config.namespace)
            .field("compatible", &self.compatible)
            .field("ingestion", &self.ingestion_mode())
            .field("mark_handles", &self.registry.marks().len())
            .field("measure_handles", &self.registry.measures().len())
            .finish()
    }
}

fn select<S: Clone>(
    series: &HashMap<String, S>,
    filter: Option<&NameFilter>,
) -> BTreeMap<String, S> {
    series
        .iter()
        .filter(|(key, _)| passes(filter, key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn timeline() -> Timeline {
        Timeline::new(Arc::new(MemoryStore::new()), TimelineConfig::default()).unwrap()
    }

    #[test]
    fn test_mark_assigns_sequential_segments() {
        let mut timeline = timeline();
        for expected in 1..=3 {
            let ticket = timeline.mark("load").unwrap();
            assert_eq!(ticket.segment, expected);
            assert_eq!(ticket.name, format!("timenstein::load-{expected}"));
            assert_eq!(ticket.entry.name, ticket.name);
        }
        assert_eq!(timeline.mark_count("load"), Some(3));
    }

    #[test]
    fn test_handle_validation() {
        let mut timeline = timeline();
        assert!(matches!(timeline.mark(""), Err(TimelineError::MissingHandle)));
        assert!(matches!(
            timeline.mark("a::b"),
            Err(TimelineError::HandleContainsNamespaceDelimiter)
        ));
        assert!(matches!(
            timeline.mark("a-b"),
            Err(TimelineError::HandleContainsSegmentDelimiter)
        ));
        assert!(timeline.marks(None).unwrap().is_empty());
    }

    #[test]
    fn test_final_mark_locks() {
        let mut timeline = timeline();
        timeline.mark("load").unwrap();
        timeline.mark_final("load").unwrap();
        assert!(timeline.is_locked("load"));

        assert!(matches!(timeline.mark("load"), Err(TimelineError::EntryLocked)));
        assert!(matches!(timeline.mark_final("load"), Err(TimelineError::EntryLocked)));
        assert_eq!(timeline.mark_count("load"), Some(2));

        // Locked handles can still be measured.
        assert!(timeline.measure("load").is_ok());
    }

    #[test]
    fn test_measure_errors() {
        let mut timeline = timeline();
        assert!(matches!(timeline.measure("nope"), Err(TimelineError::HandleNotFound)));

        timeline.mark("load").unwrap();
        assert!(matches!(timeline.measure("load"), Err(TimelineError::InsufficientMarks)));

        timeline.mark("load").unwrap();
        assert!(matches!(
            timeline.measure_range("load", Some(2), Some(2)),
            Err(TimelineError::InvalidRange)
        ));
        assert!(matches!(
            timeline.measure_range("load", Some(1), Some(3)),
            Err(TimelineError::InvalidRange)
        ));
        assert!(timeline.measures(None).unwrap().is_empty());
    }

    #[test]
    fn test_handle_overlapping_delimiter_is_ingested() {
        let config = TimelineConfig::default().with_segment_delimiter("--");
        let mut timeline = Timeline::new(Arc::new(MemoryStore::new()), config).unwrap();

        assert_eq!(timeline.mark("a-").unwrap().name, "timenstein::a---1");
        timeline.mark("a-").unwrap();
        let record = timeline.measure("a-").unwrap();
        assert_eq!((record.start_segment, record.end_segment), (1, 2));

        let marks = timeline.marks(None).unwrap();
        let segments: Vec<_> = marks["timenstein::a-"].entries.iter().map(|r| r.segment).collect();
        assert_eq!(segments, vec![1, 2]);
        let measures = timeline.measures(None).unwrap();
        assert_eq!(measures["timenstein::a-"].entries, vec![record]);
    }

    #[test]
    fn test_measure_store_failure_after_clear() {
        let mut timeline = timeline();
        timeline.mark("load").unwrap();
        timeline.mark("load").unwrap();
        timeline.clear(EntryKind::Marks, None).unwrap();

        assert!(matches!(timeline.measure("load"), Err(TimelineError::Store(_))));
        assert!(timeline.measures(None).unwrap().is_empty());
    }

    #[test]
    fn test_incompatible_is_sticky() {
        let store = Arc::new(MemoryStore::new());
        let mut timeline =
            Timeline::with_capability_check(store.clone(), TimelineConfig::default(), || false)
                .unwrap();

        assert!(!timeline.is_compatible());
        assert!(matches!(timeline.mark("load"), Err(TimelineError::NotCompatible)));
        assert!(matches!(timeline.measure("load"), Err(TimelineError::NotCompatible)));
        assert!(matches!(
            timeline.clear(EntryKind::Marks, None),
            Err(TimelineError::NotCompatible)
        ));
        assert!(matches!(
            timeline.get_token("bogus", None),
            Err(TimelineError::NotCompatible)
        ));
        assert_eq!(timeline.pump(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TimelineConfig::default().with_segment_delimiter("");
        assert!(matches!(
            Timeline::new(Arc::new(MemoryStore::new()), config),
            Err(TimelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_export_json() {
        let mut timeline = timeline();
        timeline.mark("load").unwrap();
        timeline.mark("load").unwrap();
        timeline.measure("load").unwrap();

        let json = timeline.export_json(EntryKind::Measures, None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["kind"], "measures");
        let record = &value["series"]["timenstein::load"]["entries"][0];
        assert_eq!(record["start_segment"], 1);
        assert_eq!(record["end_segment"], 2);
    }

    #[test]
    fn test_debug_output() {
        let mut timeline = timeline();
        timeline.mark("load").unwrap();
        let debug = format!("{timeline:?}");
        assert!(debug.contains("timenstein"));
        assert!(debug.contains("mark_handles: 1"));
    }
}
