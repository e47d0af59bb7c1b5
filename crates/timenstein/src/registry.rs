//! Per-handle mark and measure series.
//!
//! The registry is pure bookkeeping: it hands out segment numbers, enforces
//! locking and range rules, and holds the decoded records. It never talks to
//! the store.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{TimelineError, TimelineResult};
use crate::store::Entry;

/// Decoded copy of a mark entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkRecord {
    /// Full entry name
    pub name: String,
    /// 1-based segment number within the handle
    pub segment: usize,
    /// Start time in milliseconds
    pub start_time: f64,
    /// Duration in milliseconds
    pub duration: f64,
}

impl MarkRecord {
    pub fn from_entry(entry: &Entry, segment: usize) -> Self {
        Self {
            name: entry.name.clone(),
            segment,
            start_time: entry.start_time,
            duration: entry.duration,
        }
    }
}

/// Decoded copy of a measure entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureRecord {
    /// Full entry name
    pub name: String,
    /// Segment the interval starts at
    pub start_segment: usize,
    /// Segment the interval ends at
    pub end_segment: usize,
    /// Start time in milliseconds
    pub start_time: f64,
    /// Duration in milliseconds
    pub duration: f64,
}

impl MeasureRecord {
    pub fn from_entry(entry: &Entry, start_segment: usize, end_segment: usize) -> Self {
        Self {
            name: entry.name.clone(),
            start_segment,
            end_segment,
            start_time: entry.start_time,
            duration: entry.duration,
        }
    }
}

/// Marks recorded for one handle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkSeries {
    /// Set once a final mark is recorded; no further marks are accepted
    pub locked: bool,
    /// Marks created in the store so far
    pub segments: usize,
    /// Decoded records in creation order
    pub entries: Vec<MarkRecord>,
}

impl MarkSeries {
    /// Number of marks the handle has.
    pub fn mark_count(&self) -> usize {
        self.segments
    }
}

/// Measures recorded for one handle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasureSeries {
    /// Decoded records in creation order
    pub entries: Vec<MeasureRecord>,
}

/// Mapping from namespaced handle to its series.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    marks: HashMap<String, MarkSeries>,
    measures: HashMap<String, MeasureSeries>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Segment number the next mark for `key` would get.
    ///
    /// Creates an empty series for an unseen handle.
    pub fn next_segment(&mut self, key: &str) -> TimelineResult<usize> {
        let series = self.marks.entry(key.to_string()).or_default();
        if series.locked {
            return Err(TimelineError::EntryLocked);
        }
        Ok(series.segments + 1)
    }

    /// Count a mark the store has created, locking the series if it was final.
    pub fn commit_mark(&mut self, key: &str, is_final: bool) {
        let series = self.marks.entry(key.to_string()).or_default();
        series.segments += 1;
        series.locked |= is_final;
    }

    /// Resolve optional bounds against the current mark count.
    ///
    /// A missing start defaults to 1 and a missing end to the latest segment.
    pub fn resolve_range(
        &self,
        key: &str,
        start: Option<usize>,
        end: Option<usize>,
    ) -> TimelineResult<(usize, usize)> {
        let count = self
            .marks
            .get(key)
            .map(MarkSeries::mark_count)
            .ok_or(TimelineError::HandleNotFound)?;
        if count < 2 {
            return Err(TimelineError::InsufficientMarks);
        }

        let start = start.unwrap_or(1);
        let end = end.unwrap_or(count);
        if start < 1 || start >= end || end > count {
            return Err(TimelineError::InvalidRange);
        }
        Ok((start, end))
    }

    /// Append a decoded mark.
    ///
    /// Marks observed from outside this instance also advance the segment
    /// count so later segment numbers stay unique.
    pub fn push_mark(&mut self, key: &str, record: MarkRecord) {
        let series = self.marks.entry(key.to_string()).or_default();
        series.segments = series.segments.max(record.segment);
        series.entries.push(record);
    }

    /// Append a decoded measure, creating the series on first use.
    pub fn push_measure(&mut self, key: &str, record: MeasureRecord) {
        self.measures
            .entry(key.to_string())
            .or_default()
            .entries
            .push(record);
    }

    pub fn mark_series(&self, key: &str) -> Option<&MarkSeries> {
        self.marks.get(key)
    }

    pub fn measure_series(&self, key: &str) -> Option<&MeasureSeries> {
        self.measures.get(key)
    }

    pub fn marks(&self) -> &HashMap<String, MarkSeries> {
        &self.marks
    }

    pub fn measures(&self) -> &HashMap<String, MeasureSeries> {
        &self.measures
    }
}
