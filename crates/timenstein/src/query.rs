//! Entry kinds and name filters for bulk reads and clears.

use regex_lite::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{TimelineError, TimelineResult};
use crate::registry::{MarkSeries, MeasureSeries};
use crate::store::EntryType;

/// Which of the two series collections an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Marks,
    Measures,
}

impl EntryKind {
    /// Store entry type backing this kind.
    pub fn entry_type(self) -> EntryType {
        match self {
            EntryKind::Marks => EntryType::Mark,
            EntryKind::Measures => EntryType::Measure,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Marks => "marks",
            EntryKind::Measures => "measures",
        }
    }
}

impl FromStr for EntryKind {
    type Err = TimelineError;

    /// Accepts exactly `"marks"` or `"measures"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "marks" => Ok(EntryKind::Marks),
            "measures" => Ok(EntryKind::Measures),
            _ => Err(TimelineError::InvalidToken),
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predicate over full entry names or namespaced handles.
#[derive(Clone)]
pub enum NameFilter {
    /// Regular expression search
    Regex(Regex),
    /// Plain substring search
    Contains(String),
    /// Arbitrary predicate
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl NameFilter {
    /// Compile a regular expression filter.
    pub fn regex(pattern: &str) -> TimelineResult<Self> {
        Ok(NameFilter::Regex(Regex::new(pattern)?))
    }

    pub fn contains(needle: &str) -> Self {
        NameFilter::Contains(needle.to_string())
    }

    pub fn predicate(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        NameFilter::Predicate(Arc::new(f))
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            NameFilter::Regex(re) => re.is_match(name),
            NameFilter::Contains(needle) => name.contains(needle.as_str()),
            NameFilter::Predicate(f) => f(name),
        }
    }
}

impl fmt::Debug for NameFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameFilter::Regex(re) => f.debug_tuple("Regex").field(&re.as_str()).finish(),
            NameFilter::Contains(needle) => f.debug_tuple("Contains").field(needle).finish(),
            NameFilter::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// `true` when there is no filter or the filter matches.
pub(crate) fn passes(filter: Option<&NameFilter>, name: &str) -> bool {
    filter.map_or(true, |f| f.matches(name))
}

/// Copy of one series collection, keyed by namespaced handle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "series")]
pub enum Snapshot {
    Marks(BTreeMap<String, MarkSeries>),
    Measures(BTreeMap<String, MeasureSeries>),
}

impl Snapshot {
    pub fn kind(&self) -> EntryKind {
        match self {
            Snapshot::Marks(_) => EntryKind::Marks,
            Snapshot::Measures(_) => EntryKind::Measures,
        }
    }

    /// Number of handles in the snapshot.
    pub fn len(&self) -> usize {
        match self {
            Snapshot::Marks(map) => map.len(),
            Snapshot::Measures(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn handles(&self) -> Vec<&str> {
        match self {
            Snapshot::Marks(map) => map.keys().map(String::as_str).collect(),
            Snapshot::Measures(map) => map.keys().map(String::as_str).collect(),
        }
    }

    pub fn into_marks(self) -> Option<BTreeMap<String, MarkSeries>> {
        match self {
            Snapshot::Marks(map) => Some(map),
            Snapshot::Measures(_) => None,
        }
    }

    pub fn into_measures(self) -> Option<BTreeMap<String, MeasureSeries>> {
        match self {
            Snapshot::Measures(map) => Some(map),
            Snapshot::Marks(_) => None,
        }
    }
}
