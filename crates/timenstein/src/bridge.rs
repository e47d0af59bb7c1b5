//! Feeds raw store entries into the registry.

use std::collections::HashSet;

use tokio::sync::mpsc::error::TryRecvError;

use crate::naming::NameCodec;
use crate::registry::{HandleRegistry, MarkRecord, MeasureRecord};
use crate::store::{Entry, EntryReceiver, EntryType};

/// Outcome of offering one entry to the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingest {
    /// Appended to a series
    Appended,
    /// Belongs to another namespace or doesn't decode
    Foreign,
    /// Already ingested
    Duplicate,
}

/// Ingestion bridge for one namespace.
///
/// Every entry is either fed inline right after the store creates it, or
/// drained from a store subscription. An instance uses exactly one of the two.
#[derive(Debug)]
pub struct IngestionBridge {
    codec: NameCodec,
    seen: HashSet<(String, u64)>,
    receiver: Option<EntryReceiver>,
}

impl IngestionBridge {
    /// Create a bridge fed inline.
    pub fn new(codec: NameCodec) -> Self {
        Self {
            codec,
            seen: HashSet::new(),
            receiver: None,
        }
    }

    /// Create a bridge fed from a store subscription.
    pub fn observing(codec: NameCodec, receiver: EntryReceiver) -> Self {
        Self {
            receiver: Some(receiver),
            ..Self::new(codec)
        }
    }

    /// Whether this bridge drains a subscription.
    pub fn is_observing(&self) -> bool {
        self.receiver.is_some()
    }

    /// Number of distinct entries ingested so far.
    pub fn ingested(&self) -> usize {
        self.seen.len()
    }

    /// Decode one entry and append it to the matching series.
    pub fn ingest(&mut self, entry: &Entry, registry: &mut HandleRegistry) -> Ingest {
        if !self.codec.owns(&entry.name) {
            tracing::trace!(target: "timenstein", name = %entry.name, "ignoring foreign entry");
            return Ingest::Foreign;
        }
        let identity = (entry.name.clone(), entry.sequence);
        if self.seen.contains(&identity) {
            tracing::trace!(target: "timenstein", name = %entry.name, "ignoring redelivered entry");
            return Ingest::Duplicate;
        }

        match entry.entry_type {
            EntryType::Mark => {
                let Some((handle, segment)) = self.codec.decode_mark(&entry.name) else {
                    return undecodable(entry);
                };
                let key = self.codec.namespaced_handle(&handle);
                registry.push_mark(&key, MarkRecord::from_entry(entry, segment));
            }
            EntryType::Measure => {
                let Some((handle, start, end)) = self.codec.decode_measure(&entry.name) else {
                    return undecodable(entry);
                };
                let key = self.codec.namespaced_handle(&handle);
                registry.push_measure(&key, MeasureRecord::from_entry(entry, start, end));
            }
        }

        self.seen.insert(identity);
        Ingest::Appended
    }

    /// Ingest every notification waiting on the subscription.
    ///
    /// Returns the number of entries appended.
    pub fn drain(&mut self, registry: &mut HandleRegistry) -> usize {
        let mut appended = 0;
        loop {
            let entry = match self.receiver.as_mut().map(|rx| rx.try_recv()) {
                Some(Ok(entry)) => entry,
                Some(Err(TryRecvError::Disconnected)) => {
                    tracing::debug!(target: "timenstein", "store subscription closed");
                    self.receiver = None;
                    break;
                }
                Some(Err(TryRecvError::Empty)) | None => break,
            };
            if self.ingest(&entry, registry) == Ingest::Appended {
                appended += 1;
            }
        }
        appended
    }
}

/// An entry under this namespace prefix that doesn't decode as its type.
fn undecodable(entry: &Entry) -> Ingest {
    tracing::debug!(
        target: "timenstein",
        name = %entry.name,
        entry_type = ?entry.entry_type,
        "ignoring undecodable entry under namespace prefix"
    );
    Ingest::Foreign
}
