//! Reachability transition history for diagnostics.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::registry::DeviceId;
use crate::runtime::Instant;

/// A lifecycle transition of a device record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Transition {
    /// First contact; the record was created.
    Discovered,
    /// Loaded from the device cache in the offline state.
    Restored,
    /// Came back after being offline, with a fresh handle.
    Reconnected,
    /// Announced again while already online; only the handle changed.
    Duplicate,
    Offline,
    Removed,
}

/// A recorded transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: DeviceId,
    pub transition: Transition,
    /// Seconds since journal creation
    pub timestamp: f64,
}

/// Bounded log of transitions across all devices.
#[derive(Debug, Clone)]
pub struct TransitionJournal {
    counts: HashMap<Transition, usize>,
    start_time: Instant,
    entries: VecDeque<JournalEntry>,
    max_entries: usize,
}

impl Default for TransitionJournal {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitionJournal {
    pub const DEFAULT_MAX_ENTRIES: usize = 100;

    pub fn new() -> Self {
        Self::with_max_entries(Self::DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            counts: HashMap::new(),
            start_time: Instant::now(),
            entries: VecDeque::new(),
            max_entries,
        }
    }

    pub fn record(&mut self, id: &DeviceId, transition: Transition) {
        *self.counts.entry(transition).or_default() += 1;

        self.entries.push_back(JournalEntry {
            id: id.clone(),
            transition,
            timestamp: self.start_time.elapsed().as_secs_f64(),
        });

        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter()
    }

    /// Retained transitions of one device, oldest first.
    pub fn for_device(&self, id: &DeviceId) -> Vec<Transition> {
        self.entries
            .iter()
            .filter(|e| &e.id == id)
            .map(|e| e.transition)
            .collect()
    }

    /// Total transitions of a kind ever recorded, including evicted ones.
    pub fn count(&self, transition: Transition) -> usize {
        self.counts.get(&transition).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summary(&self) -> JournalSummary {
        JournalSummary {
            discovered: self.count(Transition::Discovered),
            restored: self.count(Transition::Restored),
            reconnected: self.count(Transition::Reconnected),
            duplicate: self.count(Transition::Duplicate),
            offline: self.count(Transition::Offline),
            removed: self.count(Transition::Removed),
            total_entries: self.entries.len(),
        }
    }
}

/// Summary of the journal for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalSummary {
    pub discovered: usize,
    pub restored: usize,
    pub reconnected: usize,
    pub duplicate: usize,
    pub offline: usize,
    pub removed: usize,
    pub total_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_transition() {
        let mut journal = TransitionJournal::new();
        let id = DeviceId::from("d1");
        journal.record(&id, Transition::Discovered);
        journal.record(&id, Transition::Offline);

        assert_eq!(journal.len(), 2);
        assert_eq!(
            journal.for_device(&id),
            vec![Transition::Discovered, Transition::Offline]
        );
    }

    #[test]
    fn test_max_entries_keeps_counts() {
        let mut journal = TransitionJournal::with_max_entries(2);
        for i in 0..5 {
            journal.record(&DeviceId::from(format!("d{i}")), Transition::Discovered);
        }
        assert_eq!(journal.len(), 2);
        assert_eq!(journal.count(Transition::Discovered), 5);
        assert_eq!(journal.entries().next().unwrap().id, DeviceId::from("d3"));
    }

    #[test]
    fn test_summary() {
        let mut journal = TransitionJournal::new();
        journal.record(&DeviceId::from("d1"), Transition::Restored);
        journal.record(&DeviceId::from("d1"), Transition::Reconnected);
        journal.record(&DeviceId::from("d1"), Transition::Duplicate);
        journal.record(&DeviceId::from("d1"), Transition::Duplicate);
        let summary = journal.summary();
        assert_eq!(summary.restored, 1);
        assert_eq!(summary.reconnected, 1);
        assert_eq!(summary.duplicate, 2);
        assert_eq!(summary.discovered, 0);
        assert_eq!(summary.total_entries, 4);
    }
}
