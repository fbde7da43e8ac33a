use crate::event::TimedEvent;
use eyre::{Result, ensure};
use std::{collections::BTreeMap, time::Duration};

/// A capacity-bounded buffer of events keyed and ordered by timestamp.
///
/// Timestamps are unique within the buffer. Inserting past capacity
/// evicts the entry with the smallest timestamp, which may well be the
/// entry that was just inserted.
#[derive(Debug)]
pub struct Buffer<M> {
    entries: BTreeMap<Duration, TimedEvent<M>>,
    capacity: usize,
}

impl<M> Buffer<M> {
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        ensure!(capacity >= 1, "buffer capacity must be at least 1");

        Ok(Self {
            entries: BTreeMap::new(),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, timestamp: Duration) -> bool {
        self.entries.contains_key(&timestamp)
    }

    pub fn get(&self, timestamp: Duration) -> Option<&TimedEvent<M>> {
        self.entries.get(&timestamp)
    }

    /// Removes and returns the event at `timestamp`.
    pub fn take(&mut self, timestamp: Duration) -> Option<TimedEvent<M>> {
        self.entries.remove(&timestamp)
    }

    pub fn first_timestamp(&self) -> Option<Duration> {
        self.entries.first_key_value().map(|(&ts, _)| ts)
    }

    pub fn last_timestamp(&self) -> Option<Duration> {
        self.entries.last_key_value().map(|(&ts, _)| ts)
    }

    /// Buffered timestamps in ascending order.
    pub fn timestamps(&self) -> impl Iterator<Item = Duration> + '_ {
        self.entries.keys().copied()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Inserts an event keyed by its timestamp, replacing any event
    /// already stored at that timestamp.
    ///
    /// If the buffer then holds more than `capacity` entries, the entry
    /// with the minimum timestamp is removed and returned.
    pub fn insert(&mut self, event: TimedEvent<M>) -> Option<TimedEvent<M>> {
        self.entries.insert(event.timestamp(), event);

        if self.entries.len() > self.capacity {
            self.entries.pop_first().map(|(_, evicted)| evicted)
        } else {
            None
        }
    }
}
