use crate::{buffer::Buffer, event::TimedEvent, types::Stats};
use eyre::{Result, ensure};
use std::time::Duration;
use tracing::{debug, trace};

/// The outcome of pushing one event into the [State].
#[derive(Debug)]
pub struct Step<M> {
    /// The event evicted from the pushed channel, if the insert
    /// overflowed its capacity.
    pub dropped: Option<TimedEvent<M>>,

    /// The completed tuple, in channel order, if the push made every
    /// channel hold the same timestamp.
    pub matched: Option<Vec<TimedEvent<M>>>,
}

/// The internal state maintained by
/// [TimeSynchronizer](crate::TimeSynchronizer).
#[derive(Debug)]
pub struct State<M> {
    /// One buffer per channel, indexed by channel number.
    buffers: Vec<Buffer<M>>,

    /// The maximum number of entries kept for each channel.
    queue_size: usize,

    stats: Stats,
}

impl<M> State<M> {
    pub fn new(channels: usize, queue_size: usize) -> Result<Self> {
        ensure!(
            channels >= 2,
            "a synchronizer needs at least 2 channels, got {channels}"
        );
        ensure!(
            queue_size >= 1,
            "queue_size must be at least 1, got {queue_size}"
        );

        let buffers = (0..channels)
            .map(|_| Buffer::with_capacity(queue_size))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            buffers,
            queue_size,
            stats: Stats::default(),
        })
    }

    pub fn channels(&self) -> usize {
        self.buffers.len()
    }

    pub fn queue_size(&self) -> usize {
        self.queue_size
    }

    pub fn buffer(&self, channel: usize) -> Option<&Buffer<M>> {
        self.buffers.get(channel)
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Checks if every channel other than `channel` holds an event at
    /// `timestamp`.
    pub fn is_complete(&self, channel: usize, timestamp: Duration) -> bool {
        self.buffers
            .iter()
            .enumerate()
            .filter(|&(index, _)| index != channel)
            .all(|(_, buffer)| buffer.contains(timestamp))
    }

    /// Removes the events at `timestamp` from every channel. Returns
    /// `None`, leaving the buffers untouched, unless all channels hold
    /// that timestamp.
    pub fn take_group(&mut self, timestamp: Duration) -> Option<Vec<TimedEvent<M>>> {
        if !self.buffers.iter().all(|buffer| buffer.contains(timestamp)) {
            return None;
        }

        self.buffers
            .iter_mut()
            .map(|buffer| buffer.take(timestamp))
            .collect()
    }

    /// Insert an event into the buffer of `channel`, evict on overflow
    /// and take out the full tuple if the insert completed one.
    ///
    /// # Panics
    ///
    /// Panics if `channel` is not below [channels](Self::channels).
    pub fn push(&mut self, channel: usize, event: TimedEvent<M>) -> Step<M> {
        let timestamp = event.timestamp();
        trace!(channel, ?timestamp, "insert event");

        let dropped = self.buffers[channel].insert(event);

        // An entry evicted by its own insert can never take part in a
        // match.
        let survived = match &dropped {
            Some(evicted) => {
                debug!(
                    channel,
                    timestamp = ?evicted.timestamp(),
                    "evict event on buffer overflow"
                );
                self.stats.dropped += 1;
                evicted.timestamp() != timestamp
            }
            None => true,
        };

        let matched = if survived && self.is_complete(channel, timestamp) {
            self.take_group(timestamp)
        } else {
            None
        };

        if matched.is_some() {
            trace!(?timestamp, "all channels matched");
            self.stats.matched += 1;
        }

        Step { dropped, matched }
    }

    /// Discards every buffered event without reporting it.
    pub fn clear(&mut self) {
        self.buffers.iter_mut().for_each(Buffer::clear);
    }
}
