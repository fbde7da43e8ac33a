use crate::{
    config::Config,
    dispatch::{Connection, Dispatcher},
    event::TimedEvent,
    filter::Source,
    state::State,
    types::{Stats, TimestampFn, WithTimestamp},
};
use eyre::{Result, ensure};
use parking_lot::Mutex;
use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Weak},
    time::Duration,
};
use tracing::{debug, trace};

/// Synchronizes a fixed number of channels by exact timestamp equality.
///
/// Each channel buffers up to `queue_size` distinct timestamps. When an
/// `add` makes every channel hold the same timestamp, the matching
/// events are removed from all channels and handed to the registered
/// match callbacks as one tuple in channel order. Events pushed out of
/// a full channel are reported to the drop callbacks.
///
/// All mutation of the buffers is serialized by one lock. Callbacks run
/// on the calling thread after the lock is released, so a callback may
/// call `add` on the same synchronizer.
///
/// Cloning shares the instance. [Input] ports and the sources wired to
/// them do not keep it alive. Buffered events that never match are
/// discarded silently when the last handle is dropped, and later adds
/// through its ports are ignored.
pub struct TimeSynchronizer<M> {
    shared: Arc<Shared<M>>,
}

struct Shared<M> {
    state: Mutex<State<M>>,
    dispatcher: Dispatcher<M>,
    extractor: TimestampFn<M>,
    channels: usize,
    queue_size: usize,
}

impl<M> Clone for TimeSynchronizer<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<M> TimeSynchronizer<M>
where
    M: WithTimestamp + Send + Sync + 'static,
{
    /// Creates a synchronizer that reads timestamps through
    /// [WithTimestamp].
    pub fn new(channels: usize, queue_size: usize) -> Result<Self> {
        Self::from_config(Config::new(channels, queue_size))
    }

    pub fn from_config(config: Config) -> Result<Self> {
        Self::with_extractor(config, |message: &M| message.timestamp())
    }

    /// Creates a synchronizer with one channel per source and connects
    /// each source to its channel.
    pub fn with_sources(sources: &[&dyn Source<M>], queue_size: usize) -> Result<Self> {
        let synchronizer = Self::new(sources.len(), queue_size)?;
        synchronizer.connect(sources)?;
        Ok(synchronizer)
    }
}

impl<M> TimeSynchronizer<M>
where
    M: Send + Sync + 'static,
{
    /// Creates a synchronizer that derives timestamps from messages
    /// with `extractor`.
    pub fn with_extractor<F>(config: Config, extractor: F) -> Result<Self>
    where
        F: Fn(&M) -> Duration + Send + Sync + 'static,
    {
        config.validate()?;
        let Config {
            channels,
            queue_size,
        } = config;

        let state = State::new(channels, queue_size)?;
        debug!(channels, queue_size, "create time synchronizer");

        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                dispatcher: Dispatcher::new(),
                extractor: Arc::new(extractor),
                channels,
                queue_size,
            }),
        })
    }

    pub fn channels(&self) -> usize {
        self.shared.channels
    }

    pub fn queue_size(&self) -> usize {
        self.shared.queue_size
    }

    /// The number of events buffered by `channel`.
    pub fn buffered(&self, channel: usize) -> Option<usize> {
        self.shared.state.lock().buffer(channel).map(|buffer| buffer.len())
    }

    /// The timestamps buffered by `channel` in ascending order.
    pub fn buffered_timestamps(&self, channel: usize) -> Option<Vec<Duration>> {
        self.shared
            .state
            .lock()
            .buffer(channel)
            .map(|buffer| buffer.timestamps().collect())
    }

    pub fn stats(&self) -> Stats {
        self.shared.state.lock().stats()
    }

    /// Registers a callback invoked with one event per channel, in
    /// channel order, on every match.
    pub fn register_callback<F>(&self, callback: F) -> Connection
    where
        F: Fn(&[TimedEvent<M>]) + Send + Sync + 'static,
    {
        self.shared.dispatcher.register_match(Arc::new(callback))
    }

    /// Registers a callback invoked whenever an event is evicted from a
    /// full channel. Only the evicting channel's slot is populated.
    pub fn register_drop_callback<F>(&self, callback: F) -> Connection
    where
        F: Fn(&[Option<TimedEvent<M>>]) + Send + Sync + 'static,
    {
        self.shared.dispatcher.register_drop(Arc::new(callback))
    }

    /// Adds a message to `channel`, stamped by the timestamp strategy.
    ///
    /// Fails only if `channel` is out of range. If a drop callback
    /// panics, the match callbacks of this add still run before the
    /// panic is resumed.
    pub fn add(&self, channel: usize, message: impl Into<Arc<M>>) -> Result<()> {
        self.check_channel(channel)?;
        self.shared.add(channel, message.into());
        Ok(())
    }

    /// Adds an event to `channel` keyed by its own timestamp.
    ///
    /// Fails only if `channel` is out of range.
    pub fn add_event(&self, channel: usize, event: TimedEvent<M>) -> Result<()> {
        self.check_channel(channel)?;
        self.shared.add_event(channel, event);
        Ok(())
    }

    /// Returns the input port of `channel`.
    pub fn input(&self, channel: usize) -> Result<Input<M>> {
        self.check_channel(channel)?;
        Ok(Input {
            channel,
            shared: Arc::downgrade(&self.shared),
        })
    }

    /// Returns all input ports in channel order.
    pub fn inputs(&self) -> Vec<Input<M>> {
        (0..self.shared.channels)
            .map(|channel| Input {
                channel,
                shared: Arc::downgrade(&self.shared),
            })
            .collect()
    }

    /// Connects `sources[i]` to channel `i`. Exactly one source per
    /// channel is required.
    pub fn connect(&self, sources: &[&dyn Source<M>]) -> Result<Vec<Connection>> {
        ensure!(
            sources.len() == self.shared.channels,
            "expect {} sources, got {}",
            self.shared.channels,
            sources.len()
        );

        let connections = sources
            .iter()
            .zip(self.inputs())
            .map(|(source, input)| source.connect_output(input))
            .collect();
        Ok(connections)
    }

    /// Connects `source` to `channel`.
    pub fn connect_input(&self, channel: usize, source: &dyn Source<M>) -> Result<Connection> {
        let input = self.input(channel)?;
        Ok(source.connect_output(input))
    }

    /// Discards every buffered event without invoking any callback.
    pub fn clear(&self) {
        self.shared.state.lock().clear();
    }

    fn check_channel(&self, channel: usize) -> Result<()> {
        ensure!(
            channel < self.shared.channels,
            "channel {channel} is out of range for a synchronizer with {} channels",
            self.shared.channels
        );
        Ok(())
    }
}

impl<M> fmt::Debug for TimeSynchronizer<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeSynchronizer")
            .field("channels", &self.shared.channels)
            .field("queue_size", &self.shared.queue_size)
            .finish_non_exhaustive()
    }
}

impl<M> Shared<M>
where
    M: Send + Sync + 'static,
{
    fn add(&self, channel: usize, message: Arc<M>) {
        let timestamp = (self.extractor)(&message);
        self.add_event(channel, TimedEvent::new(message, timestamp));
    }

    fn add_event(&self, channel: usize, event: TimedEvent<M>) {
        let step = self.state.lock().push(channel, event);

        // The lock is released here. Buffers already reflect this add,
        // so a purged group must reach the match callbacks.
        let dropped = step.dropped.map(|dropped| {
            panic::catch_unwind(AssertUnwindSafe(|| {
                self.dispatcher
                    .dispatch_drop(channel, self.channels, dropped)
            }))
        });
        if let Some(group) = step.matched {
            self.dispatcher.dispatch_match(&group);
        }
        if let Some(Err(payload)) = dropped {
            panic::resume_unwind(payload);
        }
    }
}

/// The input port of one channel of a [TimeSynchronizer].
///
/// Ports are cheap to clone and never fail: the channel index is
/// checked when the port is created. A port only weakly refers to its
/// synchronizer; once that is destroyed, adds are discarded.
pub struct Input<M> {
    channel: usize,
    shared: Weak<Shared<M>>,
}

impl<M> Clone for Input<M> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel,
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<M> Input<M>
where
    M: Send + Sync + 'static,
{
    pub fn channel(&self) -> usize {
        self.channel
    }

    /// Checks if the synchronizer behind this port still exists.
    pub fn is_connected(&self) -> bool {
        self.shared.strong_count() > 0
    }

    pub fn add(&self, message: impl Into<Arc<M>>) {
        match self.shared.upgrade() {
            Some(shared) => shared.add(self.channel, message.into()),
            None => trace!(channel = self.channel, "synchronizer is gone, discard message"),
        }
    }

    pub fn add_event(&self, event: TimedEvent<M>) {
        match self.shared.upgrade() {
            Some(shared) => shared.add_event(self.channel, event),
            None => trace!(channel = self.channel, "synchronizer is gone, discard event"),
        }
    }
}

impl<M> fmt::Debug for Input<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Input")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}
