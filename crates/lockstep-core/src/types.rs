use crate::event::TimedEvent;
use eyre::Result;
use futures::stream::BoxStream;
use std::{sync::Arc, time::Duration};

/// Creates a timestamp from the message passed to the synchronizer.
///
/// This is the default extraction strategy. Message types that do not
/// carry their own stamp can still be synchronized by injecting a
/// [TimestampFn] through
/// [TimeSynchronizer::with_extractor](crate::TimeSynchronizer::with_extractor).
pub trait WithTimestamp {
    fn timestamp(&self) -> Duration;
}

/// A pluggable strategy that derives the synchronization key from a
/// message.
pub type TimestampFn<M> = Arc<dyn Fn(&M) -> Duration + Send + Sync>;

/// One event per channel, in channel order, all sharing one timestamp.
pub type Group<M> = Vec<TimedEvent<M>>;

/// Invoked with the full tuple whenever every channel holds the same
/// timestamp.
pub type MatchCallback<M> = Arc<dyn Fn(&[TimedEvent<M>]) + Send + Sync>;

/// Invoked when an event is evicted before completing a match. Exactly
/// one slot, the evicting channel's, is populated.
pub type DropCallback<M> = Arc<dyn Fn(&[Option<TimedEvent<M>>]) + Send + Sync>;

/// The stream is returned by [sync](crate::sync()), emitting matched
/// groups.
pub type OutputStream<'a, M> = BoxStream<'a, Result<Group<M>>>;

/// Cumulative counters of a synchronizer instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Number of full matches dispatched.
    pub matched: u64,
    /// Number of events evicted by capacity pressure.
    pub dropped: u64,
}
