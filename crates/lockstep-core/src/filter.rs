//! Upstream sources that feed synchronizer channels.

use crate::{
    dispatch::{Connection, Signal},
    event::TimedEvent,
    synchronizer::Input,
};
use std::sync::Arc;

/// A producer whose output can be wired into a synchronizer channel.
///
/// The connection is established once; afterwards the source pushes
/// into the port on its own.
pub trait Source<M> {
    fn connect_output(&self, input: Input<M>) -> Connection;
}

/// A filter that forwards everything it receives to its connected
/// outputs, in connection order.
pub struct PassThrough<M> {
    outputs: Signal<Input<M>>,
}

impl<M> Default for PassThrough<M> {
    fn default() -> Self {
        Self {
            outputs: Signal::default(),
        }
    }
}

impl<M> PassThrough<M>
where
    M: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, message: impl Into<Arc<M>>) {
        let message = message.into();
        for output in self.outputs.snapshot() {
            output.add(Arc::clone(&message));
        }
    }

    pub fn add_event(&self, event: TimedEvent<M>) {
        for output in self.outputs.snapshot() {
            output.add_event(event.clone());
        }
    }

    /// The number of connected outputs.
    pub fn outputs(&self) -> usize {
        self.outputs.len()
    }
}

impl<M> Source<M> for PassThrough<M>
where
    M: Send + Sync + 'static,
{
    fn connect_output(&self, input: Input<M>) -> Connection {
        self.outputs.connect(input)
    }
}
