//! This library synchronizes messages from a fixed number of channels
//! by exact timestamp equality. A tuple is emitted only when every
//! channel has produced a message carrying the identical timestamp.
//!
//! # Usage
//!
//! ```rust
//! use lockstep_core::{TimeSynchronizer, TimedEvent, WithTimestamp};
//! use std::{
//!     sync::{Arc, Mutex},
//!     time::Duration,
//! };
//!
//! // Define your message type
//! #[derive(Debug)]
//! struct MyMessage(Duration);
//!
//! impl WithTimestamp for MyMessage {
//!     fn timestamp(&self) -> Duration {
//!         self.0
//!     }
//! }
//!
//! # fn main() -> eyre::Result<()> {
//! // Two channels, each keeping at most 8 distinct timestamps.
//! let sync = TimeSynchronizer::<MyMessage>::new(2, 8)?;
//!
//! let matched = Arc::new(Mutex::new(vec![]));
//! let sink = matched.clone();
//! sync.register_callback(move |group: &[TimedEvent<MyMessage>]| {
//!     sink.lock().unwrap().push(group[0].timestamp());
//! });
//!
//! sync.add(0, MyMessage(Duration::from_millis(1000)))?;
//! sync.add(1, MyMessage(Duration::from_millis(998)))?;
//! sync.add(1, MyMessage(Duration::from_millis(1000)))?;
//!
//! assert_eq!(*matched.lock().unwrap(), vec![Duration::from_millis(1000)]);
//! # Ok(())
//! # }
//! ```
//!
//! Streams of channel-tagged messages can be synchronized with
//! [sync()], which yields the matched groups as an output stream.

pub mod buffer;
mod config;
pub mod dispatch;
mod event;
mod filter;
pub mod state;
mod sync;
mod synchronizer;
mod types;

pub use config::Config;
pub use dispatch::Connection;
pub use event::TimedEvent;
pub use filter::{PassThrough, Source};
pub use sync::sync;
pub use synchronizer::{Input, TimeSynchronizer};
pub use types::*;
