use crate::types::WithTimestamp;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

/// An immutable pairing of a shared message handle with the timestamp
/// it is synchronized on.
///
/// Cloning an event shares the message; the payload is never copied.
#[derive(Debug)]
pub struct TimedEvent<M> {
    message: Arc<M>,
    timestamp: Duration,
    receipt_time: Instant,
}

impl<M> TimedEvent<M> {
    /// Creates an event received now.
    pub fn new(message: impl Into<Arc<M>>, timestamp: Duration) -> Self {
        Self::with_receipt_time(message, timestamp, Instant::now())
    }

    pub fn with_receipt_time(
        message: impl Into<Arc<M>>,
        timestamp: Duration,
        receipt_time: Instant,
    ) -> Self {
        Self {
            message: message.into(),
            timestamp,
            receipt_time,
        }
    }

    pub fn message(&self) -> &Arc<M> {
        &self.message
    }

    pub fn into_message(self) -> Arc<M> {
        self.message
    }

    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    /// The instant the event entered the pipeline. Carried through the
    /// synchronizer untouched.
    pub fn receipt_time(&self) -> Instant {
        self.receipt_time
    }
}

impl<M> Clone for TimedEvent<M> {
    fn clone(&self) -> Self {
        Self {
            message: Arc::clone(&self.message),
            timestamp: self.timestamp,
            receipt_time: self.receipt_time,
        }
    }
}

impl<M> WithTimestamp for TimedEvent<M> {
    fn timestamp(&self) -> Duration {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_clone_shares_message() {
        let event: TimedEvent<String> =
            TimedEvent::new(String::from("payload"), Duration::from_millis(10));
        let cloned = event.clone();

        assert!(Arc::ptr_eq(event.message(), cloned.message()));
        assert_eq!(Arc::strong_count(event.message()), 2);
        assert_eq!(cloned.timestamp(), Duration::from_millis(10));
    }

    #[test]
    fn test_event_accepts_existing_handle() {
        let message = Arc::new(7u32);
        let event: TimedEvent<u32> = TimedEvent::new(Arc::clone(&message), Duration::ZERO);

        assert!(Arc::ptr_eq(&message, event.message()));
        assert_eq!(*event.into_message(), 7);
    }

    #[test]
    fn test_event_preserves_receipt_time() {
        let received = Instant::now();
        let event: TimedEvent<u8> =
            TimedEvent::with_receipt_time(1u8, Duration::from_secs(4), received);

        assert_eq!(event.receipt_time(), received);
        assert_eq!(event.clone().receipt_time(), received);
        assert_eq!(WithTimestamp::timestamp(&event), Duration::from_secs(4));
    }
}
