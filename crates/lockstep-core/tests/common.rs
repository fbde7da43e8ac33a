use lockstep_core::{Group, TimeSynchronizer, TimedEvent, WithTimestamp};
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestMessage {
    pub timestamp: Duration,
    pub data: String,
}

impl TestMessage {
    pub fn new(timestamp_ms: u64, data: &str) -> Self {
        Self {
            timestamp: Duration::from_millis(timestamp_ms),
            data: data.to_string(),
        }
    }
}

impl WithTimestamp for TestMessage {
    fn timestamp(&self) -> Duration {
        self.timestamp
    }
}

#[allow(dead_code)]
pub fn create_message(timestamp_ms: u64) -> Arc<TestMessage> {
    Arc::new(TestMessage::new(
        timestamp_ms,
        &format!("msg_{}", timestamp_ms),
    ))
}

pub fn ms(timestamp_ms: u64) -> Duration {
    Duration::from_millis(timestamp_ms)
}

/// Records every match and drop reported by a synchronizer.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct Helper {
    matches: Arc<Mutex<Vec<Group<TestMessage>>>>,
    drops: Arc<Mutex<Vec<Vec<Option<TimedEvent<TestMessage>>>>>>,
}

impl Helper {
    #[allow(dead_code)]
    pub fn attach(sync: &TimeSynchronizer<TestMessage>) -> Self {
        let helper = Self::default();

        let matches = Arc::clone(&helper.matches);
        sync.register_callback(move |group: &[TimedEvent<TestMessage>]| {
            matches.lock().push(group.to_vec());
        });

        let drops = Arc::clone(&helper.drops);
        sync.register_drop_callback(move |slots: &[Option<TimedEvent<TestMessage>>]| {
            drops.lock().push(slots.to_vec());
        });

        helper
    }

    #[allow(dead_code)]
    pub fn count(&self) -> usize {
        self.matches.lock().len()
    }

    #[allow(dead_code)]
    pub fn drop_count(&self) -> usize {
        self.drops.lock().len()
    }

    #[allow(dead_code)]
    pub fn matches(&self) -> Vec<Group<TestMessage>> {
        self.matches.lock().clone()
    }

    #[allow(dead_code)]
    pub fn drops(&self) -> Vec<Vec<Option<TimedEvent<TestMessage>>>> {
        self.drops.lock().clone()
    }
}

/// Assert that every group holds one event per channel, all sharing a
/// single timestamp.
#[allow(dead_code)]
pub fn assert_groups_valid(groups: &[Group<TestMessage>], channels: usize) {
    for group in groups {
        assert_eq!(group.len(), channels, "Group should cover every channel");

        let timestamp = group[0].timestamp();
        assert!(
            group.iter().all(|event| event.timestamp() == timestamp),
            "Events in group have different timestamps: {:?}",
            group.iter().map(|event| event.timestamp()).collect::<Vec<_>>()
        );
    }
}
