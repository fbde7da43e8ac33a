mod common;

use common::*;
use lockstep_core::{TimeSynchronizer, TimedEvent};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use std::{collections::BTreeSet, sync::Arc, thread, time::Duration};

#[test]
fn test_concurrent_producers_match_exactly_once() {
    let channels = 4;
    let message_count = 500u64;

    // Large enough that nothing is evicted.
    let sync = TimeSynchronizer::<TestMessage>::new(channels, 1024).unwrap();
    let helper = Helper::attach(&sync);

    thread::scope(|scope| {
        for channel in 0..channels {
            let input = sync.input(channel).unwrap();
            scope.spawn(move || {
                let mut rng = StdRng::seed_from_u64(channel as u64);
                let mut timestamps: Vec<u64> = (0..message_count).collect();
                timestamps.shuffle(&mut rng);

                for ts in timestamps {
                    input.add(create_message(ts));
                }
            });
        }
    });

    let matches = helper.matches();
    assert_eq!(matches.len(), message_count as usize);
    assert_groups_valid(&matches, channels);

    let distinct: BTreeSet<Duration> = matches.iter().map(|group| group[0].timestamp()).collect();
    assert_eq!(distinct.len(), message_count as usize);

    assert_eq!(helper.drop_count(), 0);
    for channel in 0..channels {
        assert_eq!(sync.buffered(channel), Some(0));
    }
}

#[test]
fn test_concurrent_producers_with_eviction_conserve_events() {
    let channels = 3;
    let per_channel = 300u64;
    let queue_size = 4;

    let sync = TimeSynchronizer::<TestMessage>::new(channels, queue_size).unwrap();
    let helper = Helper::attach(&sync);

    thread::scope(|scope| {
        for channel in 0..channels {
            let input = sync.input(channel).unwrap();
            scope.spawn(move || {
                let mut rng = StdRng::seed_from_u64(100 + channel as u64);
                let mut timestamps: Vec<u64> = (0..per_channel).collect();
                timestamps.shuffle(&mut rng);

                for ts in timestamps {
                    input.add(create_message(ts));
                }
            });
        }
    });

    let buffered: usize = (0..channels)
        .map(|channel| sync.buffered(channel).unwrap())
        .sum();

    // Each event ends up matched, dropped or still buffered.
    assert_eq!(
        helper.count() * channels + helper.drop_count() + buffered,
        channels * per_channel as usize
    );
    assert!(buffered <= channels * queue_size);
    assert_groups_valid(&helper.matches(), channels);

    let stats = sync.stats();
    assert_eq!(stats.matched as usize, helper.count());
    assert_eq!(stats.dropped as usize, helper.drop_count());
}

#[test]
fn test_randomized_interleaving_invariants() {
    let channels = 3;
    let queue_size = 3;
    let mut rng = StdRng::seed_from_u64(7);

    let sync = TimeSynchronizer::<TestMessage>::new(channels, queue_size).unwrap();
    let helper = Helper::attach(&sync);

    // Unique timestamps per channel, arriving in random order.
    let mut pending: Vec<(usize, u64)> = (0..channels)
        .flat_map(|channel| (0..20).map(move |ts| (channel, ts)))
        .collect();
    pending.shuffle(&mut rng);

    for (added, &(channel, ts)) in pending.iter().enumerate() {
        sync.add(channel, create_message(ts)).unwrap();

        let buffers: Vec<Vec<Duration>> = (0..channels)
            .map(|channel| sync.buffered_timestamps(channel).unwrap())
            .collect();

        for buffer in &buffers {
            assert!(buffer.len() <= queue_size);
        }

        // No timestamp stays present in every channel.
        let common_timestamps = buffers[0]
            .iter()
            .filter(|ts| buffers[1..].iter().all(|buffer| buffer.contains(ts)))
            .count();
        assert_eq!(common_timestamps, 0);

        let buffered: usize = buffers.iter().map(Vec::len).sum();
        assert_eq!(
            helper.count() * channels + helper.drop_count() + buffered,
            added + 1
        );
    }

    assert_groups_valid(&helper.matches(), channels);
}

#[test]
fn test_match_callback_may_add_to_same_synchronizer() {
    let sync = TimeSynchronizer::<TestMessage>::new(2, 4).unwrap();
    let helper = Helper::attach(&sync);

    // Each match at t feeds t + 1 into both channels until t = 3.
    let inputs = sync.inputs();
    let connection = sync.register_callback(move |group: &[TimedEvent<TestMessage>]| {
        let next = group[0].timestamp() + Duration::from_millis(1);
        if next <= ms(3) {
            for input in &inputs {
                input.add(TestMessage {
                    timestamp: next,
                    data: String::from("chained"),
                });
            }
        }
    });

    sync.add(0, create_message(0)).unwrap();
    sync.add(1, create_message(0)).unwrap();

    let matched: Vec<Duration> = helper
        .matches()
        .iter()
        .map(|group| group[0].timestamp())
        .collect();
    assert_eq!(matched, vec![ms(0), ms(1), ms(2), ms(3)]);

    assert!(connection.disconnect());
}

#[test]
fn test_drop_callback_may_register_callbacks() {
    let sync = TimeSynchronizer::<TestMessage>::new(2, 1).unwrap();
    let helper = Helper::attach(&sync);

    let handle = sync.clone();
    let connection = sync.register_drop_callback(move |_: &[Option<TimedEvent<TestMessage>>]| {
        handle.register_callback(|_: &[TimedEvent<TestMessage>]| {});
        assert!(handle.buffered(0).is_some());
    });

    sync.add(0, create_message(0)).unwrap();
    sync.add(0, create_message(1)).unwrap();
    sync.add(1, create_message(1)).unwrap();

    assert_eq!(helper.drop_count(), 1);
    assert_eq!(helper.count(), 1);
    assert!(connection.disconnect());
}

#[test]
fn test_chained_synchronizers() {
    // The first synchronizer's matches feed a channel of the second.
    let first = TimeSynchronizer::<TestMessage>::new(2, 4).unwrap();
    let second = TimeSynchronizer::<TestMessage>::new(2, 4).unwrap();
    let helper = Helper::attach(&second);

    let downstream = second.input(0).unwrap();
    first.register_callback(move |group: &[TimedEvent<TestMessage>]| {
        downstream.add_event(group[0].clone());
    });

    let message = create_message(5);
    first.add(0, Arc::clone(&message)).unwrap();
    second.add(1, create_message(5)).unwrap();
    assert_eq!(helper.count(), 0);

    first.add(1, create_message(5)).unwrap();
    assert_eq!(helper.count(), 1);
    assert!(Arc::ptr_eq(helper.matches()[0][0].message(), &message));
}
