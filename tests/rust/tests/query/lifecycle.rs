//! Subscriber-driven attach/detach

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tests::fixtures;
use tests::{QueryHarness, RecordingListener};

/// Subscribe calls per source type: presence, room list, providers, registration
fn subscribe_calls(harness: &QueryHarness) -> [usize; 4] {
    [
        harness.provider.channel().listeners.subscribe_calls(),
        harness.directory.room_listeners.subscribe_calls(),
        harness.directory.provider_listeners.subscribe_calls(),
        harness.registry.listeners.subscribe_calls(),
    ]
}

fn unsubscribe_calls(harness: &QueryHarness) -> [usize; 4] {
    [
        harness.provider.channel().listeners.unsubscribe_calls(),
        harness.directory.room_listeners.unsubscribe_calls(),
        harness.directory.provider_listeners.unsubscribe_calls(),
        harness.registry.listeners.unsubscribe_calls(),
    ]
}

#[test]
fn test_first_subscriber_attaches_once_per_source() {
    let harness = QueryHarness::new("al", fixtures::sample_rooms());
    assert_eq!(subscribe_calls(&harness), [0, 0, 0, 0]);

    harness.subscribe();

    assert_eq!(subscribe_calls(&harness), [1, 1, 1, 1]);
    assert!(harness.query.is_attached());
    assert_eq!(harness.query.presence_subscriptions(), 1);
}

#[test]
fn test_second_subscriber_does_not_attach_again() {
    let harness = QueryHarness::new("al", fixtures::sample_rooms());
    harness.subscribe();
    harness.subscribe();

    assert_eq!(subscribe_calls(&harness), [1, 1, 1, 1]);
    assert_eq!(harness.query.subscriber_count(), 2);
}

#[test]
fn test_last_subscriber_removal_detaches_once() {
    let harness = QueryHarness::new("al", fixtures::sample_rooms());
    let (_, first) = harness.subscribe();
    let (_, second) = harness.subscribe();

    assert!(harness.query.remove_listener(first));
    assert_eq!(unsubscribe_calls(&harness), [0, 0, 0, 0]);
    assert!(harness.query.is_attached());

    assert!(harness.query.remove_listener(second));
    assert_eq!(unsubscribe_calls(&harness), [1, 1, 1, 1]);
    assert!(!harness.query.is_attached());
    assert_eq!(harness.live_subscriptions(), 0);
}

#[test]
fn test_remove_unknown_listener_is_noop() {
    let harness = QueryHarness::new("al", fixtures::sample_rooms());
    let (_, id) = harness.subscribe();

    assert!(harness.query.remove_listener(id));
    assert!(!harness.query.remove_listener(id));

    assert_eq!(harness.query.subscriber_count(), 0);
    assert_eq!(unsubscribe_calls(&harness), [1, 1, 1, 1]);
}

#[test]
fn test_resubscribe_attaches_again() {
    let harness = QueryHarness::new("al", fixtures::sample_rooms());
    let (_, id) = harness.subscribe();
    harness.query.remove_listener(id);

    harness.subscribe();

    assert_eq!(subscribe_calls(&harness), [2, 2, 2, 2]);
    assert_eq!(harness.live_subscriptions(), 4);
}

#[test]
fn test_cancel_without_subscribers_is_safe() {
    let harness = QueryHarness::new("al", fixtures::sample_rooms());

    harness.query.cancel();
    harness.query.cancel();

    assert_eq!(subscribe_calls(&harness), [0, 0, 0, 0]);
    assert_eq!(unsubscribe_calls(&harness), [0, 0, 0, 0]);
}

#[test]
fn test_detached_query_ignores_upstream() {
    let harness = QueryHarness::new("al", fixtures::sample_rooms());
    let (listener, id) = harness.subscribe();
    harness.query.run().unwrap();
    harness.query.remove_listener(id);
    listener.clear();

    harness.directory.add_room(fixtures::PROVIDER, fixtures::room("alto"));

    assert!(listener.is_empty());
    assert!(harness.query.find("alto").is_none());
}

#[test]
fn test_removed_listener_stops_receiving() {
    let harness = QueryHarness::new("al", fixtures::sample_rooms());
    let (kept, _) = harness.subscribe();
    let (gone, id) = harness.subscribe();
    harness.query.remove_listener(id);

    harness.query.run().unwrap();

    assert_eq!(kept.found().len(), 2);
    assert!(gone.is_empty());
}

#[test]
fn test_dropping_query_releases_subscriptions() {
    let harness = QueryHarness::new("al", fixtures::sample_rooms());
    let listener = Arc::new(RecordingListener::new());
    harness.query.add_listener(listener);
    assert_eq!(harness.live_subscriptions(), 4);

    let QueryHarness {
        directory,
        registry,
        provider,
        query,
    } = harness;
    drop(query);

    assert!(directory.room_listeners.is_empty());
    assert!(directory.provider_listeners.is_empty());
    assert!(registry.listeners.is_empty());
    assert!(provider.channel().listeners.is_empty());
}
