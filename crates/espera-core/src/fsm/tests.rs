use super::*;

use std::collections::HashMap;

use crate::channel::{Channel, DestinationSpec, SourceSpec};
use crate::error::{ApplyError, StoreError};
use crate::message::Message;

fn test_fsm() -> (PrioritizedStateMachine, Arc<ChannelPriorityStore>) {
    let store = Arc::new(ChannelPriorityStore::new());
    (PrioritizedStateMachine::new(Arc::clone(&store)), store)
}

fn apply_channel_create(fsm: &PrioritizedStateMachine, channel: Channel) -> ApplyResult {
    let payload = Command::ChannelCreate { channel }.encode().unwrap();
    fsm.apply(&payload)
}

fn apply_message_push(fsm: &PrioritizedStateMachine, channel_id: &str, message: Message) {
    let payload = Command::MessagePush {
        channel_id: channel_id.to_string(),
        message,
    }
    .encode()
    .unwrap();
    fsm.apply(&payload).unwrap();
}

/// Channel descriptor with fully populated driver configs, mirroring what a
/// real deployment registers.
fn full_channel(id: &str) -> Channel {
    Channel {
        id: id.to_string(),
        source: SourceSpec {
            driver: "memory".to_string(),
            config: serde_json::json!({ "topic": "inbound" }),
        },
        destination: DestinationSpec {
            driver: "memory".to_string(),
            config: serde_json::json!({ "topic": "outbound" }),
        },
    }
}

#[test]
fn apply_channel_create_returns_created_channel() {
    let (fsm, store) = test_fsm();

    let outcome = apply_channel_create(&fsm, full_channel("id1")).unwrap();
    assert_eq!(outcome, ApplyOutcome::ChannelCreated(full_channel("id1")));

    let (channels, _) = store.dump();
    assert_eq!(channels, vec![full_channel("id1")]);
}

#[test]
fn apply_duplicate_channel_create_is_an_error_value() {
    let (fsm, store) = test_fsm();
    apply_channel_create(&fsm, Channel::new("id1")).unwrap();

    let err = apply_channel_create(&fsm, Channel::new("id1")).unwrap_err();
    assert_eq!(
        err,
        ApplyError::Store(StoreError::DuplicateChannel("id1".to_string()))
    );

    let (channels, _) = store.dump();
    assert_eq!(channels.len(), 1, "store unchanged after rejected command");
}

#[test]
fn apply_push_to_unknown_channel_is_an_error_value() {
    let (fsm, store) = test_fsm();

    let payload = Command::MessagePush {
        channel_id: "missing".to_string(),
        message: Message::new("msg1", 1000),
    }
    .encode()
    .unwrap();
    let err = fsm.apply(&payload).unwrap_err();
    assert_eq!(
        err,
        ApplyError::Store(StoreError::ChannelNotFound("missing".to_string()))
    );
    assert!(store.is_empty());
}

#[test]
fn apply_malformed_command_is_an_error_value() {
    let (fsm, store) = test_fsm();

    let err = fsm.apply(b"!! definitely not a command").unwrap_err();
    assert!(matches!(err, ApplyError::Decode(_)));
    assert!(store.is_empty(), "decode failure must not touch the store");
}

#[test]
fn create_then_push_dequeues_in_priority_order_with_fifo_ties() {
    let (fsm, store) = test_fsm();
    apply_channel_create(&fsm, Channel::new("ch1")).unwrap();

    apply_message_push(&fsm, "ch1", Message::new("b-first", 600));
    apply_message_push(&fsm, "ch1", Message::new("a", 400));
    apply_message_push(&fsm, "ch1", Message::new("b-second", 600));
    apply_message_push(&fsm, "ch1", Message::new("c", 2000));

    let mut got = Vec::new();
    while let Some(message) = store.dequeue() {
        got.push(message.value);
    }
    assert_eq!(got, vec!["a", "b-first", "b-second", "c"]);
}

#[test]
fn snapshot_captures_channels_and_message_order() {
    let (fsm, store) = test_fsm();
    apply_channel_create(&fsm, full_channel("id1")).unwrap();
    for (value, priority) in [("msg1", 1000), ("msg5", 1200), ("msg4", 2000)] {
        apply_message_push(&fsm, "id1", Message::new(value, priority));
    }

    let data = fsm.snapshot().unwrap();
    let snapshot = StoreSnapshot::decode(&data).unwrap();

    assert_eq!(snapshot.channels, vec![full_channel("id1")]);
    assert_eq!(
        snapshot.messages_by_channel,
        HashMap::from([(
            "id1".to_string(),
            vec![
                Message::new("msg1", 1000),
                Message::new("msg5", 1200),
                Message::new("msg4", 2000),
            ],
        )])
    );
    assert_eq!(store.len(), 3, "capture must not drain the store");
}

#[test]
fn snapshot_restore_into_flushed_store_preserves_dump() {
    let (fsm, store) = test_fsm();
    apply_channel_create(&fsm, full_channel("id1")).unwrap();
    for (value, priority) in [("msg1", 1000), ("msg5", 1200), ("msg4", 2000)] {
        apply_message_push(&fsm, "id1", Message::new(value, priority));
    }

    let (want_channels, want_messages) = store.dump();
    let data = fsm.snapshot().unwrap();

    store.flush();
    assert!(store.is_empty());

    fsm.restore(&data).unwrap();

    let (got_channels, got_messages) = store.dump();
    assert_eq!(got_channels, want_channels);
    assert_eq!(got_messages, want_messages);
    assert_eq!(
        store.channel_messages("id1").unwrap(),
        vec![
            Message::new("msg1", 1000),
            Message::new("msg5", 1200),
            Message::new("msg4", 2000),
        ]
    );
}

#[test]
fn restore_reproduces_dequeue_sequence_across_channels() {
    let (fsm, store) = test_fsm();
    apply_channel_create(&fsm, Channel::new("id1")).unwrap();
    apply_channel_create(&fsm, Channel::new("id2")).unwrap();
    for (value, priority) in [("msg1", 1000), ("msg5", 1200), ("msg4", 2000)] {
        apply_message_push(&fsm, "id1", Message::new(value, priority));
    }
    for (value, priority) in [("msg7", 3000), ("msg8", 3200), ("msg6", 1000)] {
        apply_message_push(&fsm, "id2", Message::new(value, priority));
    }

    let data = fsm.snapshot().unwrap();

    // Drain the original, then the restored copy, and compare sequences.
    let mut want = Vec::new();
    while let Some(message) = store.dequeue() {
        want.push(message);
    }

    fsm.restore(&data).unwrap();
    let mut got = Vec::new();
    while let Some(message) = store.dequeue() {
        got.push(message);
    }
    assert_eq!(got, want);
}

#[test]
fn restore_discards_prior_state() {
    let (fsm, store) = test_fsm();
    apply_channel_create(&fsm, Channel::new("id1")).unwrap();
    apply_message_push(&fsm, "id1", Message::new("keep", 1000));
    let data = fsm.snapshot().unwrap();

    // Diverge the store after the capture.
    apply_channel_create(&fsm, Channel::new("doomed")).unwrap();
    apply_message_push(&fsm, "doomed", Message::new("drop-me", 1));
    apply_message_push(&fsm, "id1", Message::new("drop-me-too", 2));

    fsm.restore(&data).unwrap();

    let (channels, messages) = store.dump();
    assert_eq!(channels, vec![Channel::new("id1")]);
    assert_eq!(
        messages,
        HashMap::from([("id1".to_string(), vec![Message::new("keep", 1000)])])
    );
}

#[test]
fn restore_handles_empty_channels() {
    let (fsm, store) = test_fsm();
    apply_channel_create(&fsm, Channel::new("id1")).unwrap();
    apply_channel_create(&fsm, Channel::new("id2")).unwrap();

    let data = fsm.snapshot().unwrap();
    store.flush();
    fsm.restore(&data).unwrap();

    let (channels, messages) = store.dump();
    assert_eq!(channels, vec![Channel::new("id1"), Channel::new("id2")]);
    assert_eq!(messages.get("id1"), Some(&Vec::new()));
    assert_eq!(messages.get("id2"), Some(&Vec::new()));
}

#[test]
fn legacy_flat_queue_survives_snapshot_restore() {
    let (fsm, store) = test_fsm();
    for (value, priority) in [("msg2", 400), ("msg1", 1000)] {
        let payload = Command::LegacyPush {
            message: Message::new(value, priority),
        }
        .encode()
        .unwrap();
        fsm.apply(&payload).unwrap();
    }

    let data = fsm.snapshot().unwrap();
    store.flush();
    fsm.restore(&data).unwrap();

    assert_eq!(store.dequeue(), Some(Message::new("msg2", 400)));
    assert_eq!(store.dequeue(), Some(Message::new("msg1", 1000)));
    assert_eq!(store.dequeue(), None);
}

#[test]
fn restore_rejects_messages_for_unknown_channels() {
    let (fsm, _store) = test_fsm();

    let snapshot = StoreSnapshot {
        channels: vec![Channel::new("id1")],
        messages_by_channel: HashMap::from([
            ("id1".to_string(), Vec::new()),
            ("ghost".to_string(), vec![Message::new("msg1", 1000)]),
        ]),
    };
    let err = fsm.restore(&snapshot.encode().unwrap()).unwrap_err();
    assert!(matches!(err, SnapshotError::Corrupt(_)));
}

#[test]
fn snapshot_is_consistent_under_concurrent_applies() {
    let (fsm, store) = test_fsm();
    apply_channel_create(&fsm, Channel::new("ch1")).unwrap();

    let fsm = Arc::new(fsm);
    let writer = {
        let fsm = Arc::clone(&fsm);
        std::thread::spawn(move || {
            for i in 0..200 {
                let payload = Command::MessagePush {
                    channel_id: "ch1".to_string(),
                    message: Message::new(format!("msg{i}"), 1000 + i),
                }
                .encode()
                .unwrap();
                fsm.apply(&payload).unwrap();
            }
        })
    };

    // Each capture must decode cleanly and contain an internally consistent
    // message list; the store lock guarantees no torn reads.
    for _ in 0..50 {
        let data = fsm.snapshot().unwrap();
        let snapshot = StoreSnapshot::decode(&data).unwrap();
        let messages = &snapshot.messages_by_channel["ch1"];
        for pair in messages.windows(2) {
            assert!(pair[0].priority <= pair[1].priority);
        }
    }

    writer.join().unwrap();
    assert_eq!(store.len(), 200);
}
