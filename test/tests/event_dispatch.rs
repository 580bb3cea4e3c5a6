/// The event pump: polling budget, routing by capability, and what happens
/// to events that no longer have anywhere to go.

use std::{sync::Arc, time::Duration};

use verse_client::{
    Capabilities, Capability, Command, NodeId, NodeKind, NodeOwner, Observer, Verse, VerseEvent,
};
use verse_test::{auto_verse, connected_session, pump, scripted_verse, Observed, RecordingObserver};

fn ping(message: &str) -> VerseEvent {
    VerseEvent::Ping {
        address: "10.4.0.1".to_string(),
        message: message.to_string(),
    }
}

#[test]
fn timeout_is_split_across_contexts() {
    let (verse, peer) = scripted_verse();
    let first = verse.session_at("10.4.0.2");
    let second = verse.session_at("10.4.0.3");
    let first_id = first.connect("tester", "secret", None).unwrap();
    let second_id = second.connect("tester", "secret", None).unwrap();
    peer.clear_polls();

    verse.update(Duration::from_millis(300)).unwrap();

    let slice = Duration::from_millis(100);
    assert_eq!(
        peer.polls(),
        vec![(None, slice), (Some(first_id), slice), (Some(second_id), slice)]
    );
}

#[test]
fn default_update_uses_configured_timeout() {
    let (verse, peer) = scripted_verse();

    verse.update_default().unwrap();

    assert_eq!(peer.polls(), vec![(None, Duration::from_millis(100))]);
}

#[test]
fn observers_only_hear_declared_capabilities() {
    let (verse, peer) = scripted_verse();
    let pings = RecordingObserver::new(Capabilities::from(Capability::Ping));
    let everything = RecordingObserver::all();
    verse.add_observer(pings.clone());
    verse.add_observer(everything.clone());

    peer.push_event(None, ping("one"));
    peer.push_event(
        None,
        VerseEvent::Connect {
            name: "visitor".to_string(),
            pass: "secret".to_string(),
            address: "10.4.0.4".to_string(),
            expected_host_id: None,
        },
    );
    assert!(everything.seen().is_empty());
    assert_eq!(pump(&verse), 2);

    let one = Observed::Ping {
        address: "10.4.0.1".to_string(),
        message: "one".to_string(),
    };
    assert_eq!(pings.seen(), vec![one.clone()]);
    assert_eq!(
        everything.seen(),
        vec![
            one,
            Observed::Connect {
                name: "visitor".to_string(),
                address: "10.4.0.4".to_string()
            }
        ]
    );
}

#[test]
fn observers_are_added_once_and_can_be_removed() {
    let (verse, peer) = scripted_verse();
    let observer = RecordingObserver::all();

    let key = verse.add_observer(observer.clone());
    assert_eq!(verse.add_observer(observer.clone()), key);
    assert_eq!(verse.observer_count(), 1);

    peer.push_event(None, ping("heard"));
    pump(&verse);
    assert_eq!(observer.take().len(), 1);

    assert!(verse.remove_observer(&key).is_some());
    assert!(verse.remove_observer(&key).is_none());
    peer.push_event(None, ping("unheard"));
    pump(&verse);
    assert!(observer.seen().is_empty());
}

#[test]
fn events_without_a_target_are_dropped() {
    let (verse, peer) = scripted_verse();
    let observer = RecordingObserver::all();
    verse.add_observer(observer.clone());
    let create = VerseEvent::NodeCreate {
        node: NodeId::new(9),
        kind: NodeKind::Text,
        owner: NodeOwner::Other,
    };

    peer.push_event(None, create.clone());
    peer.push_event(
        None,
        VerseEvent::NodeNameSet {
            node: NodeId::new(9),
            name: "ghost".to_string(),
        },
    );

    assert_eq!(pump(&verse), 2);
    assert_eq!(verse.node_count().unwrap(), 0);
    assert!(observer.seen().is_empty());
}

#[test]
fn events_for_destroyed_nodes_are_dropped() {
    let (verse, peer) = auto_verse();
    let session = connected_session(&verse, "10.4.0.5");
    let id = session.id();
    let node = session.create_node(NodeKind::Audio, |_| {}).unwrap();
    pump(&verse);
    let node_id = node.id().unwrap();
    session.destroy_node(&node).unwrap();
    pump(&verse);
    assert!(node.is_destroyed());

    let observer = RecordingObserver::all();
    verse.add_observer(observer.clone());
    peer.push_event(
        id,
        VerseEvent::NodeNameSet {
            node: node_id,
            name: "too late".to_string(),
        },
    );
    peer.push_event(id, VerseEvent::NodeDestroy { node: node_id });
    pump(&verse);

    assert_eq!(node.name(), "");
    assert!(observer.seen().is_empty());
}

#[test]
fn index_subscriptions_reach_observers() {
    let (verse, peer) = auto_verse();
    let session = connected_session(&verse, "10.4.0.6");
    let observer = RecordingObserver::all();
    verse.add_observer(observer.clone());

    peer.push_event(
        session.id(),
        VerseEvent::NodeIndexSubscribe {
            mask: NodeKind::index_mask(&[NodeKind::Bitmap, NodeKind::Object]),
        },
    );
    pump(&verse);

    assert_eq!(
        observer.seen(),
        vec![Observed::NodeIndexSubscribe {
            session: session.id(),
            kinds: vec![NodeKind::Object, NodeKind::Bitmap]
        }]
    );
}

struct PingBack {
    verse: Verse,
}

impl Observer for PingBack {
    fn capabilities(&self) -> Capabilities {
        Capability::Ping.into()
    }

    fn on_ping(&self, address: &str, message: &str) {
        if message != "pong" {
            self.verse.ping(address, "pong").unwrap();
        }
    }
}

#[test]
fn observers_may_issue_commands() {
    let (verse, peer) = scripted_verse();
    let key = verse.add_observer(Arc::new(PingBack {
        verse: verse.clone(),
    }));

    peer.push_event(None, ping("ping"));
    pump(&verse);

    assert_eq!(
        peer.sent(),
        vec![(
            None,
            Command::Ping {
                address: "10.4.0.1".to_string(),
                message: "pong".to_string()
            }
        )]
    );
    verse.remove_observer(&key);
}
