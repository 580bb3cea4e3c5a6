/// A server hosting connections on a scripted runtime: host id storage,
/// accepting peers, serving node index subscriptions and shutting down.

use std::{fs, path::PathBuf, sync::Arc};

use verse_client::{
    Command, HostId, NodeId, NodeKind, NodeLifecycle, NodeOwner, SessionId, Verse, VerseError,
    VerseEvent,
};
use verse_server::{Server, ServerConfig, ServerError};
use verse_shared::HOST_ID_SIZE;
use verse_test::{peer_host_id, pump, scripted_verse, LocalPeer};

fn init_logger() {
    env_logger::builder().is_test(true).try_init().ok();
}

// A host id path no other test uses, with nothing there yet.
fn host_id_path(test: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "verse-server-{}-{}.hostid",
        std::process::id(),
        test
    ));
    fs::remove_file(&path).ok();
    path
}

fn start(test: &str) -> (Verse, LocalPeer, Arc<Server>, PathBuf) {
    let (verse, peer) = scripted_verse();
    let path = host_id_path(test);
    let server = Server::new(
        ServerConfig {
            host_id_path: path.clone(),
        },
        &verse,
    )
    .unwrap();
    server.run().unwrap();
    (verse, peer, server, path)
}

fn connect(peer: &LocalPeer, address: &str, expected_host_id: Option<HostId>) {
    peer.push_event(
        None,
        VerseEvent::Connect {
            name: "visitor".to_string(),
            pass: "secret".to_string(),
            address: address.to_string(),
            expected_host_id,
        },
    );
}

#[test]
fn host_id_is_stored_then_reloaded() {
    init_logger();
    let (verse, peer) = scripted_verse();
    let path = host_id_path("reload");
    let config = ServerConfig {
        host_id_path: path.clone(),
    };

    let first = Server::new(config.clone(), &verse).unwrap();

    let stored = fs::read(&path).unwrap();
    assert_eq!(stored.len(), HOST_ID_SIZE);
    assert_eq!(stored, first.host_id().as_bytes());
    assert_eq!(peer.host_id().as_ref(), Some(first.host_id()));
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    // a fresh id from this runtime would differ, so equality means it was read
    let (other_verse, other_peer) = scripted_verse();
    other_verse.create_host_id().unwrap();
    let second = Server::new(config, &other_verse).unwrap();

    assert_eq!(second.host_id(), first.host_id());
    assert_eq!(other_peer.host_id().as_ref(), Some(first.host_id()));
    fs::remove_file(&path).ok();
}

#[test]
fn truncated_host_id_file_is_rejected() {
    let (verse, _peer) = scripted_verse();
    let path = host_id_path("truncated");
    fs::write(&path, [7u8; 10]).unwrap();

    let result = Server::new(
        ServerConfig {
            host_id_path: path.clone(),
        },
        &verse,
    );

    assert!(matches!(
        result,
        Err(ServerError::Verse(VerseError::HostIdTooShort {
            expected: HOST_ID_SIZE,
            actual: 10
        }))
    ));
    fs::remove_file(&path).ok();
}

#[test]
fn one_server_runs_per_runtime() {
    let (verse, _peer, server, path) = start("running");
    assert!(server.is_running());
    assert!(verse.has_host());
    assert!(matches!(server.run(), Err(ServerError::AlreadyRunning)));

    let other_path = host_id_path("running-other");
    let other = Server::new(
        ServerConfig {
            host_id_path: other_path.clone(),
        },
        &verse,
    )
    .unwrap();
    assert!(matches!(other.run(), Err(ServerError::AlreadyRunning)));
    assert!(!other.is_running());

    server.shutdown("done").unwrap();
    assert!(!server.is_running());
    assert!(!verse.has_host());
    assert!(matches!(
        server.shutdown("again"),
        Err(ServerError::NotRunning)
    ));

    other.run().unwrap();
    other.shutdown("done").unwrap();
    fs::remove_file(&path).ok();
    fs::remove_file(&other_path).ok();
}

#[test]
fn connect_request_is_accepted_with_an_avatar() {
    init_logger();
    let (verse, peer, server, path) = start("accept");

    connect(&peer, "10.5.0.1", None);
    pump(&verse);

    let connection = server.connection("10.5.0.1").unwrap();
    assert_eq!(connection.user(), "visitor");
    let avatar = connection.avatar();
    assert_eq!(avatar.kind(), NodeKind::Object);
    assert_eq!(avatar.id(), Some(NodeId::new(0)));
    assert_eq!(avatar.session(), connection.session().id());
    assert!(connection.session().is_connected());
    assert_eq!(connection.session().avatar(), Some(NodeId::new(0)));
    assert_eq!(connection.session().host_id().as_ref(), Some(server.host_id()));
    assert_eq!(server.node(NodeId::new(0)).as_ref(), Some(avatar));
    assert_eq!(verse.session_count().unwrap(), 1);

    // a repeated request from the same address is ignored
    connect(&peer, "10.5.0.1", None);
    pump(&verse);
    assert_eq!(server.connection_count(), 1);
    assert_eq!(server.node_count(), 1);

    server.shutdown("done").unwrap();
    fs::remove_file(&path).ok();
}

#[test]
fn connect_request_must_expect_this_host() {
    let (verse, peer, server, path) = start("expected-host");

    connect(&peer, "10.5.0.2", Some(peer_host_id()));
    pump(&verse);
    assert!(server.connection("10.5.0.2").is_none());

    connect(&peer, "10.5.0.3", Some(HostId::wildcard()));
    connect(&peer, "10.5.0.4", Some(server.host_id().clone()));
    pump(&verse);
    assert!(server.connection("10.5.0.3").is_some());
    assert!(server.connection("10.5.0.4").is_some());

    server.shutdown("done").unwrap();
    fs::remove_file(&path).ok();
}

#[test]
fn stopped_server_ignores_connect_requests() {
    let (verse, peer, server, path) = start("stopped");
    server.shutdown("closed").unwrap();

    connect(&peer, "10.5.0.5", None);
    pump(&verse);

    assert_eq!(server.connection_count(), 0);
    assert_eq!(verse.session_count().unwrap(), 0);
    fs::remove_file(&path).ok();
}

#[test]
fn shutdown_terminates_every_connection() {
    let (verse, peer, server, path) = start("shutdown");
    connect(&peer, "10.5.0.6", None);
    pump(&verse);
    let session: SessionId = server
        .connection("10.5.0.6")
        .and_then(|connection| connection.session().id())
        .unwrap();
    let avatar = server.connection("10.5.0.6").unwrap().avatar().clone();
    assert_eq!(server.node_count(), 1);

    server.shutdown("maintenance").unwrap();

    assert_eq!(server.connection_count(), 0);
    assert_eq!(server.node_count(), 0);
    assert_eq!(verse.node_count().unwrap(), 0);
    assert_eq!(avatar.lifecycle(), NodeLifecycle::Finalized);
    assert_eq!(verse.session_count().unwrap(), 0);
    assert_eq!(peer.destroyed_sessions(), vec![session]);
    assert!(peer.sent().contains(&(
        Some(session),
        Command::ConnectTerminate {
            address: "10.5.0.6".to_string(),
            message: "maintenance".to_string()
        }
    )));
    fs::remove_file(&path).ok();
}

#[test]
fn peer_disconnect_releases_the_avatar() {
    let (verse, peer, server, path) = start("disconnect");
    connect(&peer, "10.5.0.7", None);
    pump(&verse);
    let connection = server.connection("10.5.0.7").unwrap();
    let session = connection.session().id();
    let avatar = connection.avatar().clone();
    drop(connection);

    peer.push_event(
        session,
        VerseEvent::ConnectTerminate {
            address: "10.5.0.7".to_string(),
            message: "bye".to_string(),
        },
    );
    pump(&verse);

    assert!(server.connection("10.5.0.7").is_none());
    assert_eq!(server.node_count(), 0);
    assert_eq!(avatar.lifecycle(), NodeLifecycle::Finalized);
    assert_eq!(verse.lookup_node(NodeId::new(0)).unwrap(), None);

    server.shutdown("done").unwrap();
    fs::remove_file(&path).ok();
}

#[test]
fn index_subscription_announces_held_nodes() {
    init_logger();
    let (verse, peer, server, path) = start("index");
    let text = server.add_node(NodeKind::Text).unwrap();
    let bitmap = server.add_node(NodeKind::Bitmap).unwrap();
    connect(&peer, "10.5.0.8", None);
    pump(&verse);
    let session = server
        .connection("10.5.0.8")
        .and_then(|connection| connection.session().id());
    peer.take_sent();

    let announced = |node: &verse_client::NodeHandle| Command::NodeCreate {
        node: node.id(),
        kind: node.kind(),
        owner: NodeOwner::Other,
    };
    let subscribe = |kinds: &[NodeKind]| {
        peer.push_event(
            session,
            VerseEvent::NodeIndexSubscribe {
                mask: NodeKind::index_mask(kinds),
            },
        );
        pump(&verse);
        peer.take_sent()
    };

    assert_eq!(
        subscribe(&[NodeKind::Text]),
        vec![(session, announced(&text))]
    );
    // only kinds that are new to the subscription are announced
    assert_eq!(
        subscribe(&[NodeKind::Text, NodeKind::Bitmap]),
        vec![(session, announced(&bitmap))]
    );
    assert_eq!(
        server.connection("10.5.0.8").unwrap().subscriptions(),
        &[NodeKind::Text, NodeKind::Bitmap]
    );

    assert!(subscribe(&[]).is_empty());
    assert!(server
        .connection("10.5.0.8")
        .unwrap()
        .subscriptions()
        .is_empty());

    server.shutdown("done").unwrap();
    fs::remove_file(&path).ok();
}

#[test]
fn removed_node_ids_are_reused() {
    let (verse, _peer, server, path) = start("reuse");
    let node = server.add_node(NodeKind::Curve).unwrap();
    let id = node.id().unwrap();

    let removed = server.remove_node(id).unwrap().unwrap();
    assert_eq!(removed.lifecycle(), NodeLifecycle::Finalized);
    assert!(server.remove_node(id).unwrap().is_none());

    let again = server.add_node(NodeKind::Audio).unwrap();
    assert_eq!(again.id(), Some(id));
    assert_eq!(verse.lookup_node(id).unwrap(), Some(again));

    server.shutdown("done").unwrap();
    fs::remove_file(&path).ok();
}
