use std::time::Duration;

use verse_client::{Session, Verse, VerseConfig};

use crate::local_transport::{LocalPeer, LocalTransport};

/// A runtime whose peer acknowledges everything on its own.
pub fn auto_verse() -> (Verse, LocalPeer) {
    let (transport, peer) = LocalTransport::auto_acknowledging();
    (Verse::new(VerseConfig::default(), transport), peer)
}

/// A runtime that only sees the events the test pushes.
pub fn scripted_verse() -> (Verse, LocalPeer) {
    let (transport, peer) = LocalTransport::scripted();
    (Verse::new(VerseConfig::default(), transport), peer)
}

/// Pumps once without waiting, returning how many events were pumped.
pub fn pump(verse: &Verse) -> usize {
    verse.update(Duration::ZERO).unwrap()
}

/// Connects a new session to `address` through an auto-acknowledging peer
/// and pumps until the peer's acceptance has been seen.
pub fn connected_session(verse: &Verse, address: &str) -> Session {
    let session = verse.session_at(address);
    session.connect("tester", "secret", None).unwrap();
    pump(verse);
    assert!(session.is_connected(), "{:?} was not accepted", session);
    session
}
