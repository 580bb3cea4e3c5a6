//! # Verse Client
//! A runtime that keeps a local node graph in step with remote Verse
//! sessions. Commands leave through a single serialized gate; inbound events
//! are pumped by [`Verse::update`] and handed to registered observers.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use verse_shared::{
    Capabilities, Capability, Command, CommandSender, ConnectRequest, EventReceiver, HostId,
    NodeCommand, NodeHandle, NodeId, NodeKind, NodeLifecycle, NodeOwner, NodePayload, Observer,
    SessionId, TagGroup, TagGroupId, Transport, TransportError, VerseError, VerseEvent,
};

mod config;
mod dispatch;
mod gate;
mod node_manager;
mod observers;
mod session;
mod verse;

pub use config::VerseConfig;
pub use gate::{CommandGate, GateContext};
pub use observers::ObserverKey;
pub use session::{CreateContinuation, DestroyContinuation, Session, SessionState};
pub use verse::Verse;

/// Name and version of this runtime.
pub fn version_string() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
