//! # Verse Shared
//! Common functionality shared between verse-server & verse-client crates:
//! protocol identifiers, the node model, events, commands, and the traits a
//! transport implements.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod command;
mod constants;
mod error;
mod event;
mod host_id;
mod node;
mod node_kind;
mod observer;
mod registry;
mod transport;
mod types;

pub use command::{Command, ConnectRequest, NodeCommand};
pub use constants::{DEFAULT_ADDRESS, DEFAULT_PORT, HOST_ID_SIZE, MAX_PING_MESSAGE_LEN};
pub use error::{TransportError, VerseError};
pub use event::{Capabilities, Capability, VerseEvent};
pub use host_id::HostId;
pub use node::{
    AudioBuffer, AudioPayload, BitmapPayload, Curve, CurvePayload, GeometryPayload,
    MaterialPayload, NodeHandle, NodeLifecycle, NodePayload, ObjectLink, ObjectPayload, TagGroup,
    TagGroupId, TextPayload, Transform,
};
pub use node_kind::NodeKind;
pub use observer::Observer;
pub use registry::{Identity, IdentityRegistry};
pub use transport::{CommandSender, EventReceiver, Transport};
pub use types::{NodeId, NodeOwner, SessionId};
