use thiserror::Error as ThisError;

use crate::{node_kind::NodeKind, types::SessionId};

/// Failures reported by a transport implementation.
#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum TransportError {
    /// The underlying connection is gone
    #[error("Transport is disconnected")]
    Disconnected,

    /// A command could not be handed to the wire
    #[error("Failed to send '{command}' command: {reason}")]
    SendFailed {
        command: &'static str,
        reason: String,
    },

    /// The remote end refused a connection attempt
    #[error("Connection to '{address}' was refused: {reason}")]
    ConnectRefused { address: String, reason: String },

    /// The transport has no connection with this handle
    #[error("Transport has no connection for {session}")]
    UnknownSession { session: SessionId },
}

/// Errors produced by the Verse runtime.
#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum VerseError {
    /// An identifier that is immutable once set was assigned a second time
    #[error("{entity} identifier is already {current}, cannot reassign it to {attempted}")]
    IdentityAlreadyAssigned {
        entity: &'static str,
        current: u32,
        attempted: u32,
    },

    /// A peer asserted an identifier that is already registered
    #[error("Duplicate {entity} identifier {id}: already registered")]
    DuplicateIdentity { entity: &'static str, id: u32 },

    /// The entity lacks the session or id the operation needs
    #[error("{entity} is not bound: {reason}")]
    NotBound {
        entity: String,
        reason: &'static str,
    },

    /// A lifecycle-mutating operation targeted a destroyed node
    #[error("{node} has been destroyed, '{operation}' is not permitted")]
    NodeDestroyed {
        node: String,
        operation: &'static str,
    },

    /// A kind-specific operation targeted a node of another kind
    #[error("'{operation}' requires a {expected} node, got a {actual} node")]
    WrongNodeKind {
        operation: &'static str,
        expected: NodeKind,
        actual: NodeKind,
    },

    /// The session is in the wrong state, or the node belongs elsewhere
    #[error("Session error: {reason}")]
    SessionError { reason: String },

    /// The transport could not open a connection
    #[error("Couldn't create connection to '{address}': {source}")]
    ConnectError {
        address: String,
        source: TransportError,
    },

    #[error("Host id is too short: should be {expected} bytes, got {actual}")]
    HostIdTooShort { expected: usize, actual: usize },

    #[error("Host id is too long: should be {expected} bytes, got {actual}")]
    HostIdTooLong { expected: usize, actual: usize },

    #[error("Unknown node type number {type_number}")]
    UnknownNodeKind { type_number: u8 },

    #[error("{what} is too long: limited to {max} bytes, got {actual}")]
    MessageTooLong {
        what: &'static str,
        max: usize,
        actual: usize,
    },

    /// A panic happened while the named lock was held
    #[error("The {lock} lock is poisoned")]
    LockPoisoned { lock: &'static str },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl VerseError {
    /// Fatal errors leave the local model untrustworthy and must not be
    /// retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            VerseError::DuplicateIdentity { .. } | VerseError::LockPoisoned { .. }
        )
    }

    pub fn session(reason: impl Into<String>) -> Self {
        VerseError::SessionError {
            reason: reason.into(),
        }
    }
}
