use std::sync::{Mutex, Weak};

use log::debug;

use verse_shared::{
    Command, CommandSender, IdentityRegistry, NodeHandle, NodeId, SessionId, VerseError,
};

use crate::session::SessionInner;

pub(crate) type SessionRegistry = IdentityRegistry<SessionId, Weak<SessionInner>>;
pub(crate) type NodeRegistry = IdentityRegistry<NodeId, NodeHandle>;

struct GateState {
    sender: Box<dyn CommandSender>,
    selected: Option<SessionId>,
    nodes: NodeRegistry,
    sessions: SessionRegistry,
}

/// Serializes every command the runtime issues.
///
/// The transport has one ambient "current session" selector. Selecting a
/// session and sending on it must happen as one step, so both happen under
/// this one mutex, together with every registry access.
pub struct CommandGate {
    state: Mutex<GateState>,
}

impl CommandGate {
    pub(crate) fn new(sender: Box<dyn CommandSender>) -> Self {
        Self {
            state: Mutex::new(GateState {
                sender,
                selected: None,
                nodes: NodeRegistry::new(),
                sessions: SessionRegistry::new(),
            }),
        }
    }

    /// Runs `body` with `session` selected as the ambient context. No other
    /// caller can select a session or issue a command until `body` returns.
    pub fn with_session<R>(
        &self,
        session: Option<SessionId>,
        body: impl FnOnce(&mut GateContext<'_>) -> Result<R, VerseError>,
    ) -> Result<R, VerseError> {
        self.enter(Some(session), body)
    }

    /// Runs `body` under the gate without touching the ambient selector.
    pub(crate) fn with_gate<R>(
        &self,
        body: impl FnOnce(&mut GateContext<'_>) -> Result<R, VerseError>,
    ) -> Result<R, VerseError> {
        self.enter(None, body)
    }

    fn enter<R>(
        &self,
        selection: Option<Option<SessionId>>,
        body: impl FnOnce(&mut GateContext<'_>) -> Result<R, VerseError>,
    ) -> Result<R, VerseError> {
        let mut released = Vec::new();
        let result = {
            let mut guard = self
                .state
                .lock()
                .map_err(|_| VerseError::LockPoisoned {
                    lock: "command gate",
                })?;
            let state = &mut *guard;
            if let Some(session) = selection {
                if state.selected != session {
                    debug!("Selecting {:?}", session);
                }
                state.selected = session;
                state.sender.select_session(session);
            }
            let mut context = GateContext {
                state,
                released: &mut released,
            };
            body(&mut context)
        };
        // Whatever the body set aside may own the last handle of a session,
        // whose finalization re-enters the gate.
        drop(released);
        result
    }
}

/// Access granted while the command gate is held.
pub struct GateContext<'g> {
    state: &'g mut GateState,
    released: &'g mut Vec<Box<dyn Send>>,
}

impl<'g> GateContext<'g> {
    pub fn selected_session(&self) -> Option<SessionId> {
        self.state.selected
    }

    /// Sends `command` on the selected session.
    pub fn send(&mut self, command: Command) -> Result<(), VerseError> {
        debug!(
            "Sending '{}' on {:?}",
            command.name(),
            self.state.selected
        );
        self.state.sender.send(&command)?;
        Ok(())
    }

    pub(crate) fn sender(&mut self) -> &mut dyn CommandSender {
        self.state.sender.as_mut()
    }

    pub(crate) fn nodes(&mut self) -> &mut NodeRegistry {
        &mut self.state.nodes
    }

    pub(crate) fn sessions(&mut self) -> &mut SessionRegistry {
        &mut self.state.sessions
    }

    /// Defers dropping `value` until the gate has been released.
    pub(crate) fn release_later<T: Send + 'static>(&mut self, value: T) {
        self.released.push(Box::new(value));
    }
}
