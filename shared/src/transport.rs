use std::time::Duration;

use crate::{
    command::{Command, ConnectRequest},
    error::TransportError,
    event::VerseEvent,
    host_id::HostId,
    types::{NodeId, SessionId},
};

/// The wire side of the runtime: framing, encoding and retransmission all
/// live behind these traits.
pub trait Transport: Send {
    /// Splits the transport into the half the command gate owns and the
    /// half the event pump owns.
    fn open(self: Box<Self>) -> (Box<dyn CommandSender>, Box<dyn EventReceiver>);
}

/// Outbound half. Every method is called with the command gate held, after
/// the ambient session has been selected.
pub trait CommandSender: Send {
    /// Points the ambient protocol context at `session`, or at no session.
    fn select_session(&mut self, session: Option<SessionId>);

    /// Opens a connection and returns its handle.
    fn connect(&mut self, request: &ConnectRequest) -> Result<SessionId, TransportError>;

    /// Accepts a peer's connection request, as a host.
    fn accept(
        &mut self,
        avatar: NodeId,
        address: &str,
        host_id: &HostId,
    ) -> Result<SessionId, TransportError>;

    /// Sends a command on the selected session.
    fn send(&mut self, command: &Command) -> Result<(), TransportError>;

    fn destroy_session(&mut self, session: SessionId);

    fn create_host_id(&mut self) -> HostId;

    fn set_host_id(&mut self, host_id: &HostId);

    fn set_port(&mut self, port: u16);
}

/// Inbound half, drained by the event pump.
pub trait EventReceiver: Send {
    /// Returns the events pending in one protocol context, waiting at most
    /// `timeout` for the first one.
    fn poll(
        &mut self,
        context: Option<SessionId>,
        timeout: Duration,
    ) -> Result<Vec<VerseEvent>, TransportError>;
}
