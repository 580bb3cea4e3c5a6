use log::debug;

use crate::{
    event::Capabilities,
    host_id::HostId,
    node::{NodeHandle, TagGroup},
    node_kind::NodeKind,
    types::{NodeId, SessionId},
};

/// Application callbacks for inbound events.
///
/// Only the hooks whose capability appears in `capabilities()` are called.
/// Hooks run on the thread driving the event pump with no runtime lock held,
/// so they may issue commands; they must not pump events themselves.
pub trait Observer: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    fn on_ping(&self, address: &str, message: &str) {
        debug!("Unhandled ping from '{}': {}", address, message);
    }

    /// A peer asks to connect to this host.
    fn on_connect(&self, name: &str, _pass: &str, address: &str, _expected_host_id: Option<&HostId>) {
        debug!("Unhandled connect from '{}' as '{}'", address, name);
    }

    fn on_connect_accept(&self, session: SessionId, avatar: NodeId, address: &str, _host_id: &HostId) {
        debug!(
            "Unhandled connect_accept on {} from '{}', avatar {}",
            session, address, avatar
        );
    }

    /// `session` is `None` when the notice arrived outside any session.
    fn on_connect_terminate(&self, session: Option<SessionId>, address: &str, message: &str) {
        debug!(
            "Unhandled connect_terminate on {:?} from '{}': {}",
            session, address, message
        );
    }

    /// An empty `kinds` cancels the subscription.
    fn on_node_index_subscribe(&self, session: Option<SessionId>, kinds: &[NodeKind]) {
        debug!("Unhandled node_index_subscribe on {:?}: {:?}", session, kinds);
    }

    fn on_node_create(&self, session: SessionId, node: &NodeHandle) {
        debug!("Unhandled node_create on {}: {}", session, node);
    }

    fn on_node_destroy(&self, session: SessionId, node: &NodeHandle) {
        debug!("Unhandled node_destroy on {}: {}", session, node);
    }

    fn on_node_name_set(&self, node: &NodeHandle, name: &str) {
        debug!("Unhandled node_name_set on {}: '{}'", node, name);
    }

    fn on_tag_group_create(&self, node: &NodeHandle, tag_group: &TagGroup) {
        debug!("Unhandled tag_group_create on {}: {:?}", node, tag_group);
    }

    fn on_tag_group_destroy(&self, node: &NodeHandle, tag_group: &TagGroup) {
        debug!("Unhandled tag_group_destroy on {}: {:?}", node, tag_group);
    }
}
