use verse_client::{NodeHandle, NodeKind, Session};

/// A peer the server accepted.
#[derive(Clone, Debug)]
pub struct Connection {
    address: String,
    user: String,
    session: Session,
    avatar: NodeHandle,
    subscriptions: Vec<NodeKind>,
}

impl Connection {
    pub fn new(address: &str, user: &str, session: Session, avatar: NodeHandle) -> Self {
        Self {
            address: address.to_string(),
            user: user.to_string(),
            session,
            avatar,
            subscriptions: Vec::new(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn avatar(&self) -> &NodeHandle {
        &self.avatar
    }

    /// Kinds the peer asked to hear about, in the order it asked.
    pub fn subscriptions(&self) -> &[NodeKind] {
        &self.subscriptions
    }

    /// Adds `kinds` to the subscriptions, returning the ones that were new.
    pub(crate) fn subscribe(&mut self, kinds: &[NodeKind]) -> Vec<NodeKind> {
        let mut added = Vec::new();
        for kind in kinds {
            if !self.subscriptions.contains(kind) {
                self.subscriptions.push(*kind);
                added.push(*kind);
            }
        }
        added
    }

    pub(crate) fn clear_subscriptions(&mut self) {
        self.subscriptions.clear();
    }
}
