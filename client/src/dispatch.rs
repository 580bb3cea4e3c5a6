use std::{sync::Weak, time::Duration};

use log::{debug, info};

use verse_shared::{
    Capability, NodeHandle, NodeId, NodeKind, Observer, SessionId, TagGroup, VerseError,
    VerseEvent,
};

use crate::{node_manager, session::Session, verse::Verse};

impl Verse {
    /// Pumps inbound events, waiting at most `timeout` overall.
    ///
    /// The budget is split evenly between the global context and every
    /// registered session. Each event updates the local model, runs any
    /// continuation waiting for it, and is then passed to the observers that
    /// declared its capability. Destroyed nodes nothing refers to any more
    /// are finalized afterwards. Returns how many events were pumped.
    ///
    /// A fatal error means the local model no longer matches the peer's.
    pub fn update(&self, timeout: Duration) -> Result<usize, VerseError> {
        let contexts = self.poll_contexts()?;
        let slices = u32::try_from(contexts.len()).unwrap_or(u32::MAX);
        let slice = timeout / slices;

        let mut pumped = 0;
        for context in contexts {
            let events = {
                let mut receiver =
                    self.runtime
                        .receiver
                        .lock()
                        .map_err(|_| VerseError::LockPoisoned {
                            lock: "event receiver",
                        })?;
                receiver.poll(context, slice)?
            };
            for event in events {
                self.dispatch(context, event)?;
                pumped += 1;
            }
        }

        let finalized = node_manager::finalize_destroyed(&self.runtime.gate)?;
        if finalized > 0 {
            debug!("Finalized {} destroyed nodes", finalized);
        }
        Ok(pumped)
    }

    /// `update` with the configured default timeout.
    pub fn update_default(&self) -> Result<usize, VerseError> {
        self.update(self.runtime.config.default_update_timeout)
    }

    // The global context, then each registered session by id.
    fn poll_contexts(&self) -> Result<Vec<Option<SessionId>>, VerseError> {
        let sessions = self.runtime.gate.with_gate(|ctx| Ok(ctx.sessions().ids()))?;
        Ok(std::iter::once(None)
            .chain(sessions.into_iter().map(Some))
            .collect())
    }

    fn dispatch(&self, context: Option<SessionId>, event: VerseEvent) -> Result<(), VerseError> {
        let capability = event.capability();
        match event {
            VerseEvent::Ping { address, message } => {
                self.notify(capability, |observer| observer.on_ping(&address, &message));
            }
            VerseEvent::Connect {
                name,
                pass,
                address,
                expected_host_id,
            } => {
                self.notify(capability, |observer| {
                    observer.on_connect(&name, &pass, &address, expected_host_id.as_ref())
                });
            }
            VerseEvent::ConnectAccept {
                avatar,
                address,
                host_id,
            } => {
                let Some((session, id)) = self.resolve_session(context, "connect_accept")? else {
                    return Ok(());
                };
                if !session.record().accept(avatar, host_id.clone()) {
                    debug!("Dropping connect_accept for {:?}", session);
                    return Ok(());
                }
                info!("{} accepted by '{}', avatar {}", id, address, avatar);
                self.notify(capability, |observer| {
                    observer.on_connect_accept(id, avatar, &address, &host_id)
                });
            }
            VerseEvent::ConnectTerminate { address, message } => {
                if context.is_some() {
                    let Some((session, _)) = self.resolve_session(context, "connect_terminate")?
                    else {
                        return Ok(());
                    };
                    session.terminated_by_peer(&message)?;
                }
                self.notify(capability, |observer| {
                    observer.on_connect_terminate(context, &address, &message)
                });
            }
            VerseEvent::NodeIndexSubscribe { mask } => {
                let kinds = NodeKind::kinds_from_index_mask(mask);
                self.notify(capability, |observer| {
                    observer.on_node_index_subscribe(context, &kinds)
                });
            }
            VerseEvent::NodeCreate { node, kind, owner } => {
                let Some((session, id)) = self.resolve_session(context, "node_create")? else {
                    return Ok(());
                };
                let settled = node_manager::accept_create(
                    &self.runtime.gate,
                    session.record(),
                    id,
                    node,
                    kind,
                    owner,
                )?;
                let node = settled.run();
                self.notify(capability, |observer| observer.on_node_create(id, &node));
            }
            VerseEvent::NodeDestroy { node } => {
                let Some((session, id)) = self.resolve_session(context, "node_destroy")? else {
                    return Ok(());
                };
                let Some(settled) = node_manager::accept_destroy(
                    &self.runtime.gate,
                    session.record(),
                    id,
                    node,
                )?
                else {
                    return Ok(());
                };
                let node = settled.run();
                self.notify(capability, |observer| observer.on_node_destroy(id, &node));
            }
            VerseEvent::NodeNameSet { node, name } => {
                let Some(node) = self.resolve_node(node, "node_name_set")? else {
                    return Ok(());
                };
                node.set_name(&name);
                self.notify(capability, |observer| observer.on_node_name_set(&node, &name));
            }
            VerseEvent::TagGroupCreate { node, group, name } => {
                let Some(node) = self.resolve_node(node, "tag_group_create")? else {
                    return Ok(());
                };
                let tag_group = TagGroup::new(group, name);
                node.insert_tag_group(tag_group.clone());
                self.notify(capability, |observer| {
                    observer.on_tag_group_create(&node, &tag_group)
                });
            }
            VerseEvent::TagGroupDestroy { node, group } => {
                let Some(node) = self.resolve_node(node, "tag_group_destroy")? else {
                    return Ok(());
                };
                let Some(tag_group) = node.remove_tag_group(group) else {
                    debug!("Dropping tag_group_destroy for unknown group {} on {}", group, node);
                    return Ok(());
                };
                self.notify(capability, |observer| {
                    observer.on_tag_group_destroy(&node, &tag_group)
                });
            }
        }
        Ok(())
    }

    fn resolve_session(
        &self,
        context: Option<SessionId>,
        event: &'static str,
    ) -> Result<Option<(Session, SessionId)>, VerseError> {
        let Some(id) = context else {
            debug!("Dropping {} received outside any session", event);
            return Ok(None);
        };
        let inner = self
            .runtime
            .gate
            .with_gate(|ctx| Ok(ctx.sessions().lookup(&id).and_then(Weak::upgrade)))?;
        match inner {
            Some(inner) => Ok(Some((Session::from_inner(inner), id))),
            None => {
                debug!("Dropping {} for unknown {}", event, id);
                Ok(None)
            }
        }
    }

    // Destroyed nodes keep their registry entry until finalized, but no
    // longer take updates.
    fn resolve_node(&self, id: NodeId, event: &'static str) -> Result<Option<NodeHandle>, VerseError> {
        let node = self.lookup_node(id)?;
        match node {
            Some(node) if !node.is_destroyed() => Ok(Some(node)),
            Some(node) => {
                debug!("Dropping {} for {:?}", event, node);
                Ok(None)
            }
            None => {
                debug!("Dropping {} for unknown {}", event, id);
                Ok(None)
            }
        }
    }

    fn notify(&self, capability: Capability, mut call: impl FnMut(&dyn Observer)) {
        let observers = self.runtime.observers().interested(capability);
        for observer in observers {
            call(observer.as_ref());
        }
    }
}
