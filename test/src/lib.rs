pub mod local_transport;

pub use helpers::*;
pub use local_transport::{peer_host_id, LocalPeer, LocalTransport};
