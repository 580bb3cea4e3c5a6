mod handle;
mod record;

pub use handle::Session;
pub(crate) use handle::SessionInner;
pub(crate) use record::{PendingCreate, SessionRecord};
pub use record::{CreateContinuation, DestroyContinuation, SessionState};
