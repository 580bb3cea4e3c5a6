use std::{io, path::PathBuf};

use thiserror::Error as ThisError;

use verse_client::VerseError;

/// Errors produced while hosting connections.
#[derive(Debug, ThisError)]
pub enum ServerError {
    /// This runtime already has a running server
    #[error("A server is already running on this runtime")]
    AlreadyRunning,

    #[error("The server is not running")]
    NotRunning,

    /// Every node id is in use
    #[error("No node id is left to assign")]
    NodeIdsExhausted,

    /// The host id file could not be read or written
    #[error("Host id file '{}': {source}", .path.display())]
    HostIdFile { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Verse(#[from] VerseError),
}
