use std::time::Duration;

use verse_shared::{DEFAULT_ADDRESS, DEFAULT_PORT};

/// Contains Config properties which will be used by the Verse runtime
#[derive(Clone, Debug)]
pub struct VerseConfig {
    /// Port handed to the transport when the runtime starts.
    pub port: u16,
    /// Address used by `Verse::session_at_default`.
    pub default_address: String,
    /// Budget used by `Verse::update_default`.
    pub default_update_timeout: Duration,
}

impl Default for VerseConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            default_address: DEFAULT_ADDRESS.to_string(),
            default_update_timeout: Duration::from_millis(100),
        }
    }
}
