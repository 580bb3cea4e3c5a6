/// Port a Verse host listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 4950;

/// Address new sessions point at when none is given.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1";

/// Exact width of a host identity, in bytes.
pub const HOST_ID_SIZE: usize = 192;

/// Longest message a ping may carry, in bytes.
pub const MAX_PING_MESSAGE_LEN: usize = 1399;
