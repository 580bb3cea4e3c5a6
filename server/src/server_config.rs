use std::{default::Default, path::PathBuf};

/// Contains Config properties which will be used by the Server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Where the host id is kept between runs. Created on first start.
    pub host_id_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host_id_path: PathBuf::from("hostid.rsa"),
        }
    }
}
