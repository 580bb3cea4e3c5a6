use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::Path,
};

use log::info;

use verse_client::{HostId, Verse};

use crate::error::ServerError;

/// Reads the host id stored at `path`, or generates one through `verse` and
/// stores it there if the file does not exist yet.
pub fn load_or_create(path: &Path, verse: &Verse) -> Result<HostId, ServerError> {
    match fs::read(path) {
        Ok(bytes) => {
            let host_id = HostId::from_bytes(&bytes)?;
            info!("Loaded host id from '{}'", path.display());
            Ok(host_id)
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            let host_id = verse.create_host_id()?;
            write_new(path, host_id.as_bytes()).map_err(|source| ServerError::HostIdFile {
                path: path.to_path_buf(),
                source,
            })?;
            info!("Created new host id in '{}'", path.display());
            Ok(host_id)
        }
        Err(source) => Err(ServerError::HostIdFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// Never overwrites: a file appearing between the read and the write is an
// error.
fn write_new(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    restrict_to_owner(&mut options);
    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

cfg_if! {
    if #[cfg(unix)] {
        fn restrict_to_owner(options: &mut OpenOptions) {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
    } else {
        fn restrict_to_owner(_options: &mut OpenOptions) {}
    }
}
