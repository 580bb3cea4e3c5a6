use std::fmt;

use crate::{constants::HOST_ID_SIZE, error::VerseError};

/// Opaque identity of a Verse host.
///
/// A peer may name the host it expects to reach; the all-zero id is a
/// wildcard that matches any host.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct HostId([u8; HOST_ID_SIZE]);

impl HostId {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VerseError> {
        let actual = bytes.len();
        if actual < HOST_ID_SIZE {
            return Err(VerseError::HostIdTooShort {
                expected: HOST_ID_SIZE,
                actual,
            });
        }
        if actual > HOST_ID_SIZE {
            return Err(VerseError::HostIdTooLong {
                expected: HOST_ID_SIZE,
                actual,
            });
        }

        let mut inner = [0; HOST_ID_SIZE];
        inner.copy_from_slice(bytes);
        Ok(Self(inner))
    }

    pub fn wildcard() -> Self {
        Self([0; HOST_ID_SIZE])
    }

    pub fn is_wildcard(&self) -> bool {
        self.0.iter().all(|byte| *byte == 0)
    }

    /// Whether a peer expecting `self` may connect to a host identified by
    /// `actual`.
    pub fn admits(&self, actual: &HostId) -> bool {
        self.is_wildcard() || self == actual
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for HostId {
    type Error = VerseError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        HostId::from_bytes(bytes)
    }
}

impl fmt::Debug for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostId(")?;
        for byte in &self.0[..4] {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, "..)")
    }
}
