//! Out-of-band resources transferred alongside a message.

#[cfg(unix)]
use std::os::fd::OwnedFd;

/// A transferable resource handle owned by the decoder until taken.
///
/// Dropping an attachment disposes the resource it owns (descriptors are
/// closed by `OwnedFd`).
#[derive(Debug)]
pub enum Attachment {
    /// Numbered handle whose meaning is defined by the transport.
    Token(u64),
    /// File descriptor passed over a unix socket.
    #[cfg(unix)]
    Descriptor(OwnedFd),
}

impl Attachment {
    pub fn token(&self) -> Option<u64> {
        match self {
            Attachment::Token(t) => Some(*t),
            #[cfg(unix)]
            Attachment::Descriptor(_) => None,
        }
    }

    #[cfg(unix)]
    pub fn into_descriptor(self) -> Option<OwnedFd> {
        match self {
            Attachment::Descriptor(fd) => Some(fd),
            Attachment::Token(_) => None,
        }
    }
}

#[cfg(unix)]
impl From<OwnedFd> for Attachment {
    fn from(fd: OwnedFd) -> Self {
        Attachment::Descriptor(fd)
    }
}
