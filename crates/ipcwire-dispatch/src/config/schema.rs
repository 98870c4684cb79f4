use serde::Deserialize;
use ipcwire_core::error::{IpcError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    pub version: u32,

    #[serde(default)]
    pub decoder: DecoderSection,

    #[serde(default)]
    pub connection: ConnectionSection,
}

impl DispatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(IpcError::UnsupportedVersion);
        }

        self.decoder.validate()?;
        self.connection.validate()?;

        Ok(())
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            version: 1,
            decoder: DecoderSection::default(),
            connection: ConnectionSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecoderSection {
    /// Messages larger than this terminate the peer before decoding.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,

    #[serde(default = "default_max_attachments")]
    pub max_attachments: usize,

    /// Copy transport buffers that are not 8-byte aligned instead of
    /// rejecting them.
    #[serde(default = "default_copy_unaligned")]
    pub copy_unaligned: bool,
}

impl Default for DecoderSection {
    fn default() -> Self {
        Self {
            max_message_bytes: default_max_message_bytes(),
            max_attachments: default_max_attachments(),
            copy_unaligned: default_copy_unaligned(),
        }
    }
}

impl DecoderSection {
    pub fn validate(&self) -> Result<()> {
        if !(64..=268_435_456).contains(&self.max_message_bytes) {
            return Err(IpcError::BadConfig(
                "decoder.max_message_bytes must be between 64 and 268435456".into(),
            ));
        }
        if self.max_attachments > 1024 {
            return Err(IpcError::BadConfig(
                "decoder.max_attachments must be at most 1024".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionSection {
    /// Malformed messages tolerated before the peer is terminated.
    #[serde(default = "default_max_invalid_messages")]
    pub max_invalid_messages: u32,

    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            max_invalid_messages: default_max_invalid_messages(),
            queue_depth: default_queue_depth(),
        }
    }
}

impl ConnectionSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=1000).contains(&self.max_invalid_messages) {
            return Err(IpcError::BadConfig(
                "connection.max_invalid_messages must be between 1 and 1000".into(),
            ));
        }
        if !(1..=65536).contains(&self.queue_depth) {
            return Err(IpcError::BadConfig(
                "connection.queue_depth must be between 1 and 65536".into(),
            ));
        }
        Ok(())
    }
}

fn default_max_message_bytes() -> usize {
    1_048_576
}
fn default_max_attachments() -> usize {
    64
}
fn default_copy_unaligned() -> bool {
    true
}
fn default_max_invalid_messages() -> u32 {
    3
}
fn default_queue_depth() -> usize {
    256
}
