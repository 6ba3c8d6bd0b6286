//! Byte-stream transports and the factory registry that selects them.
//!
//! Transports only move bytes. Prompt detection, reactions and mode
//! tracking live in the channel and driver layers on top of them.

pub mod config;
#[cfg(test)]
pub(crate) mod mock;
mod registry;
mod ssh;
mod telnet;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub use config::{AuthMethod, CliType, ConnectionParams, HostKeyVerification, SshConfig};
pub use registry::{SessionFactory, SessionRegistry, TransportKind};
pub use ssh::SshTransport;
pub use telnet::{TelnetCodec, TelnetTransport};

use crate::error::Result;

/// A connected byte stream to a device.
#[async_trait]
pub trait Transport: Send {
    /// Write raw bytes to the device.
    async fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Wait for the next chunk of device output.
    ///
    /// Returns `ChannelError::Closed` once the remote side is gone.
    async fn read(&mut self) -> Result<Bytes>;

    /// Close the connection.
    async fn close(&mut self) -> Result<()>;
}

/// How a session reaches the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionKind {
    Ssh,
    Telnet,
    ConsoleSsh,
    ConsoleTelnet,
}

impl SessionKind {
    /// Console sessions go through an out-of-band console port and
    /// survive a device reload.
    pub fn is_console(&self) -> bool {
        matches!(self, SessionKind::ConsoleSsh | SessionKind::ConsoleTelnet)
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionKind::Ssh => "ssh",
            SessionKind::Telnet => "telnet",
            SessionKind::ConsoleSsh => "console-ssh",
            SessionKind::ConsoleTelnet => "console-telnet",
        };
        f.write_str(name)
    }
}
