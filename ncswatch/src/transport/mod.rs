//! Transport layer: SSH (via russh) and telnet byte streams.
//!
//! This module provides the low-level connection management, handling
//! connection setup, authentication, and raw reads and writes. Everything
//! above it sees a [`Transport`] and does not care which protocol is behind it.

pub mod config;
mod ssh;
pub mod ssh_config;
mod telnet;

use tokio::io::{AsyncRead, AsyncWrite};

pub use config::{AuthMethod, HostKeyVerification, SshConfig};
pub use ssh::{SshShell, SshTransport};
pub use ssh_config::{HostParams, OpenSshConfig};
pub use telnet::TelnetTransport;

use crate::error::Result;

/// Byte stream usable underneath the telnet transport.
pub trait IoStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> IoStream for T {}

/// Boxed byte stream.
pub type BoxedStream = Box<dyn IoStream>;

/// Protocol used to reach a device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransportKind {
    #[default]
    Ssh,
    Telnet,
}

impl TransportKind {
    /// Well-known port for the protocol.
    pub fn default_port(self) -> u16 {
        match self {
            TransportKind::Ssh => 22,
            TransportKind::Telnet => 23,
        }
    }
}

/// An open interactive byte channel to a device.
pub enum Transport {
    /// SSH shell channel with a PTY.
    Ssh(SshShell),

    /// Telnet session.
    Telnet(TelnetTransport),
}

impl Transport {
    /// Write raw bytes.
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Transport::Ssh(shell) => shell.write(data).await,
            Transport::Telnet(telnet) => telnet.write(data).await,
        }
    }

    /// Read the next chunk of output, `None` once the remote side closed.
    pub async fn read(&mut self) -> Result<Option<Vec<u8>>> {
        match self {
            Transport::Ssh(shell) => shell.read().await,
            Transport::Telnet(telnet) => telnet.read().await,
        }
    }

    /// Close the underlying connection.
    pub async fn close(self) -> Result<()> {
        match self {
            Transport::Ssh(shell) => shell.close().await,
            Transport::Telnet(telnet) => telnet.close().await,
        }
    }

    /// Whether this transport needs an in-band username/password login.
    pub fn needs_login(&self) -> bool {
        matches!(self, Transport::Telnet(_))
    }
}
