//! Transport-agnostic shell streams and the connector seam.

use std::fmt;
use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};

use super::config::SshConfig;
use super::ssh::SshTransport;
use crate::error::Result;

/// Boxed output half of a remote shell.
pub type ShellReader = Box<dyn AsyncRead + Send + Unpin>;

/// Boxed input half of a remote shell.
pub type ShellWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// An interactive shell on a remote device: an input stream, an output
/// stream and whatever the transport learned while connecting.
pub struct Shell {
    pub(crate) reader: ShellReader,
    pub(crate) writer: ShellWriter,
    pub(crate) banner: Option<String>,
    pub(crate) transport: Option<SshTransport>,
}

impl Shell {
    /// Build a shell from any pair of byte streams.
    ///
    /// This lets in-memory pipes or other transports stand in for SSH.
    pub fn from_io<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
            banner: None,
            transport: None,
        }
    }

    /// Attach a transport-level banner.
    pub fn with_banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = Some(banner.into());
        self
    }

    /// The transport-level banner, if one was received.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }
}

impl fmt::Debug for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shell")
            .field("banner", &self.banner)
            .field("ssh", &self.transport.is_some())
            .finish()
    }
}

/// Opens interactive shells for sessions.
pub trait Connector: Send + Sync {
    /// Dial, authenticate and start a shell on a PTY.
    fn connect(&self, config: &SshConfig) -> impl Future<Output = Result<Shell>> + Send;
}

/// The russh-backed connector.
#[derive(Debug, Clone, Copy, Default)]
pub struct SshConnector;

impl Connector for SshConnector {
    async fn connect(&self, config: &SshConfig) -> Result<Shell> {
        let transport = SshTransport::connect(config.clone()).await?;
        let channel = transport.open_channel().await?;
        let banner = transport.banner();
        let (reader, writer) = tokio::io::split(channel.into_stream());

        Ok(Shell {
            reader: Box::new(reader),
            writer: Box::new(writer),
            banner,
            transport: Some(transport),
        })
    }
}
