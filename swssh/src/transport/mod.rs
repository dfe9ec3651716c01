//! SSH transport layer wrapping russh.
//!
//! This module provides the low-level SSH connection management,
//! handling connection setup, authentication and PTY shell creation,
//! plus the [`Connector`] seam sessions use to obtain a shell.

pub mod config;
mod shell;
mod ssh;

pub use config::{AuthMethod, HostKeyVerification, SshConfig};
pub use shell::{Connector, Shell, ShellReader, ShellWriter, SshConnector};
pub use ssh::SshTransport;
