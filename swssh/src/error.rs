//! Error types for swssh.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for swssh operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Session/driver-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Vendor/dialect errors
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

impl Error {
    /// Whether this error is a completion timeout (substring or prompt).
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Channel(ChannelError::Timeout { .. } | ChannelError::PromptTimeout { .. })
        )
    }

    /// Whether this error happened while establishing the session.
    pub fn is_connect_error(&self) -> bool {
        matches!(
            self,
            Error::Transport(_)
                | Error::Channel(
                    ChannelError::PtyRequestFailed(_) | ChannelError::ShellRequestFailed(_)
                )
        )
    }

    /// Output captured before the operation failed, if any was kept.
    pub fn partial_output(&self) -> Option<&str> {
        match self {
            Error::Channel(
                ChannelError::Timeout { output, .. }
                | ChannelError::PromptTimeout { output, .. }
                | ChannelError::Disconnected { output },
            ) => Some(output),
            _ => None,
        }
    }
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host is not in known_hosts and verification is strict
    #[error("Host key for {host}:{port} is unknown")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key does not match the known_hosts entry
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Reading or writing known_hosts failed
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Channel layer errors (PTY setup, reading and writing the shell stream).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Failed to allocate a pseudo-terminal
    #[error("Failed to request PTY: {0}")]
    PtyRequestFailed(#[source] russh::Error),

    /// Failed to request shell
    #[error("Failed to request shell: {0}")]
    ShellRequestFailed(#[source] russh::Error),

    /// Expected substring not seen before the deadline
    #[error("Timed out after {timeout:?}, pattern '{expected}' not found in output")]
    Timeout {
        timeout: Duration,
        expected: String,
        output: String,
    },

    /// Prompt not seen on the last line before the deadline
    #[error("Timed out after {timeout:?}, prompt not found in output")]
    PromptTimeout { timeout: Duration, output: String },

    /// The output stream ended (transport closed or broken)
    #[error("Channel closed by remote")]
    Disconnected { output: String },

    /// Writing a command to the remote shell failed
    #[error("Failed to send command '{command}': {source}")]
    WriteFailed {
        command: String,
        #[source]
        source: io::Error,
    },
}

/// Driver layer errors (session lifecycle, vendor operations).
#[derive(Error, Debug)]
pub enum DriverError {
    /// Session not connected
    #[error("Session not connected - call connect() first")]
    NotConnected,

    /// Session already connected
    #[error("Session already connected")]
    AlreadyConnected,

    /// Session was closed and cannot be reused
    #[error("Session closed - create a new session to reconnect")]
    SessionClosed,

    /// Named transaction not defined for this vendor
    #[error("Unsupported transaction '{name}' for {vendor}")]
    UnsupportedTransaction { vendor: String, name: String },

    /// Invalid configuration in the session builder
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A host task ended without producing a report
    #[error("Host task failed: {message}")]
    TaskFailed { message: String },
}

/// Vendor/dialect errors.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Vendor name not recognised
    #[error("Unknown vendor '{name}'")]
    UnknownVendor { name: String },

    /// Every detection stage came back empty
    #[error("Failed to determine vendor of {host}")]
    VendorUndetermined { host: String },
}

/// Result type alias using swssh's Error.
pub type Result<T> = std::result::Result<T, Error>;
