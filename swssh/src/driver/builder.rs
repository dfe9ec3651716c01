//! Builder for creating sessions.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use super::session::Session;
use crate::error::{DriverError, Result};
use crate::transport::{AuthMethod, Connector, HostKeyVerification, SshConfig, SshConnector};

/// Builder for constructing device sessions.
///
/// # Example
///
/// ```rust,no_run
/// use swssh::SessionBuilder;
///
/// # async fn example() -> Result<(), swssh::Error> {
/// let mut session = SessionBuilder::new("192.168.1.1")
///     .username("admin")
///     .password("secret")
///     .build()?;
/// session.connect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    config: SshConfig,
    username: Option<String>,
}

impl SessionBuilder {
    /// Create a new session builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            config: SshConfig::new(host),
            username: None,
        }
    }

    /// Start from an existing configuration (its username is kept).
    pub fn from_config(config: SshConfig) -> Self {
        let username = Some(config.username.clone()).filter(|u| !u.is_empty());
        Self { config, username }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the username for authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set password authentication.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.auth = AuthMethod::Password(SecretString::from(password.into()));
        self
    }

    /// Set private key authentication. Replaces any password.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.config.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: None,
        };
        self
    }

    /// Set private key authentication with passphrase.
    pub fn private_key_with_passphrase(
        mut self,
        key_path: impl Into<PathBuf>,
        passphrase: impl Into<String>,
    ) -> Self {
        self.config.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: Some(SecretString::from(passphrase.into())),
        };
        self
    }

    /// Set the connection timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set how long an idle-read waits for more output (default: 500ms).
    pub fn idle_wait(mut self, idle_wait: Duration) -> Self {
        self.config.idle_wait = idle_wait;
        self
    }

    /// Set the PTY terminal type (default: `vt100`).
    pub fn terminal_type(mut self, terminal_type: impl Into<String>) -> Self {
        self.config.terminal_type = terminal_type.into();
        self
    }

    /// Set terminal dimensions.
    pub fn terminal_size(mut self, width: u32, height: u32) -> Self {
        self.config.terminal_width = width;
        self.config.terminal_height = height;
        self
    }

    /// Set how many output chunks may wait between reader and session.
    pub fn queue_depth(mut self, depth: usize) -> Self {
        self.config.queue_depth = depth;
        self
    }

    /// Offer CBC/CTR ciphers required by older devices (default: on).
    pub fn legacy_ciphers(mut self, enabled: bool) -> Self {
        self.config.legacy_ciphers = enabled;
        self
    }

    /// Set the host key verification mode.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.config.host_key_verification = mode;
        self
    }

    /// Use a specific known_hosts file.
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.known_hosts_path = Some(path.into());
        self
    }

    /// Validate and produce the final configuration.
    pub fn into_config(self) -> Result<SshConfig> {
        let username = self.username.ok_or_else(|| DriverError::InvalidConfig {
            message: "Username is required".to_string(),
        })?;

        if self.config.queue_depth == 0 {
            return Err(DriverError::InvalidConfig {
                message: "Queue depth must be at least 1".to_string(),
            }
            .into());
        }

        Ok(SshConfig {
            username,
            ..self.config
        })
    }

    /// Build an SSH session.
    ///
    /// This creates the session but does not connect. Call `connect()` on
    /// the returned session to establish the connection.
    pub fn build(self) -> Result<Session<SshConnector>> {
        Ok(Session::new(self.into_config()?))
    }

    /// Build a session over a custom connector.
    pub fn build_with<C: Connector>(self, connector: C) -> Result<Session<C>> {
        Ok(Session::with_connector(self.into_config()?, connector))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_username_required() {
        let err = SessionBuilder::new("10.0.0.1").build().unwrap_err();
        assert!(matches!(err, Error::Driver(DriverError::InvalidConfig { .. })));
    }

    #[test]
    fn test_settings_applied() {
        let config = SessionBuilder::new("10.0.0.1")
            .port(2222)
            .username("netops")
            .password("secret")
            .idle_wait(Duration::from_millis(250))
            .terminal_type("xterm")
            .terminal_size(200, 50)
            .legacy_ciphers(false)
            .into_config()
            .unwrap();

        assert_eq!(config.socket_addr(), "10.0.0.1:2222");
        assert_eq!(config.username, "netops");
        assert!(matches!(config.auth, AuthMethod::Password(_)));
        assert_eq!(config.idle_wait, Duration::from_millis(250));
        assert_eq!(config.terminal_type, "xterm");
        assert_eq!((config.terminal_width, config.terminal_height), (200, 50));
        assert!(!config.legacy_ciphers);
    }

    #[test]
    fn test_private_key_replaces_password() {
        let config = SessionBuilder::new("10.0.0.1")
            .username("netops")
            .password("secret")
            .private_key("/home/netops/.ssh/id_ed25519")
            .into_config()
            .unwrap();
        assert!(matches!(config.auth, AuthMethod::PrivateKey { passphrase: None, .. }));
    }

    #[test]
    fn test_zero_queue_depth_rejected() {
        let err = SessionBuilder::new("10.0.0.1")
            .username("netops")
            .queue_depth(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Driver(DriverError::InvalidConfig { .. })));
    }

    #[test]
    fn test_from_config_keeps_username() {
        let mut config = SshConfig::new("10.0.0.1");
        config.username = "netops".to_string();
        let session = SessionBuilder::from_config(config).build().unwrap();
        assert_eq!(session.config().username, "netops");
        assert_eq!(session.host(), "10.0.0.1");
    }
}
