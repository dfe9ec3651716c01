//! What to run, and where.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use crate::driver::SaveState;
use crate::error::{DriverError, Error};
use crate::platform::Vendor;
use crate::transport::{AuthMethod, SshConfig};

fn secs<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
    u64::deserialize(d).map(Duration::from_secs)
}

fn opt_secs<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
    Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
}

fn opt_secret<'de, D: Deserializer<'de>>(d: D) -> Result<Option<SecretString>, D::Error> {
    Ok(Option::<String>::deserialize(d)?.map(SecretString::from))
}

/// Re-run a plan at a fixed interval.
///
/// Durations are given in seconds when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepeatPolicy {
    /// Pause between two runs.
    #[serde(deserialize_with = "secs")]
    pub interval: Duration,

    /// Stop repeating once this much time has passed since the first
    /// run started. `None` repeats until the task is dropped.
    #[serde(default, deserialize_with = "opt_secs")]
    pub duration: Option<Duration>,
}

/// Commands and options applied to every host of a run.
///
/// Timeouts are given in seconds when deserialized.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommandPlan {
    /// Commands for every host, in order.
    pub commands: Vec<String>,

    /// Commands per vendor, used when `commands` is empty.
    pub vendor_commands: HashMap<Vendor, Vec<String>>,

    /// Vendor to assume for hosts that do not name one.
    pub vendor: Option<Vendor>,

    /// Named transaction to run after the commands.
    pub transaction: Option<String>,

    /// Save the running configuration at the end.
    pub save_config: bool,

    /// Wait for the prompt after every command instead of idle-reading.
    pub strict: bool,

    /// Prompt timeout per command in strict mode.
    #[serde(deserialize_with = "secs")]
    pub command_timeout: Duration,

    /// Pause after every command outside strict mode.
    #[serde(deserialize_with = "secs")]
    pub command_interval: Duration,

    /// Prepare the session and turn off paging before running anything.
    pub disable_paging: bool,

    /// Strip the echoed command and trailing prompt from each output.
    pub pretty: bool,

    /// Repeat the run.
    pub repeat: Option<RepeatPolicy>,
}

impl Default for CommandPlan {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            vendor_commands: HashMap::new(),
            vendor: None,
            transaction: None,
            save_config: false,
            strict: false,
            command_timeout: Duration::from_secs(10),
            command_interval: Duration::from_secs(2),
            disable_paging: true,
            pretty: false,
            repeat: None,
        }
    }
}

impl CommandPlan {
    /// A plan running `commands` on every host.
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            commands: commands.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Set the commands for one vendor.
    pub fn with_vendor_commands<I, S>(mut self, vendor: Vendor, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vendor_commands
            .insert(vendor, commands.into_iter().map(Into::into).collect());
        self
    }

    /// Assume `vendor` unless a host says otherwise.
    pub fn with_vendor(mut self, vendor: Vendor) -> Self {
        self.vendor = Some(vendor);
        self
    }

    /// Run a named transaction after the commands.
    pub fn with_transaction(mut self, name: impl Into<String>) -> Self {
        self.transaction = Some(name.into());
        self
    }

    /// Save the running configuration at the end.
    pub fn save_config(mut self, save: bool) -> Self {
        self.save_config = save;
        self
    }

    /// Wait up to `timeout` for the prompt after each command.
    pub fn strict(mut self, timeout: Duration) -> Self {
        self.strict = true;
        self.command_timeout = timeout;
        self
    }

    /// Pause between commands outside strict mode.
    pub fn command_interval(mut self, interval: Duration) -> Self {
        self.command_interval = interval;
        self
    }

    /// Whether to prepare the session and disable paging first.
    pub fn disable_paging(mut self, enabled: bool) -> Self {
        self.disable_paging = enabled;
        self
    }

    /// Strip echoes and prompts from the output.
    pub fn pretty(mut self, enabled: bool) -> Self {
        self.pretty = enabled;
        self
    }

    /// Repeat the run.
    pub fn repeat(mut self, policy: RepeatPolicy) -> Self {
        self.repeat = Some(policy);
        self
    }

    /// The commands to run on a device of `vendor`.
    pub fn commands_for(&self, vendor: Vendor) -> &[String] {
        if !self.commands.is_empty() {
            return &self.commands;
        }
        self.vendor_commands
            .get(&vendor)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether anything at all will be sent after connecting.
    pub fn has_work(&self, vendor: Vendor) -> bool {
        !self.commands_for(vendor).is_empty() || self.transaction.is_some() || self.save_config
    }
}

/// One host to run against, with optional per-host overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct HostTarget {
    /// Hostname or address.
    pub host: String,

    /// SSH port.
    #[serde(default)]
    pub port: Option<u16>,

    /// Vendor, skipping detection.
    #[serde(default)]
    pub vendor: Option<Vendor>,

    /// Login name.
    #[serde(default)]
    pub username: Option<String>,

    /// Login password.
    #[serde(default, deserialize_with = "opt_secret")]
    pub password: Option<SecretString>,
}

impl HostTarget {
    /// A target using the run's defaults for everything but the host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            vendor: None,
            username: None,
            password: None,
        }
    }

    /// Skip vendor detection for this host.
    pub fn with_vendor(mut self, vendor: Vendor) -> Self {
        self.vendor = Some(vendor);
        self
    }

    /// Log in with different credentials than the run's defaults.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// The session configuration for this host, starting from `template`.
    ///
    /// A per-host password replaces the template's authentication method.
    pub fn config(&self, template: &SshConfig) -> SshConfig {
        let mut config = template.clone();
        config.host = self.host.clone();
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(username) = &self.username {
            config.username = username.clone();
        }
        if let Some(password) = &self.password {
            config.auth = AuthMethod::Password(password.clone());
        }
        config
    }
}

impl FromStr for HostTarget {
    type Err = Error;

    /// Parse `host` or `host:port`. A bare IPv6 address is taken as a host.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = |message: String| Error::from(DriverError::InvalidConfig { message });

        if s.is_empty() {
            return Err(invalid("Empty host".to_string()));
        }

        match s.split_once(':') {
            Some((host, port)) if !port.contains(':') => {
                if host.is_empty() {
                    return Err(invalid(format!("Missing host in '{}'", s)));
                }
                let port = port
                    .parse()
                    .map_err(|_| invalid(format!("Invalid port in '{}'", s)))?;
                Ok(Self {
                    port: Some(port),
                    ..Self::new(host)
                })
            }
            _ => Ok(Self::new(s)),
        }
    }
}

/// What happened on one host.
#[derive(Debug)]
pub struct HostReport {
    /// The target host.
    pub host: String,

    /// Vendor used for the run, if it was known or detected.
    pub vendor: Option<Vendor>,

    /// Collected output of the last run, including partial output of a
    /// failed command.
    pub output: String,

    /// The first error that stopped work on this host.
    pub error: Option<Error>,

    /// Where the configuration save ended, if one was attempted.
    pub saved: Option<SaveState>,
}

impl HostReport {
    pub(crate) fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            vendor: None,
            output: String::new(),
            error: None,
            saved: None,
        }
    }

    pub(crate) fn failed(host: impl Into<String>, error: Error) -> Self {
        Self {
            error: Some(error),
            ..Self::new(host)
        }
    }

    /// No error occurred and any attempted save succeeded.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.saved.is_none_or(|s| s.is_success())
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_plan_defaults() {
        let plan = CommandPlan::default();
        assert!(plan.disable_paging);
        assert!(!plan.strict);
        assert_eq!(plan.command_timeout, Duration::from_secs(10));
        assert_eq!(plan.command_interval, Duration::from_secs(2));
        assert!(plan.repeat.is_none());
    }

    #[test]
    fn test_common_commands_win_over_vendor_commands() {
        let plan = CommandPlan::new(["show clock"])
            .with_vendor_commands(Vendor::Huawei, ["display clock"]);
        assert_eq!(plan.commands_for(Vendor::Huawei), ["show clock"]);

        let plan = CommandPlan::default()
            .with_vendor_commands(Vendor::Huawei, ["display clock"]);
        assert_eq!(plan.commands_for(Vendor::Huawei), ["display clock"]);
        assert!(plan.commands_for(Vendor::Nexus).is_empty());
        assert!(plan.has_work(Vendor::Huawei));
        assert!(!plan.has_work(Vendor::Nexus));
    }

    #[test]
    fn test_plan_from_json() {
        let plan: CommandPlan = serde_json::from_str(
            r#"{
                "vendor_commands": {
                    "huawei": ["display version"],
                    "CISCO": ["show version", "show clock"]
                },
                "strict": true,
                "command_timeout": 30,
                "pretty": true,
                "repeat": { "interval": 60, "duration": 3600 }
            }"#,
        )
        .unwrap();

        assert!(plan.strict);
        assert!(plan.pretty);
        assert!(plan.disable_paging);
        assert_eq!(plan.command_timeout, Duration::from_secs(30));
        assert_eq!(plan.commands_for(Vendor::CiscoIos).len(), 2);
        assert_eq!(
            plan.repeat,
            Some(RepeatPolicy {
                interval: Duration::from_secs(60),
                duration: Some(Duration::from_secs(3600)),
            })
        );
    }

    #[test]
    fn test_targets_from_json() {
        let targets: Vec<HostTarget> = serde_json::from_str(
            r#"[
                {"host": "10.0.0.1"},
                {"host": "10.0.0.2", "port": 2222, "vendor": "h3c",
                 "username": "ops", "password": "s3cret"}
            ]"#,
        )
        .unwrap();

        assert_eq!(targets[0].host, "10.0.0.1");
        assert!(targets[0].vendor.is_none());
        assert_eq!(targets[1].port, Some(2222));
        assert_eq!(targets[1].vendor, Some(Vendor::H3c));
        assert_eq!(targets[1].password.as_ref().unwrap().expose_secret(), "s3cret");
    }

    #[test]
    fn test_target_from_str() {
        let target: HostTarget = "10.0.0.1".parse().unwrap();
        assert_eq!(target.host, "10.0.0.1");
        assert_eq!(target.port, None);

        let target: HostTarget = " core-sw1:2222 ".parse().unwrap();
        assert_eq!(target.host, "core-sw1");
        assert_eq!(target.port, Some(2222));

        let target: HostTarget = "fe80::1".parse().unwrap();
        assert_eq!(target.host, "fe80::1");

        assert!("10.0.0.1:ssh".parse::<HostTarget>().is_err());
        assert!(":22".parse::<HostTarget>().is_err());
        assert!("".parse::<HostTarget>().is_err());
    }

    #[test]
    fn test_target_overrides_template() {
        let mut template = SshConfig::new("unused");
        template.username = "admin".to_string();

        let target = HostTarget {
            port: Some(2200),
            ..HostTarget::new("10.0.0.9").with_credentials("ops", "pw")
        };
        let config = target.config(&template);
        assert_eq!(config.socket_addr(), "10.0.0.9:2200");
        assert_eq!(config.username, "ops");
        assert!(matches!(config.auth, AuthMethod::Password(ref p) if p.expose_secret() == "pw"));

        let config = HostTarget::new("10.0.0.10").config(&template);
        assert_eq!(config.username, "admin");
        assert_eq!(config.port, 22);
    }

    #[test]
    fn test_report_success() {
        let mut report = HostReport::new("sw1");
        assert!(report.is_success());
        report.saved = Some(SaveState::TimedOut);
        assert!(!report.is_success());
        let report = HostReport::failed("sw2", DriverError::NotConnected.into());
        assert!(!report.is_success());
    }
}
