//! Scripted in-memory devices for tests.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use crate::error::{Result, TransportError};
use crate::transport::{Connector, Shell, SshConfig};

/// A fake switch on the far side of an in-memory pipe.
///
/// Every received line is recorded. Lines with a scripted reply get that
/// reply (chunk by chunk, each after its delay); anything else gets the
/// echoed line followed by the prompt.
#[derive(Clone)]
pub(crate) struct FakeDevice {
    prompt: String,
    welcome: String,
    banner: Option<String>,
    replies: HashMap<String, Vec<(Duration, String)>>,
    connect_delay: Duration,
    fail_connect: bool,
    hangup: Option<String>,
    received: Arc<Mutex<Vec<String>>>,
}

impl FakeDevice {
    pub(crate) fn new(prompt: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            welcome: format!("\r\n{}", prompt),
            banner: None,
            replies: HashMap::new(),
            connect_delay: Duration::ZERO,
            fail_connect: false,
            hangup: None,
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn welcome(mut self, welcome: &str) -> Self {
        self.welcome = welcome.to_string();
        self
    }

    pub(crate) fn banner(mut self, banner: &str) -> Self {
        self.banner = Some(banner.to_string());
        self
    }

    /// Reply to `command` with `output` immediately.
    pub(crate) fn reply(self, command: &str, output: &str) -> Self {
        self.reply_chunks(command, &[(Duration::ZERO, output)])
    }

    /// Reply to `command` with several delayed chunks.
    pub(crate) fn reply_chunks(mut self, command: &str, chunks: &[(Duration, &str)]) -> Self {
        self.replies.insert(
            command.to_string(),
            chunks.iter().map(|(d, s)| (*d, s.to_string())).collect(),
        );
        self
    }

    /// Swallow `command` without printing anything.
    pub(crate) fn silent(mut self, command: &str) -> Self {
        self.replies.insert(command.to_string(), Vec::new());
        self
    }

    /// Drop the connection after replying to `command`.
    pub(crate) fn hangup(mut self, command: &str) -> Self {
        self.hangup = Some(command.to_string());
        self
    }

    pub(crate) fn connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    pub(crate) fn refuse_connections(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Every line the device received so far.
    pub(crate) fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }

    fn replies_for(&self, line: &str) -> Vec<(Duration, String)> {
        match self.replies.get(line) {
            Some(chunks) => chunks.clone(),
            None => vec![(Duration::ZERO, format!("{}\r\n{}", line, self.prompt))],
        }
    }

    async fn serve(self, io: DuplexStream) {
        let (mut rd, mut wr) = tokio::io::split(io);

        if !self.welcome.is_empty() && wr.write_all(self.welcome.as_bytes()).await.is_err() {
            return;
        }

        let mut pending = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = match rd.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            pending.extend_from_slice(&buf[..n]);

            while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = pending.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                self.received.lock().unwrap().push(line.clone());

                for (delay, chunk) in self.replies_for(&line) {
                    tokio::time::sleep(delay).await;
                    if wr.write_all(chunk.as_bytes()).await.is_err() {
                        return;
                    }
                }

                if self.hangup.as_deref() == Some(line.as_str()) {
                    return;
                }
            }
        }
    }

    async fn open(&self, config: &SshConfig) -> Result<Shell> {
        tokio::time::sleep(self.connect_delay).await;

        if self.fail_connect {
            return Err(TransportError::ConnectionFailed {
                host: config.host.clone(),
                port: config.port,
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
            }
            .into());
        }

        let (client, server) = tokio::io::duplex(64 * 1024);
        tokio::spawn(self.clone().serve(server));

        let (reader, writer) = tokio::io::split(client);
        let shell = Shell::from_io(reader, writer);
        Ok(match &self.banner {
            Some(banner) => shell.with_banner(banner.clone()),
            None => shell,
        })
    }
}

impl Connector for FakeDevice {
    async fn connect(&self, config: &SshConfig) -> Result<Shell> {
        self.open(config).await
    }
}

/// Several fake devices addressed by host name.
#[derive(Clone, Default)]
pub(crate) struct FakeFleet {
    devices: Arc<HashMap<String, FakeDevice>>,
}

impl FakeFleet {
    pub(crate) fn new(devices: impl IntoIterator<Item = (String, FakeDevice)>) -> Self {
        Self {
            devices: Arc::new(devices.into_iter().collect()),
        }
    }
}

impl Connector for FakeFleet {
    async fn connect(&self, config: &SshConfig) -> Result<Shell> {
        match self.devices.get(&config.host) {
            Some(device) => device.open(config).await,
            None => Err(TransportError::ConnectionFailed {
                host: config.host.clone(),
                port: config.port,
                source: io::Error::new(io::ErrorKind::NotFound, "no such host"),
            }
            .into()),
        }
    }
}

/// A config with short waits suitable for in-memory devices.
pub(crate) fn test_config(host: &str) -> SshConfig {
    let mut config = SshConfig::new(host);
    config.username = "admin".to_string();
    config.idle_wait = Duration::from_millis(20);
    config
}
