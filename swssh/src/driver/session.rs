//! Session engine: one interactive shell on one device.
//!
//! A [`Session`] owns the shell's input half, the [`ResponseReader`]
//! draining its output half, and (for SSH) the transport. Commands are
//! issued one at a time; each operation first discards stale output so
//! that leftovers from a previous command are never attributed to the
//! next one, then waits for completion using one of three strategies:
//!
//! | Operation | Completes when |
//! |---|---|
//! | [`exec_command`](Session::exec_command) | a poll finds no new output for one `idle_wait` |
//! | [`exec_command_timing`](Session::exec_command_timing) | the deadline passes |
//! | [`exec_command_expect`](Session::exec_command_expect) | the output contains a substring |
//! | [`exec_command_expect_prompt`](Session::exec_command_expect_prompt) | the last output line is a prompt |
//!
//! Idle detection is a heuristic. A device that pauses for longer than
//! `idle_wait` in the middle of a response will have its output cut short;
//! use the deadline or prompt based operations for slow commands.

use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio::io::AsyncWriteExt;

use super::response::Response;
use crate::channel::{Poll, ResponseBuffer, ResponseReader, prompt};
use crate::error::{ChannelError, DriverError, Result};
use crate::transport::{Connector, Shell, ShellWriter, SshConfig, SshConnector, SshTransport};

/// Empty commands sent while waiting for a device to show its prompt.
const PREPARATION_PROBES: usize = 3;

/// Pause before each preparation probe.
const PROBE_DELAY: Duration = Duration::from_millis(2);

/// A live interactive shell on one host.
pub struct Session<C = SshConnector> {
    /// Connection and terminal settings.
    config: SshConfig,

    /// Opens the shell.
    connector: C,

    /// Input half of the shell (None when disconnected).
    writer: Option<ShellWriter>,

    /// Output queue fed by the reader task (None when disconnected).
    reader: Option<ResponseReader>,

    /// SSH transport, if the connector produced one.
    transport: Option<SshTransport>,

    /// Unsolicited output captured right after connecting.
    welcome: String,

    /// Banner sent by the server during authentication.
    banner: Option<String>,

    /// Set by `close()`; a closed session never reconnects.
    closed: bool,
}

impl<C> fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.config.host)
            .field("open", &self.writer.is_some())
            .field("closed", &self.closed)
            .field("banner", &self.banner)
            .finish()
    }
}

impl Session<SshConnector> {
    /// Create an SSH session. Call [`connect`](Self::connect) to open it.
    pub fn new(config: SshConfig) -> Self {
        Self::with_connector(config, SshConnector)
    }
}

impl<C: Connector> Session<C> {
    /// Create a session that obtains its shell from `connector`.
    pub fn with_connector(config: SshConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            writer: None,
            reader: None,
            transport: None,
            welcome: String::new(),
            banner: None,
            closed: false,
        }
    }

    /// Open the shell, start the reader and capture the welcome text.
    pub async fn connect(&mut self) -> Result<()> {
        if self.closed {
            return Err(DriverError::SessionClosed.into());
        }
        if self.writer.is_some() {
            return Err(DriverError::AlreadyConnected.into());
        }

        debug!("[{}] connecting to {}", self.config.host, self.config.socket_addr());
        let Shell {
            reader,
            writer,
            banner,
            transport,
        } = self.connector.connect(&self.config).await?;

        self.reader = Some(ResponseReader::spawn(reader, self.config.queue_depth));
        self.writer = Some(writer);
        self.transport = transport;
        self.banner = banner;

        match self.read_idle().await {
            Ok(welcome) => self.welcome = welcome,
            Err(e) => {
                let _ = self.teardown().await;
                return Err(e);
            }
        }

        info!(
            "[{}] connected ({} bytes of welcome text)",
            self.config.host,
            self.welcome.len()
        );
        Ok(())
    }

    /// Release the shell and transport. Further calls do nothing.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!("[{}] closing session", self.config.host);
        self.teardown().await
    }

    async fn teardown(&mut self) -> Result<()> {
        if let Some(reader) = self.reader.take() {
            reader.shutdown().await;
        }
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.shutdown().await;
        }
        if let Some(transport) = self.transport.take() {
            transport.close().await?;
        }
        Ok(())
    }

    /// Send a command and return once the device goes quiet.
    pub async fn exec_command(&mut self, command: &str) -> Result<Response> {
        let start = Instant::now();
        self.clear_buffer();
        self.send(command).await?;
        let result = self.read_idle().await?;
        Ok(Response::new(command, result, start.elapsed()))
    }

    /// Send a command and collect everything printed until `timeout`.
    ///
    /// For long jobs (image transfers, installs) whose output has long
    /// pauses.
    pub async fn exec_command_timing(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<Response> {
        let start = Instant::now();
        self.clear_buffer();
        self.send(command).await?;
        let result = self.read_until_deadline(timeout).await?;
        Ok(Response::new(command, result, start.elapsed()))
    }

    /// Send a command and wait until the output contains `expect`.
    pub async fn exec_command_expect(
        &mut self,
        command: &str,
        expect: &str,
        timeout: Duration,
    ) -> Result<Response> {
        let start = Instant::now();
        self.clear_buffer();
        self.send(command).await?;
        let result = self.read_until_contains(expect, timeout).await?;
        Ok(Response::new(command, result, start.elapsed()))
    }

    /// Send a command and wait until the last output line is a prompt.
    pub async fn exec_command_expect_prompt(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<Response> {
        let start = Instant::now();
        self.clear_buffer();
        self.send(command).await?;
        let result = self.read_until_prompt(timeout).await?;
        Ok(Response::new(command, result, start.elapsed()))
    }

    /// Make sure the device is sitting at a prompt.
    ///
    /// Accepts the welcome text if it ends at a prompt, otherwise reads
    /// once more, otherwise pokes the device with up to three empty
    /// commands.
    pub async fn session_preparation(&mut self) -> bool {
        if prompt::ends_with_prompt(&self.welcome) {
            return true;
        }

        match self.read_idle().await {
            Ok(text) if prompt::ends_with_prompt(&text) => return true,
            Ok(_) => {}
            Err(e) => {
                warn!("[{}] preparation read failed: {}", self.config.host, e);
                return false;
            }
        }

        for attempt in 1..=PREPARATION_PROBES {
            tokio::time::sleep(PROBE_DELAY).await;
            match self.exec_command("").await {
                Ok(response) if prompt::ends_with_prompt(&response.result) => return true,
                Ok(_) => debug!("[{}] no prompt after probe {}", self.config.host, attempt),
                Err(e) => {
                    warn!("[{}] preparation probe failed: {}", self.config.host, e);
                    return false;
                }
            }
        }

        false
    }

    /// Discard all queued output, returning the number of chunks dropped.
    pub fn clear_buffer(&mut self) -> usize {
        match self.reader.as_mut() {
            Some(reader) => reader.clear(),
            None => 0,
        }
    }

    /// Collect output until one full `idle_wait` passes with nothing new.
    pub async fn read_idle(&mut self) -> Result<String> {
        let idle_wait = self.config.idle_wait;
        let reader = self.reader_mut()?;
        let mut buffer = ResponseBuffer::new();
        let mut delayed = false;

        loop {
            match reader.try_next() {
                Poll::Chunk(chunk) => {
                    buffer.extend(&chunk);
                    delayed = false;
                }
                Poll::Empty if delayed => return Ok(buffer.take()),
                Poll::Empty => {
                    tokio::time::sleep(idle_wait).await;
                    delayed = true;
                }
                Poll::Closed => {
                    return Err(ChannelError::Disconnected {
                        output: buffer.take(),
                    }
                    .into());
                }
            }
        }
    }

    async fn read_until_deadline(&mut self, timeout: Duration) -> Result<String> {
        let reader = self.reader_mut()?;
        let mut buffer = ResponseBuffer::new();
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;
                _ = &mut deadline => return Ok(buffer.take()),
                chunk = reader.next() => match chunk {
                    Some(chunk) => buffer.extend(&chunk),
                    None => {
                        return Err(ChannelError::Disconnected { output: buffer.take() }.into());
                    }
                },
            }
        }
    }

    async fn read_until_contains(&mut self, expect: &str, timeout: Duration) -> Result<String> {
        let reader = self.reader_mut()?;
        let mut buffer = ResponseBuffer::new();
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;
                _ = &mut deadline => {
                    return Err(ChannelError::Timeout {
                        timeout,
                        expected: expect.to_string(),
                        output: buffer.take(),
                    }
                    .into());
                }
                chunk = reader.next() => match chunk {
                    Some(chunk) => {
                        buffer.extend(&chunk);
                        if buffer.contains_new(expect) {
                            return Ok(buffer.take());
                        }
                    }
                    None => {
                        return Err(ChannelError::Disconnected { output: buffer.take() }.into());
                    }
                },
            }
        }
    }

    async fn read_until_prompt(&mut self, timeout: Duration) -> Result<String> {
        let reader = self.reader_mut()?;
        let mut buffer = ResponseBuffer::new();
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        loop {
            let mut closed = false;
            loop {
                match reader.try_next() {
                    Poll::Chunk(chunk) => buffer.extend(&chunk),
                    Poll::Empty => break,
                    Poll::Closed => {
                        closed = true;
                        break;
                    }
                }
            }

            if buffer.ends_with_prompt() {
                return Ok(buffer.take());
            }
            if closed {
                return Err(ChannelError::Disconnected {
                    output: buffer.take(),
                }
                .into());
            }

            tokio::select! {
                biased;
                _ = &mut deadline => {
                    return Err(ChannelError::PromptTimeout {
                        timeout,
                        output: buffer.take(),
                    }
                    .into());
                }
                chunk = reader.next() => match chunk {
                    Some(chunk) => buffer.extend(&chunk),
                    None => {
                        return Err(ChannelError::Disconnected { output: buffer.take() }.into());
                    }
                },
            }
        }
    }

    /// Write one command line to the shell.
    async fn send(&mut self, command: &str) -> Result<()> {
        let host = &self.config.host;
        let writer = match self.writer.as_mut() {
            Some(writer) => writer,
            None if self.closed => return Err(DriverError::SessionClosed.into()),
            None => return Err(DriverError::NotConnected.into()),
        };

        debug!("[{}] send: {:?}", host, command);
        let line = format!("{}\n", command.trim());
        let written = match writer.write_all(line.as_bytes()).await {
            Ok(()) => writer.flush().await,
            Err(e) => Err(e),
        };

        written.map_err(|source| {
            ChannelError::WriteFailed {
                command: command.to_string(),
                source,
            }
            .into()
        })
    }

    fn reader_mut(&mut self) -> Result<&mut ResponseReader> {
        if self.closed {
            return Err(DriverError::SessionClosed.into());
        }
        self.reader
            .as_mut()
            .ok_or_else(|| DriverError::NotConnected.into())
    }

    /// Text the device printed right after the shell opened.
    pub fn welcome(&self) -> &str {
        &self.welcome
    }

    /// Banner the server sent during authentication, if any.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// The target host.
    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Connection and terminal settings.
    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    /// Check if the session is connected.
    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /// Check whether the shell is still usable: connected, reader running
    /// and (for SSH) the connection not torn down.
    pub fn is_alive(&self) -> bool {
        let reader_running = self.reader.as_ref().is_some_and(|r| r.is_running());
        let transport_closed = self.transport.as_ref().is_some_and(|t| t.is_closed());
        reader_running && !transport_closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::{FakeDevice, test_config};

    async fn connected(device: &FakeDevice) -> Session<FakeDevice> {
        let mut session = Session::with_connector(test_config("sw1"), device.clone());
        session.connect().await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_connect_captures_welcome() {
        let device = FakeDevice::new("<HW-01>")
            .welcome("Info: The max number of VTY users is 5.\r\n<HW-01>")
            .banner("Huawei SSH server");
        let session = connected(&device).await;

        assert!(session.is_open());
        assert!(session.is_alive());
        assert_eq!(session.welcome(), "Info: The max number of VTY users is 5.\n<HW-01>");
        assert_eq!(session.banner(), Some("Huawei SSH server"));
    }

    #[tokio::test]
    async fn test_connect_twice_fails() {
        let device = FakeDevice::new("sw1#");
        let mut session = connected(&device).await;

        let err = session.connect().await.unwrap_err();
        assert!(matches!(err, Error::Driver(DriverError::AlreadyConnected)));
    }

    #[tokio::test]
    async fn test_connect_failure_is_transport_error() {
        let device = FakeDevice::new("sw1#").refuse_connections();
        let mut session = Session::with_connector(test_config("sw1"), device);

        let err = session.connect().await.unwrap_err();
        assert!(err.is_connect_error());
        assert!(!session.is_open());
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_final() {
        let device = FakeDevice::new("sw1#");
        let mut session = connected(&device).await;

        session.close().await.unwrap();
        session.close().await.unwrap();
        assert!(!session.is_open());
        assert!(!session.is_alive());

        let err = session.connect().await.unwrap_err();
        assert!(matches!(err, Error::Driver(DriverError::SessionClosed)));
        let err = session.exec_command("show clock").await.unwrap_err();
        assert!(matches!(err, Error::Driver(DriverError::SessionClosed)));
    }

    #[tokio::test]
    async fn test_commands_need_connection() {
        let mut session = Session::with_connector(test_config("sw1"), FakeDevice::new("sw1#"));
        let err = session.exec_command("show clock").await.unwrap_err();
        assert!(matches!(err, Error::Driver(DriverError::NotConnected)));
    }

    #[tokio::test]
    async fn test_exec_command_idle_read() {
        let device = FakeDevice::new("sw1#").reply(
            "show clock",
            "show clock\r\n*10:00:00.000 UTC Mon Jan 1 2024\r\nsw1#",
        );
        let mut session = connected(&device).await;

        let response = session.exec_command("  show clock ").await.unwrap();
        assert_eq!(response.command, "  show clock ");
        assert_eq!(
            response.result,
            "show clock\n*10:00:00.000 UTC Mon Jan 1 2024\nsw1#"
        );
        assert_eq!(device.received(), vec!["show clock".to_string()]);
    }

    #[tokio::test]
    async fn test_exec_command_idle_read_silent_command() {
        let device = FakeDevice::new("sw1#").silent("terminal monitor");
        let mut session = connected(&device).await;

        let response = session.exec_command("terminal monitor").await.unwrap();
        assert_eq!(response.result, "");
        assert!(session.is_alive());
        assert_eq!(device.received(), vec!["terminal monitor".to_string()]);
    }

    #[tokio::test]
    async fn test_debug_shows_host_and_state() {
        let device = FakeDevice::new("sw1#").banner("Huawei SSH server");
        let mut session = connected(&device).await;

        let debug = format!("{:?}", session);
        assert!(debug.contains("\"sw1\""));
        assert!(debug.contains("open: true"));
        assert!(debug.contains("Huawei SSH server"));

        session.close().await.unwrap();
        let debug = format!("{:?}", session);
        assert!(debug.contains("open: false"));
        assert!(debug.contains("closed: true"));
    }

    #[tokio::test]
    async fn test_exec_command_idle_read_truncates_bursty_output() {
        let device = FakeDevice::new("sw1#").reply_chunks(
            "show tech",
            &[
                (Duration::ZERO, "show tech\r\npart one\r\n"),
                (Duration::from_millis(200), "part two\r\nsw1#"),
            ],
        );
        let mut session = connected(&device).await;

        let response = session.exec_command("show tech").await.unwrap();
        assert!(response.contains("part one"));
        assert!(!response.contains("part two"));
    }

    #[tokio::test]
    async fn test_exec_command_timing_waits_out_pauses() {
        let device = FakeDevice::new("sw1#").reply_chunks(
            "copy tftp flash",
            &[
                (Duration::ZERO, "Accessing tftp://10.0.0.9/image.bin...\r\n"),
                (Duration::from_millis(100), "!!!!!!!!\r\n"),
                (Duration::from_millis(100), "[OK - 1024 bytes]\r\nsw1#"),
            ],
        );
        let mut session = connected(&device).await;

        let response = session
            .exec_command_timing("copy tftp flash", Duration::from_millis(500))
            .await
            .unwrap();
        assert!(response.contains("Accessing"));
        assert!(response.result.ends_with("sw1#"));
        assert!(response.elapsed >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exec_command_expect_found() {
        let device = FakeDevice::new("<HW-01>").reply_chunks(
            "save",
            &[
                (Duration::from_secs(1), "save\r\nAre you sure to continue?"),
                (Duration::ZERO, "[Y/N]:"),
            ],
        );
        let mut session = connected(&device).await;

        let response = session
            .exec_command_expect("save", "[Y/N]:", Duration::from_secs(5))
            .await
            .unwrap();
        assert!(response.contains("[Y/N]:"));
        assert!(response.elapsed < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exec_command_expect_timeout() {
        let device = FakeDevice::new("<HW-01>").reply("save", "save\r\nWorking...");
        let mut session = connected(&device).await;

        let started = tokio::time::Instant::now();
        let err = session
            .exec_command_expect("save", "[Y/N]:", Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(err.partial_output(), Some("save\nWorking..."));
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(5));
        assert!(waited < Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expect_prompt_success() {
        let device = FakeDevice::new("sw1#").reply_chunks(
            "show version",
            &[
                (Duration::ZERO, "show version\r\nCisco IOS Software\r\n"),
                (Duration::from_secs(2), "uptime is 3 weeks\r\nsw1#"),
            ],
        );
        let mut session = connected(&device).await;

        let response = session
            .exec_command_expect_prompt("show version", Duration::from_secs(10))
            .await
            .unwrap();
        assert!(response.result.ends_with("sw1#"));
        assert!(response.contains("uptime"));
        assert!(response.elapsed < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expect_prompt_timeout_keeps_partial_output() {
        let device = FakeDevice::new("sw1#").reply("reload", "reload\r\nProceed with reload? [confirm]");
        let mut session = connected(&device).await;

        let err = session
            .exec_command_expect_prompt("reload", Duration::from_secs(3))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Channel(ChannelError::PromptTimeout { .. })
        ));
        assert_eq!(
            err.partial_output(),
            Some("reload\nProceed with reload? [confirm]")
        );
    }

    #[tokio::test]
    async fn test_stale_output_is_not_attributed_to_next_command() {
        let device = FakeDevice::new("sw1#")
            .reply_chunks(
                "show log",
                &[
                    (Duration::ZERO, "show log\r\nentry 1\r\n"),
                    (Duration::from_millis(150), "LATE-FROM-A\r\nsw1#"),
                ],
            )
            .reply("show clock", "show clock\r\n10:00\r\nsw1#");
        let mut session = connected(&device).await;

        let first = session.exec_command("show log").await.unwrap();
        assert!(!first.contains("LATE-FROM-A"));

        tokio::time::sleep(Duration::from_millis(300)).await;
        let second = session.exec_command("show clock").await.unwrap();
        assert!(!second.contains("LATE-FROM-A"));
        assert!(second.contains("10:00"));
    }

    #[tokio::test]
    async fn test_disconnect_is_reported() {
        let device = FakeDevice::new("sw1#").reply("quit", "quit\r\n").hangup("quit");
        let mut session = connected(&device).await;

        if let Err(e) = session.exec_command("quit").await {
            assert!(matches!(e, Error::Channel(ChannelError::Disconnected { .. })));
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        let err = session.read_idle().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Channel(ChannelError::Disconnected { .. })
        ));
        assert!(!session.is_alive());
        assert!(session.is_open());
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_preparation_accepts_welcome_prompt() {
        let device = FakeDevice::new("<H3C>");
        let mut session = connected(&device).await;

        assert!(session.session_preparation().await);
        assert!(device.received().is_empty());
    }

    #[tokio::test]
    async fn test_preparation_probes_with_empty_commands() {
        let device = FakeDevice::new("sw1#").welcome("Press RETURN to get started.\r\n");
        let mut session = connected(&device).await;

        assert!(session.session_preparation().await);
        assert_eq!(device.received(), vec![String::new()]);
    }

    #[tokio::test]
    async fn test_preparation_gives_up_after_three_probes() {
        let device = FakeDevice::new("sw1#")
            .welcome("login banner\r\n")
            .reply("", "\r\n--More--");
        let mut session = connected(&device).await;

        assert!(!session.session_preparation().await);
        assert_eq!(device.received().len(), PREPARATION_PROBES);
    }
}
