//! Vendor-aware operations on top of a session.
//!
//! [`Device`] binds a borrowed [`Session`] to one vendor's [`Dialect`] and
//! implements [`VendorAdapter`] by interpreting that table. Adding a vendor
//! means adding a dialect, not a new adapter type.

use std::future::Future;

use log::{debug, warn};

use super::response::Response;
use super::session::Session;
use crate::error::{DriverError, Result};
use crate::platform::{Completion, Dialect, SaveStep, Vendor};
use crate::transport::{Connector, SshConnector};

/// Operations whose commands differ between vendors.
pub trait VendorAdapter: Send {
    /// Get the device to a prompt and disable output paging.
    ///
    /// Returns `false` if the device never showed a prompt or the paging
    /// command could not be sent.
    fn session_preparation(&mut self) -> impl Future<Output = bool> + Send;

    /// Write the running configuration to startup storage.
    fn save_running_config(&mut self) -> impl Future<Output = bool> + Send;

    /// Run a named transaction such as `ifconfig`.
    fn run_transaction(&mut self, name: &str) -> impl Future<Output = Result<Response>> + Send;
}

/// Progress of a configuration save.
///
/// Two-step saves move `Idle → CommandSent → AwaitingConfirm → Confirmed`,
/// one-step saves `Idle → CommandSent → PromptReached`. Either may end in
/// `TimedOut`, and a broken connection ends in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    /// Nothing sent yet.
    Idle,
    /// A save step's input was sent.
    CommandSent,
    /// The device asked for confirmation.
    AwaitingConfirm,
    /// The confirmation was answered and the prompt came back.
    Confirmed,
    /// The save finished without a confirmation question.
    PromptReached,
    /// A step did not complete in time.
    TimedOut,
    /// The session failed while saving.
    Failed,
}

impl SaveState {
    /// Whether the save finished successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, SaveState::Confirmed | SaveState::PromptReached)
    }

    fn after_step(self, step: &SaveStep) -> SaveState {
        match (step.is_confirmation(), self) {
            (true, _) => SaveState::AwaitingConfirm,
            (false, SaveState::AwaitingConfirm) => SaveState::Confirmed,
            (false, _) => SaveState::PromptReached,
        }
    }
}

/// A session bound to a vendor dialect.
pub struct Device<'a, C = SshConnector> {
    session: &'a mut Session<C>,
    vendor: Vendor,
    dialect: &'static Dialect,
}

impl<'a, C: Connector> Device<'a, C> {
    /// Bind `session` to the dialect of `vendor`.
    pub fn new(session: &'a mut Session<C>, vendor: Vendor) -> Self {
        Self {
            session,
            vendor,
            dialect: vendor.dialect(),
        }
    }

    /// The vendor this device speaks.
    pub fn vendor(&self) -> Vendor {
        self.vendor
    }

    /// The dialect table in use.
    pub fn dialect(&self) -> &'static Dialect {
        self.dialect
    }

    /// The underlying session.
    pub fn session(&mut self) -> &mut Session<C> {
        self.session
    }

    /// Run the dialect's save steps and report where the save ended.
    pub async fn save(&mut self) -> SaveState {
        let host = self.session.host().to_string();
        let mut state = SaveState::Idle;

        for step in &self.dialect.save_steps {
            let previous = state;
            state = SaveState::CommandSent;
            debug!("[{}] save: {:?} -> {:?} ({:?})", host, previous, state, step.input);

            let result = match &step.until {
                Completion::Contains(expect) => {
                    self.session
                        .exec_command_expect(&step.input, expect, step.timeout)
                        .await
                }
                Completion::Prompt => {
                    self.session
                        .exec_command_expect_prompt(&step.input, step.timeout)
                        .await
                }
            };

            state = match result {
                Ok(_) => previous.after_step(step),
                Err(e) if e.is_timeout() => {
                    warn!("[{}] save step {:?} timed out: {}", host, step.input, e);
                    return SaveState::TimedOut;
                }
                Err(e) => {
                    warn!("[{}] save step {:?} failed: {}", host, step.input, e);
                    return SaveState::Failed;
                }
            };
        }

        debug!("[{}] save finished: {:?}", host, state);
        state
    }
}

impl<C: Connector> VendorAdapter for Device<'_, C> {
    async fn session_preparation(&mut self) -> bool {
        if !self.session.session_preparation().await {
            return false;
        }

        if let Err(e) = self.session.exec_command(&self.dialect.paging_command).await {
            warn!(
                "[{}] failed to disable paging with {:?}: {}",
                self.session.host(),
                self.dialect.paging_command,
                e
            );
            return false;
        }

        self.session.clear_buffer();
        true
    }

    async fn save_running_config(&mut self) -> bool {
        self.save().await.is_success()
    }

    async fn run_transaction(&mut self, name: &str) -> Result<Response> {
        let command = self.dialect.transaction(name).ok_or_else(|| {
            DriverError::UnsupportedTransaction {
                vendor: self.vendor.to_string(),
                name: name.to_string(),
            }
        })?;
        self.session.exec_command(command).await
    }
}
