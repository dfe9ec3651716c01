//! Dialect tables describing how a vendor's CLI is driven.

use std::time::Duration;

use indexmap::IndexMap;

/// How a single save step decides it is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The last output line is a prompt.
    Prompt,
    /// The output contains this substring.
    Contains(String),
}

/// One input sent while saving the running configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveStep {
    /// Line to send (may be empty to accept a default).
    pub input: String,
    /// What ends the step.
    pub until: Completion,
    /// Maximum time to wait for completion.
    pub timeout: Duration,
}

impl SaveStep {
    /// A step that waits for a confirmation question.
    pub fn expect(input: impl Into<String>, expect: impl Into<String>, timeout: Duration) -> Self {
        Self {
            input: input.into(),
            until: Completion::Contains(expect.into()),
            timeout,
        }
    }

    /// A step that waits for the prompt to come back.
    pub fn prompt(input: impl Into<String>, timeout: Duration) -> Self {
        Self {
            input: input.into(),
            until: Completion::Prompt,
            timeout,
        }
    }

    /// Whether this step stops at a confirmation question.
    pub fn is_confirmation(&self) -> bool {
        matches!(self.until, Completion::Contains(_))
    }
}

/// Read-only description of one CLI dialect.
#[derive(Debug, Clone)]
pub struct Dialect {
    /// Vendor name as shown in reports (e.g. `HUAWEI`).
    pub name: &'static str,

    /// Command that turns off output paging for the session.
    pub paging_command: String,

    /// Inputs that save the running configuration, in order.
    pub save_steps: Vec<SaveStep>,

    /// Named multi-command shortcuts.
    pub transactions: IndexMap<String, String>,
}

impl Dialect {
    /// Create an empty dialect.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            paging_command: String::new(),
            save_steps: Vec::new(),
            transactions: IndexMap::new(),
        }
    }

    /// Set the paging-disable command.
    pub fn with_paging_command(mut self, command: impl Into<String>) -> Self {
        self.paging_command = command.into();
        self
    }

    /// Append a save step.
    pub fn with_save_step(mut self, step: SaveStep) -> Self {
        self.save_steps.push(step);
        self
    }

    /// Add a named transaction.
    pub fn with_transaction(mut self, name: impl Into<String>, command: impl Into<String>) -> Self {
        self.transactions.insert(name.into(), command.into());
        self
    }

    /// Look up the command behind a transaction name.
    pub fn transaction(&self, name: &str) -> Option<&str> {
        self.transactions.get(name).map(String::as_str)
    }

    /// Names of every transaction this dialect defines.
    pub fn transaction_names(&self) -> impl Iterator<Item = &str> {
        self.transactions.keys().map(String::as_str)
    }
}
