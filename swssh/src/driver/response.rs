//! Response type for command execution results.

use std::time::Duration;

/// Output captured for one command.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command that was executed.
    pub command: String,

    /// Everything the device printed between submission and completion,
    /// with carriage returns stripped. Usually starts with the command
    /// echo and ends with the prompt.
    pub result: String,

    /// Time taken to execute the command.
    pub elapsed: Duration,
}

impl Response {
    /// Create a new response.
    pub fn new(command: impl Into<String>, result: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            command: command.into(),
            result: result.into(),
            elapsed,
        }
    }

    /// The result with the echoed command line and trailing prompt removed.
    pub fn sanitized(&self) -> String {
        sanitize(&self.result, true, true)
    }

    /// Get the result lines as an iterator.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.result.lines()
    }

    /// Check if the result contains a substring.
    pub fn contains(&self, pattern: &str) -> bool {
        self.result.contains(pattern)
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.result)
    }
}

/// Trim raw output and optionally drop its first line (the command echo)
/// and last line (the prompt).
pub fn sanitize(raw: &str, strip_command: bool, strip_prompt: bool) -> String {
    let trimmed = raw.trim();
    let mut lines: Vec<&str> = trimmed.lines().collect();

    if strip_prompt && !lines.is_empty() {
        lines.pop();
    }
    if strip_command && !lines.is_empty() {
        lines.remove(0);
    }

    lines.join("\n")
}
