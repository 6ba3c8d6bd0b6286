//! Command results and output normalization.

use std::time::Duration;

use crate::error::{DriverError, Result};

/// Response from a command execution.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command that was executed.
    pub command: String,

    /// Output with the command echo and trailing prompt removed.
    pub result: String,

    /// Everything read while the command ran, including the prompt.
    pub raw_result: String,

    /// The prompt line that ended the command.
    pub prompt: String,

    /// Time taken to execute the command.
    pub elapsed: Duration,

    /// Failure string found in the output, if any.
    pub failure_message: Option<String>,
}

impl Response {
    /// Build a response from raw output, normalizing it and checking for
    /// failure strings.
    pub(crate) fn from_output(
        command: &str,
        raw: String,
        failure_strings: &[String],
        elapsed: Duration,
    ) -> Self {
        let prompt = raw.lines().last().unwrap_or_default().trim().to_string();
        let result = normalize_output(&raw, command);
        let failure_message = failure_strings
            .iter()
            .find(|pattern| result.contains(pattern.as_str()))
            .map(|_| failure_line(&result, failure_strings));

        Self {
            command: command.to_string(),
            result,
            raw_result: raw,
            prompt,
            elapsed,
            failure_message,
        }
    }

    /// Check if the response indicates success.
    pub fn is_success(&self) -> bool {
        self.failure_message.is_none()
    }

    /// Turn a failed response into [`DriverError::CommandFailed`].
    pub fn ensure_success(self) -> Result<Self> {
        match self.failure_message {
            Some(message) => Err(DriverError::CommandFailed {
                command: self.command,
                message,
            }
            .into()),
            None => Ok(self),
        }
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

/// Strip the command echo, carriage returns, and the trailing prompt line.
pub(crate) fn normalize_output(raw: &str, command: &str) -> String {
    let text = raw.replace('\r', "");
    let output = text.trim_start_matches('\n');
    let output = output
        .strip_prefix(command)
        .unwrap_or(output)
        .trim_start_matches('\n');

    // Raw output always ends with the prompt that completed the command.
    match output.rfind('\n') {
        Some(pos) => output[..pos].to_string(),
        None => String::new(),
    }
}

/// The output line carrying the failure, for error messages.
fn failure_line(output: &str, failure_strings: &[String]) -> String {
    output
        .lines()
        .find(|line| failure_strings.iter().any(|f| line.contains(f.as_str())))
        .unwrap_or_default()
        .trim()
        .to_string()
}
