//! Error types for nxos-cli.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::flows::RestoreStep;
use crate::transport::SessionKind;

/// Main error type for nxos-cli operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Output dispatch errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Command mode graph errors
    #[error("Mode error: {0}")]
    Mode(#[from] ModeError),

    /// CLI service errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Configuration and connectivity flow errors
    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),
}

impl Error {
    /// Whether the caller may reasonably retry the operation.
    ///
    /// Only a dispatch timeout qualifies; nothing in this crate retries
    /// on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Channel(ChannelError::Timeout { .. }) => true,
            Error::Driver(DriverError::ModeTransitionFailed { source, .. }) => {
                source.is_retryable()
            }
            Error::Flow(FlowError::StepFailed { source, .. }) => source.is_retryable(),
            _ => false,
        }
    }
}

/// Transport layer errors (connection, authentication).
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

    /// Host is not present in known_hosts (strict verification)
    #[error("Host key for {host}:{port} is unknown")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection attempt timed out
    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),

    /// No registered session factory accepted the connection
    #[error("No session factory could connect using cli type '{cli_type}'")]
    NoSessionAvailable { cli_type: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Output dispatch errors (prompt matching, reactions).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Target prompt not observed before the deadline
    #[error("Target prompt not seen within {timeout:?}; last output: {last_output:?}")]
    Timeout {
        timeout: Duration,
        last_output: String,
    },

    /// Too many reactions fired without reaching the target prompt
    #[error("More than {limit} reactions fired without reaching the prompt; last output: {last_output:?}")]
    ReactionBudgetExceeded { limit: usize, last_output: String },

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Command mode graph errors.
#[derive(Error, Debug)]
pub enum ModeError {
    /// No sequence of transitions connects the two modes
    #[error("No path from mode '{from}' to '{to}'")]
    UnreachableMode { from: String, to: String },

    /// Mode name not defined in the graph
    #[error("Unknown mode '{0}'")]
    UnknownMode(String),

    /// The mode table violates the single-root tree invariant
    #[error("Invalid mode graph: {message}")]
    InvalidGraph { message: String },

    /// No mode prompt matches the output
    #[error("Prompt does not match any mode: '{prompt}'")]
    UnrecognizedPrompt { prompt: String },
}

/// CLI service errors (command execution, mode navigation).
#[derive(Error, Debug)]
pub enum DriverError {
    /// A hop of a mode transition failed
    #[error("Transition from mode '{from}' to '{to}' failed: {source}")]
    ModeTransitionFailed {
        from: String,
        to: String,
        #[source]
        source: Box<Error>,
    },

    /// Device output matched a failure string
    #[error("Command '{command}' failed: {message}")]
    CommandFailed { command: String, message: String },

    /// Invalid configuration in the handler builder
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Configuration and connectivity flow errors.
#[derive(Error, Debug)]
pub enum FlowError {
    /// Override restore requested over a transport that does not survive reload
    #[error("Unsupported cli session type: {kind}. Only console sessions allow restore override")]
    UnsupportedSessionType { kind: SessionKind },

    /// Configuration type and restore method cannot be combined
    #[error("Restore of {configuration} config in {method} mode is not supported")]
    UnsupportedRestoreCombination {
        configuration: String,
        method: String,
    },

    /// A structural step of a flow failed; remaining steps were skipped
    #[error("Step '{step}' failed: {source}")]
    StepFailed {
        step: RestoreStep,
        #[source]
        source: Box<Error>,
    },

    /// The copy command finished without a success marker
    #[error("Copy command failed: {message}")]
    CopyFailed { message: String },

    /// A configuration locator could not be parsed
    #[error("Invalid configuration locator '{locator}': {message}")]
    InvalidLocator { locator: String, message: String },

    /// A VLAN range is malformed or out of bounds
    #[error("Invalid VLAN range '{range}': {message}")]
    InvalidVlanRange { range: String, message: String },

    /// The interface did not show the requested VLAN after configuration
    #[error("VLAN {range} not configured on {port}")]
    VlanNotApplied { range: String, port: String },
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        ChannelError::InvalidPattern(err).into()
    }
}

/// Result type alias using nxos-cli's Error.
pub type Result<T> = std::result::Result<T, Error>;
