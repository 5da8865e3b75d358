use crate::command::Command;
use crate::types::{Model, Zone};
use std::time::Duration;
use thiserror::Error;

/// Result type for Anthem operations
pub type Result<T> = std::result::Result<T, AnthemError>;

/// Errors that can occur when talking to an Anthem receiver
///
/// Transport variants (`ConnectError`, `SendError`, `ResponseTimeout`,
/// `ConnectionClosed`, `Io`) are soft: the client has already degraded the
/// zone to `Off` when it returns them. The remaining variants are
/// configuration or caller errors and leave state untouched.
#[derive(Error, Debug)]
pub enum AnthemError {
    /// Could not open a connection to the receiver
    #[error("Unable to connect to {host}:{port}: {source}")]
    ConnectError {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Could not write the command to the socket
    #[error("Unable to send payload to {host}:{port}: {source}")]
    SendError {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Nothing was readable before the I/O timeout expired
    #[error("Timeout ({timeout:?}) waiting for a response from {host}:{port}")]
    ResponseTimeout {
        host: String,
        port: u16,
        timeout: Duration,
    },

    /// The receiver closed the connection without replying
    #[error("Connection closed")]
    ConnectionClosed,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An extraction or standby pattern is unusable
    #[error("Malformed pattern `{pattern}`: {reason}")]
    MalformedPattern { pattern: String, reason: String },

    /// A wire template could not be parsed
    #[error("Invalid template `{template}`: {reason}")]
    InvalidTemplate { template: String, reason: String },

    /// The model has no template for the command
    #[error("Command {command:?} is not supported by model {model}")]
    UnknownCommand { model: Model, command: Command },

    /// A template placeholder had no value
    #[error("Command {command:?} requires parameter `{parameter}`")]
    MissingParameter {
        command: Command,
        parameter: String,
    },

    /// A parameter value would break the statement framing
    #[error("Command {command:?} parameter `{parameter}` has invalid value {value:?}")]
    InvalidParameter {
        command: Command,
        parameter: String,
        value: String,
    },

    /// The source name is not in the source map
    #[error("Unknown source: {0}")]
    UnknownSource(String),

    /// A field was never observed for the zone
    #[error("No {field} data for zone {zone}")]
    NoData { zone: Zone, field: &'static str },

    /// Normalized volume was not a number
    #[error("Invalid volume: {0}")]
    InvalidVolume(f64),

    /// Client configuration was rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid or unexpected response value
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl AnthemError {
    /// Whether this error came from the network exchange rather than from
    /// configuration or caller input
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AnthemError::ConnectError { .. }
                | AnthemError::SendError { .. }
                | AnthemError::ResponseTimeout { .. }
                | AnthemError::ConnectionClosed
                | AnthemError::Io(_)
        )
    }
}
