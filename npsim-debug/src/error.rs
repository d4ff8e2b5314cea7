//! Error types for the debugger backplane.

use thiserror::Error;

/// Errors raised by the debug state store, the observer and the command server.
#[derive(Error, Debug)]
pub enum DebugError {
    /// A counter was updated or traced before it was added.
    #[error("counter {0} does not exist")]
    CounterNotFound(String),

    /// The counter already carries a trace.
    #[error("counter {0} is already traced")]
    AlreadyTraced(String),

    /// I/O failure on the client connection.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An inbound frame could not be decoded into a request.
    #[error("decode error: {0}")]
    Decode(String),

    /// A frame exceeded the configured size limit.
    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Transport-level failure that is not plain I/O.
    #[error("transport error: {0}")]
    Transport(String),

    /// The other side of the channel went away.
    #[error("peer disconnected")]
    Disconnected,

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl DebugError {
    /// Whether the error concerns a single malformed request.
    ///
    /// Such requests are answered with a failure acknowledgement and the
    /// connection stays open.
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::MessageTooLarge { .. })
    }

    /// Whether the client connection is unusable after this error.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Disconnected | Self::Transport(_))
    }
}

impl From<bitcode::Error> for DebugError {
    fn from(err: bitcode::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result type for debugger operations
pub type Result<T> = std::result::Result<T, DebugError>;
