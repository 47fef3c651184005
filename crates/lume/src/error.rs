use std::io;
use thiserror::Error;

/// Errors that can occur while talking to Lume.
#[derive(Debug, Error)]
pub enum Error {
    /// The `lume` binary could not be executed
    #[error("lume CLI not found: {0}")]
    CliNotFound(String),

    /// A `lume` sub-process exited with a failure
    #[error("{command}: {output}")]
    CommandFailed {
        /// The command line that was run
        command: String,
        /// Combined stdout/stderr of the failed process
        output: String,
    },

    /// The HTTP API answered with an unexpected status
    #[error("lume: {operation}: status {status}: {body}")]
    Status {
        /// What was being attempted, e.g. `list VMs`
        operation: String,
        /// HTTP status code
        status: u16,
        /// Response body, as far as it could be read
        body: String,
    },

    /// The HTTP API could not be reached or the transfer failed
    #[error("lume: {operation}: {message}")]
    Http {
        /// What was being attempted
        operation: String,
        /// Transport error message
        message: String,
    },

    /// A response could not be decoded
    #[error("lume: decode {context}: {message}")]
    Decode {
        /// What was being decoded
        context: String,
        /// Decoder error message
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Returns true if the error means the API endpoint is not reachable at
    /// all (as opposed to Lume rejecting a request).
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::CliNotFound(_))
    }

    /// Attach the operation being attempted to a transport-level error.
    pub(crate) fn during(self, operation: &str) -> Self {
        match self {
            Self::Http { message, .. } => Self::Http {
                operation: operation.to_string(),
                message,
            },
            Self::Decode { message, .. } => Self::Decode {
                context: operation.to_string(),
                message,
            },
            other => other,
        }
    }
}

#[cfg(feature = "http")]
impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Status {
                operation: String::new(),
                status: code,
                body: String::new(),
            },
            other => Self::Http {
                operation: String::new(),
                message: other.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode {
            context: String::new(),
            message: err.to_string(),
        }
    }
}

/// Result type for Lume operations
pub type Result<T> = std::result::Result<T, Error>;
