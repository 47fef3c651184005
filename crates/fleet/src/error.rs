use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::size::SizeError;

/// Errors raised while loading, resolving or executing a fleet.
///
/// Loading and resolution errors abort before any hypervisor call. The
/// execution-time variants are only ever recorded against a single VM.
#[derive(Debug, Error)]
pub enum Error {
    /// Fleet document could not be read
    #[error("fleet: read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Fleet document is not valid YAML/TOML for the fleet schema
    #[error("fleet: parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    /// Fleet document defines no VMs
    #[error("fleet: no VMs defined in {origin}")]
    EmptyFleet { origin: String },

    /// A memory or disk size does not parse
    #[error("VM {vm:?}: invalid {field}: {source}")]
    InvalidSize {
        vm: String,
        field: &'static str,
        #[source]
        source: SizeError,
    },

    /// A memory or disk size parses but is not positive
    #[error("VM {vm:?}: invalid {field} {value:?} (must be a positive size)")]
    NonPositiveSize {
        vm: String,
        field: &'static str,
        value: String,
    },

    /// VNC port outside 0-65535
    #[error("VM {vm:?}: invalid vnc-port {port} (must be 0-65535)")]
    InvalidVncPort { vm: String, port: i64 },

    /// Created VM never reported itself provisioned
    #[error("VM {vm:?} creation timed out after {}s", timeout.as_secs())]
    ProvisionTimeout { vm: String, timeout: Duration },

    /// Hypervisor call failed
    #[error(transparent)]
    Hypervisor(#[from] lume::Error),
}

impl Error {
    /// Returns true for errors found while validating the fleet document.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::EmptyFleet { .. }
                | Error::InvalidSize { .. }
                | Error::NonPositiveSize { .. }
                | Error::InvalidVncPort { .. }
        )
    }
}

/// A fleet document that does not deserialize.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

/// Result type for fleet operations
pub type Result<T> = std::result::Result<T, Error>;
