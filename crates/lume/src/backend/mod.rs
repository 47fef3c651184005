use std::fmt;
use std::str::FromStr;

use crate::error::Result;
use crate::types::{CreateRequest, RunRequest, Vm};

#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "http")]
pub mod http;

/// Backend trait for Lume operations
///
/// Lume exposes the same operations through `lume serve` (HTTP) and through
/// its command-line interface. Callers pick one; planning and execution code
/// only ever sees this trait, which also makes it easy to mock in tests.
pub trait Backend {
    /// Short transport name for log and error messages
    fn name(&self) -> &'static str;

    /// List every VM Lume knows about
    fn list_vms(&self) -> Result<Vec<Vm>>;

    /// Fetch a single VM by name
    fn get_vm(&self, name: &str) -> Result<Vm>;

    /// Start creating a VM. Creation is asynchronous: the VM shows up with a
    /// provisioning marker until it is ready.
    fn create_vm(&self, request: &CreateRequest) -> Result<()>;

    /// Boot a VM. Returns once Lume accepted the request, not once the
    /// guest finished booting.
    fn run_vm(&self, name: &str, request: &RunRequest) -> Result<()>;

    /// Stop a running VM
    fn stop_vm(&self, name: &str) -> Result<()>;

    /// Delete a VM and its disk
    fn delete_vm(&self, name: &str) -> Result<()>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn list_vms(&self) -> Result<Vec<Vm>> {
        (**self).list_vms()
    }

    fn get_vm(&self, name: &str) -> Result<Vm> {
        (**self).get_vm(name)
    }

    fn create_vm(&self, request: &CreateRequest) -> Result<()> {
        (**self).create_vm(request)
    }

    fn run_vm(&self, name: &str, request: &RunRequest) -> Result<()> {
        (**self).run_vm(name, request)
    }

    fn stop_vm(&self, name: &str) -> Result<()> {
        (**self).stop_vm(name)
    }

    fn delete_vm(&self, name: &str) -> Result<()> {
        (**self).delete_vm(name)
    }
}

/// Which Lume interface to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Transport {
    /// HTTP API served by `lume serve`
    #[default]
    Http,
    /// `lume` sub-processes
    Cli,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Http => write!(f, "http"),
            Transport::Cli => write!(f, "cli"),
        }
    }
}

impl FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" | "api" => Ok(Transport::Http),
            "cli" => Ok(Transport::Cli),
            other => Err(format!("unknown transport '{other}' (use http or cli)")),
        }
    }
}

/// Settings needed to build either backend.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Which interface to use
    pub transport: Transport,
    /// Base URL of `lume serve`
    pub api_url: String,
    /// Path or name of the `lume` executable
    pub lume_bin: String,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            transport: Transport::Http,
            api_url: DEFAULT_API_URL.to_string(),
            lume_bin: DEFAULT_LUME_BIN.to_string(),
        }
    }
}

/// Default address of `lume serve`
pub const DEFAULT_API_URL: &str = "http://localhost:7777";

/// Default name of the Lume executable
pub const DEFAULT_LUME_BIN: &str = "lume";

/// Build the backend selected by `options`.
#[cfg(all(feature = "http", feature = "cli"))]
pub fn connect(options: &ConnectOptions) -> Box<dyn Backend> {
    log::debug!("Using lume {} backend", options.transport);
    match options.transport {
        Transport::Http => {
            Box::new(http::HttpBackend::new(&options.api_url).with_lume_bin(&options.lume_bin))
        }
        Transport::Cli => Box::new(cli::CliBackend::with_binary(&options.lume_bin)),
    }
}
