//! CLI backend implementation.
//!
//! Shells out to the `lume` executable. Useful when `lume serve` is not
//! running, and for flags the HTTP API does not expose (ISO mounts).

use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::{CreateRequest, RunRequest, Vm};

use super::Backend;

/// How long a freshly spawned `lume run` may take to fail before we treat it
/// as successfully booting. `lume run` stays in the foreground for the life
/// of the VM.
const RUN_GRACE_PERIOD: Duration = Duration::from_millis(500);

const RUN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Backend implementation using the `lume` command-line interface.
pub struct CliBackend {
    binary: String,
}

impl CliBackend {
    /// Create a backend that runs `lume` from `PATH`.
    pub fn new() -> Self {
        Self::with_binary(super::DEFAULT_LUME_BIN)
    }

    /// Create a backend that runs the given executable.
    pub fn with_binary(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
        }
    }

    /// Run `lume <args>` to completion and return its stdout.
    fn run_lume(&self, args: &[String]) -> Result<String> {
        let command = self.display_command(args);
        log::debug!("Running: {command}");

        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .map_err(|e| self.spawn_error(e))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            Err(Error::CommandFailed {
                command,
                output: combined.trim().to_string(),
            })
        }
    }

    fn spawn_error(&self, err: std::io::Error) -> Error {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::CliNotFound(self.binary.clone())
        } else {
            Error::Io(err)
        }
    }

    fn display_command(&self, args: &[String]) -> String {
        format!("{} {}", self.binary, args.join(" "))
    }
}

impl Default for CliBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// `lume get --format json` has answered with both a bare object and a
/// one-element list across releases.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(Box<Vm>),
    Many(Vec<Vm>),
}

/// Translate a create request into `lume create` arguments.
pub fn build_create_args(request: &CreateRequest) -> Vec<String> {
    let mut args = vec![
        "create".to_string(),
        request.name.clone(),
        "--os".to_string(),
        request.os.clone(),
        "--cpu".to_string(),
        request.cpu.to_string(),
        "--memory".to_string(),
        request.memory.clone(),
        "--disk-size".to_string(),
        request.disk_size.clone(),
        "--display".to_string(),
        request.display.clone(),
    ];

    if let Some(ipsw) = &request.ipsw {
        args.extend(["--ipsw".to_string(), ipsw.clone()]);
    }
    if let Some(unattended) = &request.unattended {
        args.extend(["--unattended".to_string(), unattended.clone()]);
    }
    if let Some(port) = request.vnc_port {
        args.extend(["--vnc-port".to_string(), port.to_string()]);
    }
    if let Some(storage) = &request.storage {
        args.extend(["--storage".to_string(), storage.clone()]);
    }
    if let Some(network) = &request.network {
        args.extend(["--network".to_string(), network.clone()]);
    }

    args
}

/// Translate a run request into `lume run` arguments.
pub fn build_run_args(name: &str, request: &RunRequest) -> Vec<String> {
    let mut args = vec!["run".to_string(), name.to_string()];
    if request.no_display {
        args.push("--no-display".to_string());
    }
    if let Some(shared_dir) = &request.shared_dir {
        args.extend(["--shared-dir".to_string(), shared_dir.clone()]);
    }
    if let Some(mount) = &request.mount {
        args.extend(["--mount".to_string(), mount.clone()]);
    }
    args
}

impl Backend for CliBackend {
    fn name(&self) -> &'static str {
        "cli"
    }

    fn list_vms(&self) -> Result<Vec<Vm>> {
        let args = ["ls", "--format", "json"].map(String::from);
        let stdout = self.run_lume(&args)?;
        serde_json::from_str(&stdout).map_err(|e| Error::from(e).during("lume ls output"))
    }

    fn get_vm(&self, name: &str) -> Result<Vm> {
        let args = ["get", name, "--format", "json"].map(String::from);
        let stdout = self.run_lume(&args)?;
        let context = format!("lume get {name} output");

        let parsed: OneOrMany =
            serde_json::from_str(&stdout).map_err(|e| Error::from(e).during(&context))?;
        match parsed {
            OneOrMany::One(vm) => Ok(*vm),
            OneOrMany::Many(vms) => vms.into_iter().find(|vm| vm.name == name).ok_or_else(|| {
                Error::CommandFailed {
                    command: self.display_command(&args),
                    output: format!("VM {name:?} not found"),
                }
            }),
        }
    }

    fn create_vm(&self, request: &CreateRequest) -> Result<()> {
        self.run_lume(&build_create_args(request)).map(|_| ())
    }

    fn run_vm(&self, name: &str, request: &RunRequest) -> Result<()> {
        let args = build_run_args(name, request);
        let command = self.display_command(&args);
        log::debug!("Spawning: {command}");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        // Still running after the grace period means the VM is booting.
        let started = Instant::now();
        while started.elapsed() < RUN_GRACE_PERIOD {
            if let Some(status) = child.try_wait()? {
                if status.success() {
                    return Ok(());
                }
                return Err(Error::CommandFailed {
                    command,
                    output: format!("exited with {status}"),
                });
            }
            thread::sleep(RUN_POLL_INTERVAL);
        }

        Ok(())
    }

    fn stop_vm(&self, name: &str) -> Result<()> {
        self.run_lume(&["stop", name].map(String::from)).map(|_| ())
    }

    fn delete_vm(&self, name: &str) -> Result<()> {
        self.run_lume(&["delete", name].map(String::from)).map(|_| ())
    }
}
