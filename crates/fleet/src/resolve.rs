//! Merge VM specs with fleet defaults into fully specified VMs.
//!
//! Every field follows the same precedence: VM spec, then defaults, then a
//! built-in fallback. Validation happens here, so anything downstream can
//! trust a [`ResolvedVm`].

use serde::Serialize;

use crate::config::{FleetConfig, VmSpec};
use crate::error::{Error, Result};
use crate::size::parse_size;

/// Guest OS family subject to the host's concurrent-run limit.
pub const MACOS: &str = "macos";

/// Fallbacks used when neither the VM spec nor the defaults set a value.
pub const DEFAULT_OS: &str = MACOS;
pub const DEFAULT_CPU: u32 = 4;
pub const DEFAULT_MEMORY: &str = "8GB";
pub const DEFAULT_DISK_SIZE: &str = "50GB";

/// A VM spec with defaults applied and validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedVm {
    pub name: String,
    pub os: String,
    pub cpu: u32,
    pub memory: String,
    pub disk_size: String,
    pub shared_dir: String,
    /// Unattended install profile; only ever set for macOS guests
    pub unattended: String,
    /// 0 means no VNC port is requested
    pub vnc_port: u16,
    /// IPSW for macOS, install ISO for other guests
    pub image: String,
    pub storage: String,
    pub tags: Vec<String>,
    pub autostart: bool,
}

impl ResolvedVm {
    /// Case-insensitive guest OS family check.
    pub fn is_os(&self, family: &str) -> bool {
        self.os.eq_ignore_ascii_case(family)
    }

    pub fn is_macos(&self) -> bool {
        self.is_os(MACOS)
    }

    /// Exact tag membership.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Resolve every VM in the document, failing on the first invalid one.
///
/// VMs come back in name order. No partial result is returned on error.
pub fn resolve(config: &FleetConfig) -> Result<Vec<ResolvedVm>> {
    config.ensure_not_empty("fleet document")?;

    let vms = config
        .vms
        .iter()
        .map(|(name, spec)| resolve_one(config, name, spec))
        .collect::<Result<Vec<_>>>()?;

    log::debug!("Resolved {} VM(s)", vms.len());
    Ok(vms)
}

impl FleetConfig {
    /// See [`resolve`].
    pub fn resolve(&self) -> Result<Vec<ResolvedVm>> {
        resolve(self)
    }
}

fn resolve_one(config: &FleetConfig, name: &str, spec: &VmSpec) -> Result<ResolvedVm> {
    let defaults = &config.defaults;
    let os = coalesce(&[&spec.os, &defaults.os, DEFAULT_OS]);

    // Keyed on the resolved OS: a macOS family inherited from defaults
    // still picks up the default unattended profile.
    let unattended = if os.eq_ignore_ascii_case(MACOS) {
        coalesce(&[&spec.unattended, &defaults.unattended])
    } else {
        String::new()
    };

    let vm = ResolvedVm {
        name: name.to_string(),
        cpu: first_nonzero(&[spec.cpu, defaults.cpu, DEFAULT_CPU]),
        memory: coalesce(&[&spec.memory, &defaults.memory, DEFAULT_MEMORY]),
        disk_size: coalesce(&[&spec.disk_size, &defaults.disk_size, DEFAULT_DISK_SIZE]),
        shared_dir: expand_home(&spec.shared_dir),
        unattended,
        vnc_port: validate_vnc_port(name, first_nonzero(&[spec.vnc_port, defaults.vnc_port]))?,
        image: expand_home(&coalesce(&[&spec.image, &defaults.image])),
        storage: coalesce(&[&spec.storage, &defaults.storage]),
        tags: spec.tags.clone(),
        autostart: spec.autostart.resolve(true),
        os,
    };

    validate_size(name, "memory", &vm.memory)?;
    validate_size(name, "disk-size", &vm.disk_size)?;

    Ok(vm)
}

fn validate_size(vm: &str, field: &'static str, value: &str) -> Result<()> {
    let megabytes = parse_size(value).map_err(|source| Error::InvalidSize {
        vm: vm.to_string(),
        field,
        source,
    })?;

    if megabytes <= 0 {
        return Err(Error::NonPositiveSize {
            vm: vm.to_string(),
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn validate_vnc_port(vm: &str, port: i64) -> Result<u16> {
    u16::try_from(port).map_err(|_| Error::InvalidVncPort {
        vm: vm.to_string(),
        port,
    })
}

/// First non-empty value, or an empty string.
fn coalesce(values: &[&str]) -> String {
    values
        .iter()
        .find(|v| !v.is_empty())
        .map(|v| (*v).to_string())
        .unwrap_or_default()
}

/// First non-zero value, or zero.
fn first_nonzero<T: Copy + Default + PartialEq>(values: &[T]) -> T {
    values
        .iter()
        .copied()
        .find(|v| *v != T::default())
        .unwrap_or_default()
}

/// Expand a leading `~/` to the invoking user's home directory.
fn expand_home(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest).to_string_lossy().into_owned();
    }
    path.to_string()
}
