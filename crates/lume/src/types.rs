use serde::{Deserialize, Deserializer, Serialize};

/// Status string Lume reports for a booted VM.
pub const STATUS_RUNNING: &str = "running";
/// Status string Lume reports for a created, powered-off VM.
pub const STATUS_STOPPED: &str = "stopped";

/// A VM as reported by Lume.
///
/// This is the hypervisor's view and is never mutated locally. Lume emits
/// `null` for most fields it cannot fill in, so every field tolerates it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vm {
    /// VM name (unique per Lume host)
    pub name: String,
    /// Lifecycle status: `running`, `stopped`, or a transitional value
    #[serde(default, deserialize_with = "nullable")]
    pub status: String,
    /// Guest OS family (`macos`, `linux`, ...)
    #[serde(default, deserialize_with = "nullable")]
    pub os: String,
    /// Virtual CPU count
    #[serde(default, deserialize_with = "nullable")]
    pub cpu_count: u32,
    /// Memory size in bytes
    #[serde(default, deserialize_with = "nullable")]
    pub memory_size: u64,
    /// Disk allocation
    #[serde(default)]
    pub disk_size: Option<DiskSize>,
    /// IP address, once the guest has one
    #[serde(default)]
    pub ip_address: Option<String>,
    /// Display resolution
    #[serde(default, deserialize_with = "nullable")]
    pub display: String,
    /// VNC URL while running
    #[serde(default)]
    pub vnc_url: Option<String>,
    /// Whether SSH is reachable
    #[serde(default)]
    pub ssh_available: Option<bool>,
    /// Storage location the VM lives in
    #[serde(default, deserialize_with = "nullable")]
    pub location_name: String,
    /// Host directories shared into the guest
    #[serde(default, deserialize_with = "nullable")]
    pub shared_directories: Vec<String>,
    /// Set while an async create is still provisioning
    #[serde(default)]
    pub provisioning_operation: Option<String>,
}

impl Vm {
    /// Returns true if Lume reports the VM as running.
    pub fn is_running(&self) -> bool {
        self.status.eq_ignore_ascii_case(STATUS_RUNNING)
    }

    /// Returns true if Lume reports the VM as stopped.
    pub fn is_stopped(&self) -> bool {
        self.status.eq_ignore_ascii_case(STATUS_STOPPED)
    }

    /// Returns true while an async create is still in flight.
    pub fn is_provisioning(&self) -> bool {
        self.provisioning_operation.is_some()
    }

    /// Returns true once a created VM has finished provisioning and is
    /// sitting stopped, ready to be run.
    pub fn is_provisioned(&self) -> bool {
        !self.is_provisioning() && self.is_stopped()
    }

    /// Case-insensitive guest OS family check.
    pub fn is_os(&self, family: &str) -> bool {
        self.os.eq_ignore_ascii_case(family)
    }
}

/// Disk usage of a VM in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskSize {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub allocated: u64,
}

/// Body of `POST /lume/vms`, also translated into `lume create` flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    pub name: String,
    pub os: String,
    pub cpu: u32,
    pub memory: String,
    pub disk_size: String,
    pub display: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipsw: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unattended: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnc_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

/// Body of `POST /lume/vms/{name}/run`, also translated into `lume run` flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub no_display: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_dir: Option<String>,
    /// ISO image to attach for this boot only. `lume serve` has no field
    /// for it, so it is never part of the JSON body.
    #[serde(skip)]
    pub mount: Option<String>,
}

/// Treat an explicit JSON `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
