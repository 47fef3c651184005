//! Fleet document schema and loading.
//!
//! ```yaml
//! defaults:
//!   os: macos
//!   cpu: 4
//!   memory: 8GB
//!   disk-size: 50GB
//!   unattended: tahoe
//!
//! vms:
//!   dev-mac:
//!     tags: [dev]
//!   ci-linux:
//!     os: linux
//!     cpu: 2
//!     image: ~/isos/ubuntu.iso
//!     autostart: false
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, ParseError, Result};

/// The top-level fleet document.
///
/// VMs are keyed by name; the map is ordered so resolution and planning
/// enumerate them in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Values inherited by every VM
    #[serde(default)]
    pub defaults: VmDefaults,

    /// VM specifications by name
    #[serde(default, deserialize_with = "nullable_specs")]
    pub vms: BTreeMap<String, VmSpec>,
}

/// Fleet-wide fallback values. Empty strings and zeros mean "unset".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct VmDefaults {
    pub os: String,
    pub cpu: u32,
    pub memory: String,
    pub disk_size: String,
    pub unattended: String,
    pub vnc_port: i64,
    pub storage: String,
    pub image: String,
}

/// One VM entry. Empty strings and zeros mean "inherit".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct VmSpec {
    pub os: String,
    pub cpu: u32,
    pub memory: String,
    pub disk_size: String,
    pub shared_dir: String,
    pub unattended: String,
    pub vnc_port: i64,
    pub storage: String,
    pub image: String,
    pub tags: Vec<String>,
    pub autostart: Autostart,
}

/// Whether `up` should bring a VM up.
///
/// Kept three-way so "not written in the document" stays distinguishable
/// from an explicit `true`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum Autostart {
    #[default]
    Unset,
    Enabled,
    Disabled,
}

impl Autostart {
    /// The effective value, with `fallback` standing in for `Unset`.
    pub fn resolve(self, fallback: bool) -> bool {
        match self {
            Autostart::Unset => fallback,
            Autostart::Enabled => true,
            Autostart::Disabled => false,
        }
    }
}

impl From<Option<bool>> for Autostart {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => Autostart::Unset,
            Some(true) => Autostart::Enabled,
            Some(false) => Autostart::Disabled,
        }
    }
}

impl From<Autostart> for Option<bool> {
    fn from(value: Autostart) -> Self {
        match value {
            Autostart::Unset => None,
            Autostart::Enabled => Some(true),
            Autostart::Disabled => Some(false),
        }
    }
}

/// Serialization format of a fleet document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Toml,
}

impl Format {
    /// Pick the format from a file extension. Anything that is not `.toml`
    /// is read as YAML (which also covers JSON).
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Format::Toml,
            _ => Format::Yaml,
        }
    }
}

impl FleetConfig {
    /// Read and parse a fleet document, rejecting one without VMs.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::parse(&content, Format::from_path(path)).map_err(|source| {
            Error::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;

        log::debug!("Loaded {} VM(s) from {}", config.vms.len(), path.display());
        config.ensure_not_empty(&path.display().to_string())?;
        Ok(config)
    }

    /// Parse a fleet document from a string. Does not check for emptiness.
    pub fn parse(content: &str, format: Format) -> std::result::Result<Self, ParseError> {
        let config = match format {
            Format::Yaml => serde_yaml::from_str(content)?,
            Format::Toml => toml::from_str(content)?,
        };
        Ok(config)
    }

    /// Fail if the document defines no VMs.
    pub fn ensure_not_empty(&self, origin: &str) -> Result<()> {
        if self.vms.is_empty() {
            return Err(Error::EmptyFleet {
                origin: origin.to_string(),
            });
        }
        Ok(())
    }
}

/// Accept `name:` with no body (YAML null) as an empty spec.
fn nullable_specs<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, VmSpec>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Option<VmSpec>>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(name, spec)| (name, spec.unwrap_or_default()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const YAML: &str = r#"
defaults:
  os: macos
  cpu: 6
  memory: 16GB
  disk-size: 80GB
  unattended: tahoe
  vnc-port: 6100

vms:
  dev-mac:
    tags: [dev, mac]
  ci-linux:
    os: linux
    cpu: 2
    shared-dir: ~/src
    image: ~/isos/ubuntu.iso
    autostart: false
  bare:
"#;

    #[test]
    fn test_parse_yaml() {
        let config = FleetConfig::parse(YAML, Format::Yaml).unwrap();

        assert_eq!(config.defaults.os, "macos");
        assert_eq!(config.defaults.cpu, 6);
        assert_eq!(config.defaults.disk_size, "80GB");
        assert_eq!(config.defaults.vnc_port, 6100);
        assert_eq!(config.vms.len(), 3);

        let dev = &config.vms["dev-mac"];
        assert_eq!(dev.tags, vec!["dev", "mac"]);
        assert_eq!(dev.autostart, Autostart::Unset);

        let ci = &config.vms["ci-linux"];
        assert_eq!(ci.os, "linux");
        assert_eq!(ci.shared_dir, "~/src");
        assert_eq!(ci.autostart, Autostart::Disabled);

        assert_eq!(config.vms["bare"], VmSpec::default());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[defaults]
os = "linux"
cpu = 2

[vms.dev]

[vms.web]
memory = "4GB"
autostart = true
tags = ["web"]
"#;
        let config = FleetConfig::parse(toml, Format::Toml).unwrap();
        assert_eq!(config.defaults.os, "linux");
        assert_eq!(config.vms["dev"], VmSpec::default());
        assert_eq!(config.vms["web"].memory, "4GB");
        assert_eq!(config.vms["web"].autostart, Autostart::Enabled);
    }

    #[test]
    fn test_vms_are_ordered_by_name() {
        let config = FleetConfig::parse(YAML, Format::Yaml).unwrap();
        let names: Vec<&str> = config.vms.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["bare", "ci-linux", "dev-mac"]);
    }

    #[test]
    fn test_autostart_resolve() {
        assert!(Autostart::Unset.resolve(true));
        assert!(!Autostart::Unset.resolve(false));
        assert!(Autostart::Enabled.resolve(false));
        assert!(!Autostart::Disabled.resolve(true));
    }

    #[test]
    fn test_autostart_null_is_unset() {
        let spec: VmSpec = serde_yaml::from_str("autostart: null").unwrap();
        assert_eq!(spec.autostart, Autostart::Unset);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let config = FleetConfig::parse("vms:\n  a:\n    colour: blue\n", Format::Yaml).unwrap();
        assert_eq!(config.vms["a"], VmSpec::default());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path(Path::new("fleet.yml")), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("fleet.yaml")), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("fleet.TOML")), Format::Toml);
        assert_eq!(Format::from_path(Path::new("fleet")), Format::Yaml);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();

        let config = FleetConfig::load(file.path()).unwrap();
        assert_eq!(config.vms.len(), 3);
    }

    #[test]
    fn test_load_rejects_empty_fleet() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        file.write_all(b"defaults:\n  os: linux\n").unwrap();

        let err = FleetConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::EmptyFleet { .. }));
        assert!(err.to_string().contains("no VMs defined"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FleetConfig::load(&dir.path().join("fleet.yml")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        file.write_all(b"vms: [not, a, map]\n").unwrap();

        let err = FleetConfig::load(file.path()).unwrap_err();
        assert!(matches!(
            err,
            Error::Parse {
                source: ParseError::Yaml(_),
                ..
            }
        ));
    }

    #[test]
    fn test_parse_invalid_toml_is_typed() {
        let err = FleetConfig::parse("vms = [1, 2]\n", Format::Toml).unwrap_err();
        assert!(matches!(err, ParseError::Toml(_)));
        assert!(!err.to_string().is_empty());
    }
}
