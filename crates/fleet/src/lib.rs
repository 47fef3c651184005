//! # fleet
//!
//! Declarative management of a fleet of Lume virtual machines.
//!
//! A fleet document lists desired VMs plus shared defaults. This crate turns
//! that document into concrete actions and applies them:
//!
//! 1. [`FleetConfig::load`] reads the document (YAML or TOML)
//! 2. [`resolve`] merges defaults and validates every VM
//! 3. [`select_by_name`] / [`select_by_tag`] narrow the set
//! 4. [`plan_bring_up`], [`plan_stop`] or [`plan_destroy`] diff it against
//!    what Lume reports
//! 5. [`execute`] applies the plan one VM at a time, under an
//!    [`AdmissionPolicy`] that caps concurrent macOS guests
//!
//! ## Example
//!
//! ```ignore
//! use std::path::Path;
//! use fleet::{AdmissionPolicy, ExecuteOptions, FleetConfig, NoProgress, MACOS};
//! use lume::Backend;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let desired = FleetConfig::load(Path::new("fleet.yml"))?.resolve()?;
//! let backend = lume::connect(&lume::ConnectOptions::default());
//! let observed = backend.list_vms()?;
//!
//! let actions = fleet::plan_bring_up(&desired, &observed);
//! let running = fleet::count_running_of_family(&observed, MACOS);
//! let report = fleet::execute(
//!     &actions,
//!     &AdmissionPolicy::macos(),
//!     running,
//!     &backend,
//!     &ExecuteOptions::default(),
//!     &mut NoProgress,
//! );
//! println!("{} ok, {} failed", report.succeeded, report.failed);
//! # Ok(())
//! # }
//! ```
//!
//! The crate only depends on the [`lume::Backend`] trait, never on a
//! particular transport.

#![deny(unsafe_code)]

pub mod admission;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod reconcile;
pub mod resolve;
pub mod select;
pub mod size;

pub use admission::{Admission, AdmissionPolicy, MACOS_CONCURRENCY_LIMIT};
pub use config::{Autostart, FleetConfig, Format, VmDefaults, VmSpec};
pub use context::{NoProgress, ProgressCallback};
pub use error::{Error, ParseError, Result};
pub use executor::{ExecuteOptions, ExecuteReport, Outcome, Step, VmResult, execute};
pub use reconcile::{
    Action, ActionKind, count_running_of_family, index_by_name, plan_bring_up, plan_destroy,
    plan_stop,
};
pub use resolve::{MACOS, ResolvedVm, resolve};
pub use select::{select_by_name, select_by_tag};
pub use size::{SizeError, parse_size};
