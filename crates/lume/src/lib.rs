//! # lume
//!
//! A small Rust client for [Lume](https://github.com/trycua/cua), the
//! Apple-virtualization VM manager.
//!
//! Lume offers the same operations two ways: an HTTP API served by
//! `lume serve`, and the `lume` command line. Both are wrapped behind the
//! [`Backend`] trait so callers can switch transports without touching
//! their own logic.
//!
//! ## Example
//!
//! ```no_run
//! use lume::{Backend, ConnectOptions, connect};
//!
//! let backend = connect(&ConnectOptions::default());
//! for vm in backend.list_vms().expect("lume serve not running?") {
//!     println!("{} {}", vm.name, vm.status);
//! }
//! ```
//!
//! ## Backends
//!
//! - `http` (default): blocking [`ureq`] client for `lume serve`; implies `cli`
//! - `cli` (default): `lume` sub-processes

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Backend trait and transport implementations.
pub mod backend;
/// Error types for Lume operations.
pub mod error;
/// Observed-VM and request types.
#[allow(missing_docs)]
pub mod types;

pub use backend::{Backend, ConnectOptions, DEFAULT_API_URL, DEFAULT_LUME_BIN, Transport};
#[cfg(all(feature = "http", feature = "cli"))]
pub use backend::connect;
pub use error::{Error, Result};
pub use types::{CreateRequest, DiskSize, RunRequest, STATUS_RUNNING, STATUS_STOPPED, Vm};
