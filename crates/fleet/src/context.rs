//! Progress reporting hooks for the execution loop.
//!
//! Lets the loop stay free of any terminal or UI dependency.

use crate::executor::{Step, VmResult};

/// Progress callback for execution
///
/// Implement this trait to receive progress updates while actions run.
pub trait ProgressCallback {
    /// Called before each hypervisor step for a VM
    fn on_step(&mut self, vm: &str, step: Step);

    /// Called once a VM's action has finished, successfully or not
    fn on_complete(&mut self, result: &VmResult);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_step(&mut self, _vm: &str, _step: Step) {}
    fn on_complete(&mut self, _result: &VmResult) {}
}
