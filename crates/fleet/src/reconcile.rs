//! Compare desired VMs against the hypervisor's view and plan actions.
//!
//! Planners are pure: they never call the hypervisor and emit actions in
//! the order of the desired list.

use std::collections::HashMap;
use std::fmt;

use lume::Vm;
use serde::Serialize;

use crate::resolve::ResolvedVm;

/// What to do with one VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Create,
    Start,
    Noop,
    Stop,
    Destroy,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionKind::Create => "create",
            ActionKind::Start => "start",
            ActionKind::Noop => "noop",
            ActionKind::Stop => "stop",
            ActionKind::Destroy => "destroy",
        };
        f.write_str(s)
    }
}

/// A planned lifecycle step for one VM.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub vm: ResolvedVm,
    pub kind: ActionKind,
    /// Hypervisor record at plan time; `None` for `Create`
    pub current: Option<Vm>,
}

impl Action {
    pub fn new(vm: ResolvedVm, kind: ActionKind, current: Option<Vm>) -> Self {
        Self { vm, kind, current }
    }

    /// Name of the target VM.
    pub fn name(&self) -> &str {
        &self.vm.name
    }

    /// Whether the hypervisor reported the VM running at plan time.
    pub fn was_running(&self) -> bool {
        self.current.as_ref().is_some_and(Vm::is_running)
    }
}

/// Index observed VMs by name. A duplicate name keeps the later record.
pub fn index_by_name(observed: &[Vm]) -> HashMap<&str, &Vm> {
    observed.iter().map(|vm| (vm.name.as_str(), vm)).collect()
}

/// Plan `up`: create what is missing, start what is stopped.
///
/// VMs with autostart off are skipped entirely. A VM in any status other
/// than stopped or running (provisioning, for instance) is left alone.
pub fn plan_bring_up(desired: &[ResolvedVm], observed: &[Vm]) -> Vec<Action> {
    let index = index_by_name(observed);

    let actions: Vec<Action> = desired
        .iter()
        .filter(|vm| vm.autostart)
        .map(|vm| match index.get(vm.name.as_str()) {
            None => Action::new(vm.clone(), ActionKind::Create, None),
            Some(current) if current.is_stopped() => {
                Action::new(vm.clone(), ActionKind::Start, Some((*current).clone()))
            }
            Some(current) => Action::new(vm.clone(), ActionKind::Noop, Some((*current).clone())),
        })
        .collect();

    log::info!("Planned bring-up: {} action(s)", actions.len());
    actions
}

/// Plan `down`: stop every desired VM that is currently running.
pub fn plan_stop(desired: &[ResolvedVm], observed: &[Vm]) -> Vec<Action> {
    let index = index_by_name(observed);

    let actions: Vec<Action> = desired
        .iter()
        .filter_map(|vm| {
            let current = index.get(vm.name.as_str())?;
            current
                .is_running()
                .then(|| Action::new(vm.clone(), ActionKind::Stop, Some((*current).clone())))
        })
        .collect();

    log::info!("Planned stop: {} action(s)", actions.len());
    actions
}

/// Plan `destroy`: every desired VM that exists, whatever its status.
pub fn plan_destroy(desired: &[ResolvedVm], observed: &[Vm]) -> Vec<Action> {
    let index = index_by_name(observed);

    let actions: Vec<Action> = desired
        .iter()
        .filter_map(|vm| {
            let current = index.get(vm.name.as_str())?;
            Some(Action::new(vm.clone(), ActionKind::Destroy, Some((*current).clone())))
        })
        .collect();

    log::info!("Planned destroy: {} action(s)", actions.len());
    actions
}

/// Count observed VMs of an OS family that are running right now.
pub fn count_running_of_family(observed: &[Vm], family: &str) -> usize {
    observed
        .iter()
        .filter(|vm| vm.is_os(family) && vm.is_running())
        .count()
}
