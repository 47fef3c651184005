//! Execution loop - applies planned actions one VM at a time
//!
//! Each VM's failure is recorded and the loop moves on. The running tally for
//! the admission policy is threaded through the loop and returned in the
//! report; it is never re-queried from the hypervisor mid-run.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use lume::{Backend, CreateRequest, RunRequest};
use serde::Serialize;

use crate::admission::{Admission, AdmissionPolicy};
use crate::context::ProgressCallback;
use crate::error::{Error, Result};
use crate::reconcile::{Action, ActionKind};
use crate::resolve::ResolvedVm;

/// Default display resolution for created VMs
pub const DEFAULT_DISPLAY: &str = "1024x768";

/// IPSW value asking Lume to download the newest macOS restore image
pub const LATEST_IPSW: &str = "latest";

/// Default bound on waiting for a created VM to finish provisioning
pub const DEFAULT_PROVISION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Default delay between provisioning polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Knobs for [`execute`].
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    pub provision_timeout: Duration,
    pub poll_interval: Duration,
    pub display: String,
    /// Network mode passed on create, Lume's default when `None`
    pub network: Option<String>,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            provision_timeout: DEFAULT_PROVISION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            display: DEFAULT_DISPLAY.to_string(),
            network: None,
        }
    }
}

/// A single hypervisor step within an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Create,
    Provision,
    Start,
    Stop,
    Delete,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::Create => "create",
            Step::Provision => "provision",
            Step::Start => "start",
            Step::Stop => "stop",
            Step::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// How one VM's action ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Outcome {
    /// Nothing to do
    Unchanged,
    Created,
    Started,
    Stopped,
    Destroyed,
    /// Skipped by admission control; counts as a failure
    Denied { reason: String },
    /// A hypervisor step failed or timed out
    Failed { step: Step, error: String },
}

impl Outcome {
    /// Check if the outcome counts toward the failure tally
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Denied { .. } | Outcome::Failed { .. })
    }
}

/// Per-VM record of an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VmResult {
    pub name: String,
    pub kind: ActionKind,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Aggregate result of [`execute`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecuteReport {
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<VmResult>,
    /// Admission tally after the last action
    pub running_tally: usize,
}

impl ExecuteReport {
    /// Check if every action succeeded
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    fn record(&mut self, result: VmResult) {
        if result.outcome.is_failure() {
            self.failed += 1;
        } else {
            self.succeeded += 1;
        }
        self.results.push(result);
    }
}

/// Apply `actions` in order against `backend`.
///
/// `running` seeds the admission tally, normally from
/// [`count_running_of_family`](crate::reconcile::count_running_of_family)
/// on the snapshot the plan was built from.
pub fn execute<B, P>(
    actions: &[Action],
    policy: &AdmissionPolicy,
    running: usize,
    backend: &B,
    options: &ExecuteOptions,
    progress: &mut P,
) -> ExecuteReport
where
    B: Backend + ?Sized,
    P: ProgressCallback,
{
    let mut report = ExecuteReport::default();
    let mut tally = running;

    log::debug!(
        "Executing {} action(s) via {} backend, {} {} VM(s) running",
        actions.len(),
        backend.name(),
        tally,
        policy.family()
    );

    for action in actions {
        let (outcome, next_tally) = apply(action, policy, tally, backend, options, progress);
        tally = next_tally;

        let result = VmResult {
            name: action.name().to_string(),
            kind: action.kind,
            outcome,
        };
        progress.on_complete(&result);
        report.record(result);
    }

    report.running_tally = tally;
    report
}

/// Apply one action, returning its outcome and the updated tally.
fn apply<B, P>(
    action: &Action,
    policy: &AdmissionPolicy,
    tally: usize,
    backend: &B,
    options: &ExecuteOptions,
    progress: &mut P,
) -> (Outcome, usize)
where
    B: Backend + ?Sized,
    P: ProgressCallback,
{
    let vm = &action.vm;
    let counted = policy.applies_to(&vm.os);

    match action.kind {
        ActionKind::Noop => (Outcome::Unchanged, tally),

        ActionKind::Create | ActionKind::Start => {
            if let Admission::Denied { running, limit } = policy.admit(tally, &vm.os) {
                log::debug!("Admission denied for {}", vm.name);
                let reason = format!(
                    "{} concurrency limit reached ({running}/{limit} running)",
                    policy.family()
                );
                return (Outcome::Denied { reason }, tally);
            }

            let created = action.kind == ActionKind::Create;
            let outcome = match bring_up(vm, created, backend, options, progress) {
                Ok(()) if created => Outcome::Created,
                Ok(()) => Outcome::Started,
                Err((step, e)) => return (failed(step, &e), tally),
            };
            (outcome, if counted { tally + 1 } else { tally })
        }

        ActionKind::Stop => {
            progress.on_step(&vm.name, Step::Stop);
            match backend.stop_vm(&vm.name) {
                Ok(()) => (Outcome::Stopped, release(tally, counted)),
                Err(e) => (failed(Step::Stop, &e.into()), tally),
            }
        }

        ActionKind::Destroy => {
            let mut tally = tally;
            if action.was_running() {
                progress.on_step(&vm.name, Step::Stop);
                if let Err(e) = backend.stop_vm(&vm.name) {
                    return (failed(Step::Stop, &e.into()), tally);
                }
                tally = release(tally, counted);
            }

            progress.on_step(&vm.name, Step::Delete);
            match backend.delete_vm(&vm.name) {
                Ok(()) => (Outcome::Destroyed, tally),
                Err(e) => (failed(Step::Delete, &e.into()), tally),
            }
        }
    }
}

/// Create (when asked), wait for provisioning, then boot.
fn bring_up<B, P>(
    vm: &ResolvedVm,
    create: bool,
    backend: &B,
    options: &ExecuteOptions,
    progress: &mut P,
) -> std::result::Result<(), (Step, Error)>
where
    B: Backend + ?Sized,
    P: ProgressCallback,
{
    if create {
        progress.on_step(&vm.name, Step::Create);
        backend
            .create_vm(&create_request(vm, options))
            .map_err(|e| (Step::Create, Error::from(e)))?;

        progress.on_step(&vm.name, Step::Provision);
        wait_for_provisioned(backend, &vm.name, options).map_err(|e| (Step::Provision, e))?;
    }

    progress.on_step(&vm.name, Step::Start);
    backend
        .run_vm(&vm.name, &run_request(vm, create))
        .map_err(|e| (Step::Start, Error::from(e)))
}

fn failed(step: Step, error: &Error) -> Outcome {
    Outcome::Failed {
        step,
        error: error.to_string(),
    }
}

fn release(tally: usize, counted: bool) -> usize {
    if counted { tally.saturating_sub(1) } else { tally }
}

/// Build the create request for a resolved VM.
pub fn create_request(vm: &ResolvedVm, options: &ExecuteOptions) -> CreateRequest {
    let ipsw = vm.is_macos().then(|| {
        if vm.image.is_empty() {
            LATEST_IPSW.to_string()
        } else {
            vm.image.clone()
        }
    });

    CreateRequest {
        name: vm.name.clone(),
        os: vm.os.clone(),
        cpu: vm.cpu,
        memory: vm.memory.clone(),
        disk_size: vm.disk_size.clone(),
        display: options.display.clone(),
        ipsw,
        unattended: non_empty(&vm.unattended),
        vnc_port: (vm.vnc_port != 0).then_some(vm.vnc_port),
        storage: non_empty(&vm.storage),
        network: options.network.clone(),
    }
}

/// Build the run request. Install media is only attached on the first boot
/// after a create, and only for non-macOS guests.
pub fn run_request(vm: &ResolvedVm, after_create: bool) -> RunRequest {
    let mount = if after_create && !vm.is_macos() {
        non_empty(&vm.image)
    } else {
        None
    };

    RunRequest {
        no_display: true,
        shared_dir: non_empty(&vm.shared_dir),
        mount,
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Poll until `name` is provisioned or the timeout passes.
///
/// Lookup errors during the wait are logged and polling continues; the VM
/// may not be listed yet right after an async create.
pub fn wait_for_provisioned<B: Backend + ?Sized>(
    backend: &B,
    name: &str,
    options: &ExecuteOptions,
) -> Result<()> {
    // A timeout too large for `Instant` means no deadline.
    let deadline = Instant::now().checked_add(options.provision_timeout);

    loop {
        match backend.get_vm(name) {
            Ok(vm) if vm.is_provisioned() => {
                log::debug!("{name} provisioned");
                return Ok(());
            }
            Ok(vm) => log::debug!("{name} still provisioning (status {:?})", vm.status),
            Err(e) => log::debug!("{name} not ready: {e}"),
        }

        let mut pause = options.poll_interval;
        if let Some(deadline) = deadline {
            let now = Instant::now();
            if now >= deadline {
                return Err(Error::ProvisionTimeout {
                    vm: name.to_string(),
                    timeout: options.provision_timeout,
                });
            }
            pause = pause.min(deadline - now);
        }
        thread::sleep(pause);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NoProgress;
    use crate::reconcile::{count_running_of_family, plan_bring_up, plan_destroy, plan_stop};
    use lume::Vm;
    use std::cell::{Cell, RefCell};

    /// Records every call; operations listed in `fail` return an error.
    #[derive(Default)]
    struct MockBackend {
        calls: RefCell<Vec<String>>,
        fail: Vec<String>,
        never_provisions: bool,
        polls: Cell<usize>,
    }

    impl MockBackend {
        fn failing(ops: &[&str]) -> Self {
            Self {
                fail: ops.iter().map(|s| (*s).to_string()).collect(),
                ..Default::default()
            }
        }

        fn call(&self, op: &str, name: &str) -> lume::Result<()> {
            let entry = format!("{op} {name}");
            self.calls.borrow_mut().push(entry.clone());
            if self.fail.contains(&entry) {
                return Err(lume::Error::CommandFailed {
                    command: format!("lume {entry}"),
                    output: "boom".into(),
                });
            }
            Ok(())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl Backend for MockBackend {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn list_vms(&self) -> lume::Result<Vec<Vm>> {
            Ok(Vec::new())
        }

        fn get_vm(&self, name: &str) -> lume::Result<Vm> {
            self.polls.set(self.polls.get() + 1);
            let status = if self.never_provisions {
                "provisioning"
            } else {
                lume::STATUS_STOPPED
            };
            Ok(Vm {
                name: name.to_string(),
                status: status.to_string(),
                ..Default::default()
            })
        }

        fn create_vm(&self, request: &CreateRequest) -> lume::Result<()> {
            self.call("create", &request.name)
        }

        fn run_vm(&self, name: &str, _request: &RunRequest) -> lume::Result<()> {
            self.call("run", name)
        }

        fn stop_vm(&self, name: &str) -> lume::Result<()> {
            self.call("stop", name)
        }

        fn delete_vm(&self, name: &str) -> lume::Result<()> {
            self.call("delete", name)
        }
    }

    /// Records the progress events it receives.
    #[derive(Default)]
    struct RecordingProgress {
        steps: Vec<(String, Step)>,
        completed: Vec<String>,
    }

    impl ProgressCallback for RecordingProgress {
        fn on_step(&mut self, vm: &str, step: Step) {
            self.steps.push((vm.to_string(), step));
        }

        fn on_complete(&mut self, result: &VmResult) {
            self.completed.push(result.name.clone());
        }
    }

    fn fast() -> ExecuteOptions {
        ExecuteOptions {
            provision_timeout: Duration::from_secs(5),
            poll_interval: Duration::ZERO,
            ..Default::default()
        }
    }

    fn desired(name: &str, os: &str) -> ResolvedVm {
        ResolvedVm {
            name: name.to_string(),
            os: os.to_string(),
            cpu: 4,
            memory: "8GB".into(),
            disk_size: "50GB".into(),
            shared_dir: String::new(),
            unattended: String::new(),
            vnc_port: 0,
            image: String::new(),
            storage: String::new(),
            tags: Vec::new(),
            autostart: true,
        }
    }

    fn observed(name: &str, os: &str, status: &str) -> Vm {
        Vm {
            name: name.to_string(),
            os: os.to_string(),
            status: status.to_string(),
            ..Default::default()
        }
    }

    fn run_plan(actions: &[Action], seed: usize, backend: &MockBackend) -> ExecuteReport {
        execute(
            actions,
            &AdmissionPolicy::macos(),
            seed,
            backend,
            &fast(),
            &mut NoProgress,
        )
    }

    #[test]
    fn test_two_macos_creates_fill_both_slots() {
        let want = vec![desired("mac1", "macos"), desired("mac2", "macos")];
        let actions = plan_bring_up(&want, &[]);
        let backend = MockBackend::default();

        let report = run_plan(&actions, 0, &backend);

        assert!(report.is_success());
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.running_tally, 2);
        assert_eq!(
            backend.calls(),
            vec!["create mac1", "run mac1", "create mac2", "run mac2"]
        );
        assert!(
            report
                .results
                .iter()
                .all(|r| r.outcome == Outcome::Created)
        );
    }

    #[test]
    fn test_second_macos_denied_when_one_already_running() {
        let want = vec![desired("mac1", "macos"), desired("mac2", "macos")];
        let have = vec![observed("elsewhere", "macos", "running")];
        let actions = plan_bring_up(&want, &have);
        let seed = count_running_of_family(&have, "macos");
        assert_eq!(seed, 1);

        let backend = MockBackend::default();
        let report = run_plan(&actions, seed, &backend);

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert!(!report.is_success());
        assert_eq!(report.running_tally, 2);
        assert_eq!(report.results[0].outcome, Outcome::Created);
        assert!(matches!(report.results[1].outcome, Outcome::Denied { .. }));
        // The denied VM never reached the hypervisor.
        assert_eq!(backend.calls(), vec!["create mac1", "run mac1"]);
    }

    #[test]
    fn test_non_macos_ignores_full_tally() {
        let want = vec![desired("mac", "macos"), desired("linux", "linux")];
        let have = vec![observed("linux", "linux", "stopped")];
        let actions = plan_bring_up(&want, &have);
        let backend = MockBackend::default();

        let report = run_plan(&actions, 2, &backend);

        assert!(matches!(report.results[0].outcome, Outcome::Denied { .. }));
        assert_eq!(report.results[1].outcome, Outcome::Started);
        assert_eq!(report.running_tally, 2);
        assert_eq!(backend.calls(), vec!["run linux"]);
    }

    #[test]
    fn test_failure_is_isolated_per_vm() {
        let want = vec![
            desired("a", "linux"),
            desired("b", "linux"),
            desired("c", "linux"),
        ];
        let actions = plan_bring_up(&want, &[]);
        let backend = MockBackend::failing(&["create b"]);

        let report = run_plan(&actions, 0, &backend);

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        match &report.results[1].outcome {
            Outcome::Failed { step, error } => {
                assert_eq!(*step, Step::Create);
                assert!(error.contains("boom"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(
            backend.calls(),
            vec!["create a", "run a", "create b", "create c", "run c"]
        );
    }

    #[test]
    fn test_failed_run_does_not_count_against_tally() {
        let actions = plan_bring_up(&[desired("mac", "macos")], &[]);
        let backend = MockBackend::failing(&["run mac"]);

        let report = run_plan(&actions, 0, &backend);

        assert_eq!(report.running_tally, 0);
        assert!(matches!(
            report.results[0].outcome,
            Outcome::Failed {
                step: Step::Start,
                ..
            }
        ));
    }

    #[test]
    fn test_noop_is_success_without_calls() {
        let want = vec![desired("dev", "macos")];
        let have = vec![observed("dev", "macos", "running")];
        let actions = plan_bring_up(&want, &have);
        let backend = MockBackend::default();

        let report = run_plan(&actions, 1, &backend);

        assert!(report.is_success());
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.results[0].outcome, Outcome::Unchanged);
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_provision_timeout_skips_run_and_keeps_vm() {
        let actions = plan_bring_up(&[desired("slow", "linux")], &[]);
        let backend = MockBackend {
            never_provisions: true,
            ..Default::default()
        };
        let options = ExecuteOptions {
            provision_timeout: Duration::ZERO,
            poll_interval: Duration::ZERO,
            ..Default::default()
        };

        let report = execute(
            &actions,
            &AdmissionPolicy::macos(),
            0,
            &backend,
            &options,
            &mut NoProgress,
        );

        assert_eq!(report.failed, 1);
        match &report.results[0].outcome {
            Outcome::Failed { step, error } => {
                assert_eq!(*step, Step::Provision);
                assert!(error.contains("timed out"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        // No run and no rollback delete.
        assert_eq!(backend.calls(), vec!["create slow"]);
        assert!(backend.polls.get() >= 1);
    }

    #[test]
    fn test_huge_provision_timeout_waits_without_deadline() {
        let backend = MockBackend::default();
        let options = ExecuteOptions {
            provision_timeout: Duration::from_secs(u64::MAX.saturating_mul(60)),
            poll_interval: Duration::ZERO,
            ..Default::default()
        };

        wait_for_provisioned(&backend, "dev", &options).unwrap();
        assert_eq!(backend.polls.get(), 1);
    }

    #[test]
    fn test_stop_releases_slot() {
        let want = vec![desired("mac", "macos"), desired("linux", "linux")];
        let have = vec![
            observed("mac", "macos", "running"),
            observed("linux", "linux", "running"),
        ];
        let actions = plan_stop(&want, &have);
        let backend = MockBackend::default();

        let report = run_plan(&actions, 1, &backend);

        assert!(report.is_success());
        assert_eq!(report.running_tally, 0);
        assert_eq!(backend.calls(), vec!["stop mac", "stop linux"]);
    }

    #[test]
    fn test_destroy_running_stops_then_deletes() {
        let want = vec![desired("run", "macos"), desired("idle", "macos")];
        let have = vec![
            observed("run", "macos", "Running"),
            observed("idle", "macos", "stopped"),
        ];
        let actions = plan_destroy(&want, &have);
        let backend = MockBackend::default();

        let report = run_plan(&actions, 1, &backend);

        assert!(report.is_success());
        assert_eq!(report.running_tally, 0);
        assert_eq!(
            backend.calls(),
            vec!["stop run", "delete run", "delete idle"]
        );
    }

    #[test]
    fn test_destroy_never_deletes_after_failed_stop() {
        let want = vec![desired("stuck", "linux"), desired("other", "linux")];
        let have = vec![
            observed("stuck", "linux", "running"),
            observed("other", "linux", "stopped"),
        ];
        let actions = plan_destroy(&want, &have);
        let backend = MockBackend::failing(&["stop stuck"]);

        let report = run_plan(&actions, 0, &backend);

        assert_eq!(report.failed, 1);
        assert_eq!(report.succeeded, 1);
        assert!(matches!(
            report.results[0].outcome,
            Outcome::Failed {
                step: Step::Stop,
                ..
            }
        ));
        assert_eq!(
            backend.calls(),
            vec!["stop stuck", "delete other"]
        );
    }

    #[test]
    fn test_progress_sees_steps_in_order() {
        let actions = plan_bring_up(&[desired("dev", "linux")], &[]);
        let backend = MockBackend::default();
        let mut progress = RecordingProgress::default();

        execute(
            &actions,
            &AdmissionPolicy::macos(),
            0,
            &backend,
            &fast(),
            &mut progress,
        );

        let steps: Vec<Step> = progress.steps.iter().map(|(_, s)| *s).collect();
        assert_eq!(steps, vec![Step::Create, Step::Provision, Step::Start]);
        assert_eq!(progress.completed, vec!["dev"]);
    }

    #[test]
    fn test_create_request_for_macos() {
        let mut vm = desired("mac", "macos");
        vm.unattended = "tahoe".into();
        vm.vnc_port = 5901;
        vm.storage = "fast".into();

        let request = create_request(&vm, &ExecuteOptions::default());
        assert_eq!(request.display, "1024x768");
        assert_eq!(request.ipsw.as_deref(), Some("latest"));
        assert_eq!(request.unattended.as_deref(), Some("tahoe"));
        assert_eq!(request.vnc_port, Some(5901));
        assert_eq!(request.storage.as_deref(), Some("fast"));
        assert_eq!(request.network, None);

        vm.image = "/images/sequoia.ipsw".into();
        let request = create_request(&vm, &ExecuteOptions::default());
        assert_eq!(request.ipsw.as_deref(), Some("/images/sequoia.ipsw"));
    }

    #[test]
    fn test_create_request_for_linux_has_no_ipsw() {
        let mut vm = desired("linux", "linux");
        vm.image = "/isos/ubuntu.iso".into();

        let request = create_request(&vm, &ExecuteOptions::default());
        assert_eq!(request.ipsw, None);
        assert_eq!(request.vnc_port, None);
        assert_eq!(request.unattended, None);
    }

    #[test]
    fn test_run_request_mounts_iso_only_after_create() {
        let mut vm = desired("linux", "linux");
        vm.image = "/isos/ubuntu.iso".into();
        vm.shared_dir = "/src".into();

        let first = run_request(&vm, true);
        assert!(first.no_display);
        assert_eq!(first.mount.as_deref(), Some("/isos/ubuntu.iso"));
        assert_eq!(first.shared_dir.as_deref(), Some("/src"));

        assert_eq!(run_request(&vm, false).mount, None);

        let mut mac = desired("mac", "macos");
        mac.image = "/images/sequoia.ipsw".into();
        assert_eq!(run_request(&mac, true).mount, None);
    }

    #[test]
    fn test_report_serializes_outcomes() {
        let mut report = ExecuteReport::default();
        report.record(VmResult {
            name: "dev".into(),
            kind: ActionKind::Create,
            outcome: Outcome::Failed {
                step: Step::Provision,
                error: "timed out".into(),
            },
        });

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["failed"], 1);
        assert_eq!(json["results"][0]["kind"], "create");
        assert_eq!(json["results"][0]["outcome"], "failed");
        assert_eq!(json["results"][0]["step"], "provision");
    }
}
