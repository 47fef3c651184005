// Lifecycle commands
pub mod destroy;
pub mod down;
pub mod up;

// Read-only commands
pub mod status;
pub mod validate;

use anyhow::{Result, bail};
use colored::Colorize;
use fleet::{Action, ExecuteReport, FleetConfig, ResolvedVm, select_by_name, select_by_tag};
use lume::{Backend, Transport, Vm};
use std::path::PathBuf;

use crate::Context;
use crate::cli::Selection;
use crate::paths;
use crate::ui;

/// Message printed when filters leave nothing to act on
pub const NO_MATCH: &str = "No VMs match the given filters.";

/// Load and resolve the fleet config.
pub fn load_fleet(ctx: &Context) -> Result<(PathBuf, Vec<ResolvedVm>)> {
    let path = paths::config_path(ctx.config.as_deref())?;
    let config = FleetConfig::load(&path)?;
    let vms = config.resolve()?;
    Ok((path, vms))
}

/// Load, resolve and filter the fleet by names and tag.
pub fn load_selection(ctx: &Context, selection: &Selection) -> Result<Vec<ResolvedVm>> {
    let (_, vms) = load_fleet(ctx)?;
    let vms = select_by_name(vms, &selection.names);
    Ok(select_by_tag(vms, selection.tag.as_deref()))
}

/// Build the configured Lume backend.
pub fn connect(ctx: &Context) -> Box<dyn Backend> {
    lume::connect(&ctx.connect)
}

/// Snapshot every VM Lume knows about.
pub fn list_observed(ctx: &Context, backend: &dyn Backend) -> Result<Vec<Vm>> {
    backend.list_vms().map_err(|e| {
        let hint = unreachable_hint(ctx, &e);
        anyhow::Error::new(e).context(hint)
    })
}

fn unreachable_hint(ctx: &Context, err: &lume::Error) -> String {
    match (ctx.connect.transport, err.is_unreachable()) {
        (Transport::Http, true) => format!(
            "cannot reach Lume API at {}. Is 'lume serve' running?",
            ctx.connect.api_url
        ),
        (Transport::Cli, true) => format!(
            "cannot run '{}'. Is Lume installed and on PATH?",
            ctx.connect.lume_bin
        ),
        (transport, false) => format!("cannot list VMs via lume {transport}"),
    }
}

/// Print the planned actions without executing them.
pub fn print_plan(actions: &[Action]) {
    ui::header(&format!("Plan ({} action(s))", actions.len()));
    for action in actions {
        let state = action
            .current
            .as_ref()
            .map_or_else(|| "absent".to_string(), |vm| vm.status.clone());
        println!(
            "  {:<8} {} {}",
            action.kind.to_string().cyan(),
            action.name(),
            format!("({state})").dimmed()
        );
    }
    println!();
    ui::dim("Dry run: no changes made");
}

/// Print the summary line and turn failures into a non-zero exit.
pub fn finish(ctx: &Context, report: &ExecuteReport) -> Result<()> {
    if report.is_success() {
        if !ctx.quiet {
            println!();
            ui::success(&format!("{} VM(s) done", report.succeeded));
        }
        return Ok(());
    }

    bail!("{} VM(s) failed", report.failed)
}

/// Ensure the selection is non-empty, printing the usual message if not.
pub fn has_selection(vms: &[ResolvedVm]) -> bool {
    if vms.is_empty() {
        println!("{NO_MATCH}");
        return false;
    }
    true
}

