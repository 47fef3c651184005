use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;
use fleet::{Action, AdmissionPolicy, ExecuteOptions, count_running_of_family, execute, plan_destroy};

use crate::Context;
use crate::cli::DestroyArgs;
use crate::progress::ConsoleProgress;
use crate::ui;

pub fn run(ctx: &Context, args: DestroyArgs) -> Result<()> {
    let vms = super::load_selection(ctx, &args.selection)?;
    if !super::has_selection(&vms) {
        return Ok(());
    }

    let backend = super::connect(ctx);
    let observed = super::list_observed(ctx, backend.as_ref())?;

    let actions = plan_destroy(&vms, &observed);
    if actions.is_empty() {
        println!("No existing VMs to destroy.");
        return Ok(());
    }

    if args.dry_run {
        super::print_plan(&actions);
        return Ok(());
    }

    if !args.force && !confirm(&actions)? {
        return Ok(());
    }

    let policy = AdmissionPolicy::macos();
    let report = execute(
        &actions,
        &policy,
        count_running_of_family(&observed, policy.family()),
        backend.as_ref(),
        &ExecuteOptions::default(),
        &mut ConsoleProgress::new(ctx.quiet),
    );

    super::finish(ctx, &report)
}

/// List the targets and ask. Without a terminal, only list them.
fn confirm(actions: &[Action]) -> Result<bool> {
    println!("About to destroy {} VM(s):", actions.len());
    for action in actions {
        let status = action.current.as_ref().map_or("", |vm| vm.status.as_str());
        println!("  - {} {}", action.name(), format!("({status})").dimmed());
    }
    println!();

    if !console::Term::stdout().is_term() {
        ui::warn("This is irreversible. Use --force to confirm.");
        return Ok(false);
    }

    let confirmed = Confirm::new()
        .with_prompt("This is irreversible. Continue?")
        .default(false)
        .interact()?;

    if !confirmed {
        ui::info("Aborted");
    }
    Ok(confirmed)
}
