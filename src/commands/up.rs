use anyhow::Result;
use fleet::{AdmissionPolicy, ExecuteOptions, count_running_of_family, execute, plan_bring_up};
use std::time::Duration;

use crate::Context;
use crate::cli::UpArgs;
use crate::progress::ConsoleProgress;

pub fn run(ctx: &Context, args: UpArgs) -> Result<()> {
    let vms = super::load_selection(ctx, &args.selection)?;
    if !super::has_selection(&vms) {
        return Ok(());
    }

    let backend = super::connect(ctx);
    let observed = super::list_observed(ctx, backend.as_ref())?;

    let actions = plan_bring_up(&vms, &observed);
    if actions.is_empty() {
        println!("No VMs to bring up (autostart is off for every match).");
        return Ok(());
    }

    if args.dry_run {
        super::print_plan(&actions);
        return Ok(());
    }

    let policy = AdmissionPolicy::macos();
    let running = count_running_of_family(&observed, policy.family());
    log::info!(
        "{running}/{} {} slot(s) in use",
        policy.limit(),
        policy.family()
    );

    let options = ExecuteOptions {
        provision_timeout: Duration::from_secs(args.timeout.saturating_mul(60)),
        ..Default::default()
    };

    let report = execute(
        &actions,
        &policy,
        running,
        backend.as_ref(),
        &options,
        &mut ConsoleProgress::new(ctx.quiet),
    );

    super::finish(ctx, &report)
}
