use anyhow::Result;
use fleet::{AdmissionPolicy, ExecuteOptions, count_running_of_family, execute, plan_stop};

use crate::Context;
use crate::cli::DownArgs;
use crate::progress::ConsoleProgress;

pub fn run(ctx: &Context, args: DownArgs) -> Result<()> {
    let vms = super::load_selection(ctx, &args.selection)?;
    if !super::has_selection(&vms) {
        return Ok(());
    }

    let backend = super::connect(ctx);
    let observed = super::list_observed(ctx, backend.as_ref())?;

    let actions = plan_stop(&vms, &observed);
    if actions.is_empty() {
        println!("No running VMs to stop.");
        return Ok(());
    }

    if args.dry_run {
        super::print_plan(&actions);
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
