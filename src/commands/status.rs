use anyhow::Result;
use colored::Colorize;
use fleet::{AdmissionPolicy, ResolvedVm, count_running_of_family, index_by_name, select_by_tag};
use lume::Vm;
use serde::Serialize;

use crate::Context;
use crate::cli::StatusArgs;
use crate::ui;

/// State shown for a fleet VM Lume does not know about
const NOT_CREATED: &str = "not created";

/// One VM in the status view: desired config overlaid with what Lume reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRow {
    pub name: String,
    pub state: String,
    pub ip: String,
    pub os: String,
    pub cpu: u32,
    pub memory: String,
    pub tags: Vec<String>,
}

pub fn run(ctx: &Context, args: StatusArgs) -> Result<()> {
    let (_, vms) = super::load_fleet(ctx)?;
    let vms = select_by_tag(vms, args.tag.as_deref());
    if !super::has_selection(&vms) {
        return Ok(());
    }

    let backend = super::connect(ctx);
    let observed = super::list_observed(ctx, backend.as_ref())?;
    let rows = build_rows(&vms, &observed);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let policy = AdmissionPolicy::macos();
    let running = count_running_of_family(&observed, policy.family());
    println!("{}", render(&rows, running, policy.limit()));
    Ok(())
}

/// Merge resolved VMs with observed state. Observed CPU and memory win.
pub fn build_rows(vms: &[ResolvedVm], observed: &[Vm]) -> Vec<StatusRow> {
    let index = index_by_name(observed);

    vms.iter()
        .map(|vm| {
            let mut row = StatusRow {
                name: vm.name.clone(),
                state: NOT_CREATED.to_string(),
                ip: String::new(),
                os: vm.os.clone(),
                cpu: vm.cpu,
                memory: vm.memory.clone(),
                tags: vm.tags.clone(),
            };

            if let Some(current) = index.get(vm.name.as_str()) {
                row.state = current.status.clone();
                row.ip = current.ip_address.clone().unwrap_or_default();
                row.cpu = current.cpu_count;
                row.memory = ui::format_bytes(current.memory_size);
            }

            if row.ip.is_empty() {
                row.ip = "-".to_string();
            }
            row
        })
        .collect()
}

fn render(rows: &[StatusRow], running: usize, limit: usize) -> String {
    let header = format!(
        "  Fleet Status ({} VMs)  |  macOS: {running}/{limit} slots",
        rows.len()
    );

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.name.clone(),
                ui::colorize_state(&r.state),
                r.ip.clone(),
                r.os.clone(),
                r.cpu.to_string(),
                r.memory.clone(),
                r.tags.join(", "),
            ]
        })
        .collect();

    format!(
        "{}\n\n{}",
        header.bold(),
        ui::table(
            &["NAME", "STATE", "IP", "OS", "CPU", "MEMORY", "TAGS"],
            &cells
        )
    )
}
