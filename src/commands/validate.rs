use anyhow::Result;
use colored::Colorize;

use crate::Context;
use crate::ui;

/// Load and resolve the fleet, then print what each VM resolved to.
pub fn run(ctx: &Context) -> Result<()> {
    let (path, vms) = super::load_fleet(ctx)?;

    ui::header("Fleet Config");
    ui::kv("File", &path.display().to_string());
    ui::kv("VMs", &vms.len().to_string());
    println!();

    let rows: Vec<Vec<String>> = vms
        .iter()
        .map(|vm| {
            vec![
                vm.name.clone(),
                vm.os.clone(),
                vm.cpu.to_string(),
                vm.memory.clone(),
                vm.disk_size.clone(),
                if vm.autostart { "yes" } else { "no" }.to_string(),
                vm.tags.join(", "),
            ]
        })
        .collect();
    println!(
        "{}",
        ui::table(
            &["NAME", "OS", "CPU", "MEMORY", "DISK", "AUTOSTART", "TAGS"],
            &rows
        )
    );

    if ctx.verbose > 0 {
        for vm in &vms {
            println!();
            println!("  {}", vm.name.bold());
            for (key, value) in [
                ("image", vm.image.as_str()),
                ("shared-dir", vm.shared_dir.as_str()),
                ("unattended", vm.unattended.as_str()),
                ("storage", vm.storage.as_str()),
            ] {
                if !value.is_empty() {
                    ui::kv(key, value);
                }
            }
            if vm.vnc_port != 0 {
                ui::kv("vnc-port", &vm.vnc_port.to_string());
            }
        }
    }

    println!();
    ui::success("Config is valid");
    Ok(())
}
