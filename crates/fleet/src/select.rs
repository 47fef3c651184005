//! Narrow a resolved fleet down to the VMs a command should touch.
//!
//! Both filters are plain intersections, so they compose in either order.

use crate::resolve::ResolvedVm;

/// Keep only VMs whose name is in `names`. An empty list keeps everything.
pub fn select_by_name(vms: Vec<ResolvedVm>, names: &[String]) -> Vec<ResolvedVm> {
    if names.is_empty() {
        return vms;
    }
    vms.into_iter()
        .filter(|vm| names.iter().any(|n| *n == vm.name))
        .collect()
}

/// Keep only VMs carrying `tag`. `None` or an empty tag keeps everything.
pub fn select_by_tag(vms: Vec<ResolvedVm>, tag: Option<&str>) -> Vec<ResolvedVm> {
    match tag {
        Some(tag) if !tag.is_empty() => vms.into_iter().filter(|vm| vm.has_tag(tag)).collect(),
        _ => vms,
    }
}
