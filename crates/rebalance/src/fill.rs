//! Per-group fill-ratio snapshot, shared by the balancer and drainer.

use fsview::FsView;

#[derive(Debug, Clone)]
pub struct GroupFill {
    pub group: String,
    pub used: u64,
    pub capacity: u64,
}

impl GroupFill {
    pub fn ratio(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.used as f64 / self.capacity as f64
        }
    }
}

/// Snapshots fill ratio for every group in `space`.
pub fn snapshot_group_fills(fsview: &dyn FsView, space: &str) -> crate::error::Result<Vec<GroupFill>> {
    let groups = fsview.groups_in_space(space)?;
    let mut out = Vec::with_capacity(groups.len());
    for group in groups {
        let members = fsview.filesystems_in_group(&group.name)?;
        let (used, capacity) = members
            .iter()
            .fold((0u64, 0u64), |(u, c), fs| (u + fs.used_bytes, c + fs.capacity_bytes));
        out.push(GroupFill {
            group: group.name,
            used,
            capacity,
        });
    }
    Ok(out)
}

/// Average fill across groups whose status is `on` (§4.6 step 2).
pub fn average_fill(fsview: &dyn FsView, space: &str) -> crate::error::Result<f64> {
    let groups = fsview.groups_in_space(space)?;
    let mut total = 0.0;
    let mut count = 0u32;
    for group in &groups {
        if group.status() != fsview::GroupStatus::On {
            continue;
        }
        let members = fsview.filesystems_in_group(&group.name)?;
        let (used, capacity) = members
            .iter()
            .fold((0u64, 0u64), |(u, c), fs| (u + fs.used_bytes, c + fs.capacity_bytes));
        if capacity > 0 {
            total += used as f64 / capacity as f64;
            count += 1;
        }
    }
    Ok(if count == 0 { 0.0 } else { total / count as f64 })
}
