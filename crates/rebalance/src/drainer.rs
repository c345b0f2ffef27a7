//! Group drainer (§4.6 "Group drainer"), sharing the balancer's machinery.

use fsview::{FileSystem, FsView, GroupStatus};

use crate::conversion::ConversionJob;
use crate::error::Result;
use crate::namespace::NamespaceSource;

pub struct DrainerConfig {
    pub space: String,
    pub converter_on: bool,
    pub is_master: bool,
    /// `FID_CACHE_LIST_SZ`: how many fids the streaming iterator yields per page.
    pub page_size: usize,
}

/// Drains every eligible fs in `cfg.space` whose group status is `on` or
/// `drain`: enumerates its files in capped pages, emits one conversion job
/// per file, and marks the fs `empty`/`drained` once its file list runs dry.
pub fn run_once(
    cfg: &DrainerConfig,
    fsview: &dyn FsView,
    ns: &dyn NamespaceSource,
) -> Result<Vec<ConversionJob>> {
    if !cfg.converter_on || !cfg.is_master {
        return Ok(Vec::new());
    }

    let groups = fsview.groups_in_space(&cfg.space)?;
    let mut jobs = Vec::new();

    for group in groups
        .iter()
        .filter(|g| matches!(g.status(), GroupStatus::On | GroupStatus::Drain))
    {
        let members = fsview.filesystems_in_group(&group.name)?;
        for fs in members.iter().filter(|fs| fs.is_online() && fs.is_no_drain()) {
            let page = ns.drain_page(fs.id, cfg.page_size);
            if page.is_empty() {
                mark_drained(fsview, fs)?;
                continue;
            }
            let Some(target_group) = pick_drain_target_group(fsview, &cfg.space, &group.name)?
            else {
                continue;
            };
            for fid in page {
                let lid = ns.layout_of(fid);
                jobs.push(ConversionJob {
                    fid,
                    target_group: target_group.clone(),
                    lid,
                    reason: Some("groupdrainer".to_string()),
                });
            }
        }
    }
    Ok(jobs)
}

fn mark_drained(fsview: &dyn FsView, fs: &FileSystem) -> Result<()> {
    let mut updated = fs.clone();
    updated.configstatus = fsview::ConfigStatus::Empty;
    fsview.store_fs_config(updated)?;
    log::info!("fsid {} drained: configstatus=empty, drain.status=drained", fs.id);
    Ok(())
}

/// Destination-group tie-break (§4.6): prefer an entirely empty group
/// (permitted by `groupmod` but not yet populated); otherwise the group
/// with the fewest filesystems. Groups already at `groupsize` are skipped.
fn pick_drain_target_group(
    fsview: &dyn FsView,
    space_name: &str,
    exclude_group: &str,
) -> Result<Option<String>> {
    let space = fsview.space(space_name)?;
    let groups = fsview.groups_in_space(space_name)?;

    let mut candidates: Vec<_> = (0..space.groupmod.max(1))
        .map(|n| format!("{space_name}.{n}"))
        .filter(|name| name != exclude_group)
        .collect();

    candidates.sort_by_key(|name| {
        groups
            .iter()
            .find(|g| &g.name == name)
            .map(|g| g.size())
            .unwrap_or(0)
    });

    for name in candidates {
        let size = groups
            .iter()
            .find(|g| &g.name == &name)
            .map(|g| g.size())
            .unwrap_or(0);
        if size < space.groupsize {
            return Ok(Some(name));
        }
    }
    Ok(None)
}
