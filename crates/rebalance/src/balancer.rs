//! Group balancer (§4.6 "Group balancer").

use std::collections::HashSet;

use fsview::FsView;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::conversion::ConversionJob;
use crate::error::{RebalanceError, Result};
use crate::fill::snapshot_group_fills;
use crate::namespace::NamespaceSource;

pub struct BalancerConfig {
    pub space: String,
    pub threshold: f64,
    pub ntx: usize,
    pub converter_on: bool,
    pub is_master: bool,
}

/// One balancer cycle: levels fill across groups in `cfg.space` by moving
/// up to `cfg.ntx` files from over-filled groups to under-filled ones.
/// `already_scheduled` rejects fids the converter or an earlier cycle is
/// already moving; `rng` drives the uniform over/under group picks.
pub fn run_once(
    cfg: &BalancerConfig,
    fsview: &dyn FsView,
    ns: &dyn NamespaceSource,
    already_scheduled: &mut HashSet<u64>,
    rng: &mut impl Rng,
) -> Result<Vec<ConversionJob>> {
    if !cfg.converter_on {
        return Err(RebalanceError::ConverterOff);
    }
    if !cfg.is_master {
        return Err(RebalanceError::NotMaster);
    }

    let fills = snapshot_group_fills(fsview, &cfg.space)?;
    if fills.is_empty() {
        return Ok(Vec::new());
    }
    let on_fills: Vec<&crate::fill::GroupFill> = fills
        .iter()
        .filter(|f| {
            fsview
                .group(&f.group)
                .map(|g| g.status() == fsview::GroupStatus::On)
                .unwrap_or(false)
        })
        .collect();
    if on_fills.is_empty() {
        return Ok(Vec::new());
    }
    let avg = on_fills.iter().map(|f| f.ratio()).sum::<f64>() / on_fills.len() as f64;

    let over: Vec<&str> = on_fills
        .iter()
        .filter(|f| f.ratio() > avg + cfg.threshold)
        .map(|f| f.group.as_str())
        .collect();
    let under: Vec<&str> = on_fills
        .iter()
        .filter(|f| f.ratio() < avg - cfg.threshold)
        .map(|f| f.group.as_str())
        .collect();

    if over.is_empty() || under.is_empty() {
        return Ok(Vec::new());
    }

    let mut jobs = Vec::new();
    while jobs.len() < cfg.ntx {
        let Some(&src_group) = over.choose(rng) else {
            break;
        };
        let Some(&dst_group) = under.choose(rng) else {
            break;
        };

        let Some((fsid, fid)) =
            pick_file_in_group(fsview, ns, src_group, already_scheduled)?
        else {
            break;
        };

        let lid = ns.layout_of(fid);
        already_scheduled.insert(fid);
        log::info!("rebalance: moving fid {fid:#x} from fs {fsid} (group {src_group}) to group {dst_group}");
        jobs.push(ConversionJob {
            fid,
            target_group: dst_group.to_string(),
            lid,
            reason: None,
        });
    }
    Ok(jobs)
}

/// Picks one fs in `group` (bounded attempts, skipping non-online members),
/// then one file on it via `approximately_random_fid_on_fs`, rejecting fids
/// already scheduled (§4.6 step 4).
fn pick_file_in_group(
    fsview: &dyn FsView,
    ns: &dyn NamespaceSource,
    group: &str,
    already_scheduled: &HashSet<u64>,
) -> Result<Option<(u32, u64)>> {
    let members = fsview.filesystems_in_group(group)?;
    for fs in members.iter().filter(|fs| fs.is_online()) {
        let attempts = ns.num_files_on_fs(fs.id).min(64) as usize;
        for _ in 0..attempts.max(1) {
            let Some(fid) = ns.approximately_random_fid_on_fs(fs.id) else {
                continue;
            };
            if !already_scheduled.contains(&fid) {
                return Ok(Some((fs.id, fid)));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmd::{ChecksumKind, LayoutId};
    use fsview::{BootStatus, ConfigStatus, FileSystem, GroupStatus, MemFsView, Space};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn make_fs(id: u32, group: &str, used: u64, capacity: u64) -> FileSystem {
        let mut fs = FileSystem::new(id, format!("uuid-{id}"), format!("host-{id}"), 1095);
        fs.schedgroup = group.into();
        fs.configstatus = ConfigStatus::Rw;
        fs.active = true;
        fs.boot = BootStatus::Booted;
        fs.used_bytes = used;
        fs.capacity_bytes = capacity;
        fs
    }

    struct FakeNs {
        files: Mutex<HashMap<u32, Vec<u64>>>,
    }

    impl NamespaceSource for FakeNs {
        fn num_files_on_fs(&self, fsid: u32) -> u64 {
            self.files.lock().unwrap().get(&fsid).map(|v| v.len() as u64).unwrap_or(0)
        }

        fn approximately_random_fid_on_fs(&self, fsid: u32) -> Option<u64> {
            self.files.lock().unwrap().get(&fsid).and_then(|v| v.first().copied())
        }

        fn layout_of(&self, _fid: u64) -> LayoutId {
            LayoutId::plain(ChecksumKind::Adler32)
        }

        fn drain_page(&self, _fsid: u32, _max: usize) -> Vec<u64> {
            Vec::new()
        }
    }

    #[test]
    fn scenario_s3_picks_the_only_over_under_pair() {
        let view = MemFsView::new();
        view.register_space(Space {
            groupsize: 1,
            groupmod: 4,
            converter: true,
            ..Space::new("g")
        })
        .unwrap();
        view.register(make_fs(0, "g.0", 10, 100)).unwrap();
        view.register(make_fs(1, "g.1", 30, 100)).unwrap();
        view.register(make_fs(2, "g.2", 50, 100)).unwrap();
        view.register(make_fs(3, "g.3", 90, 100)).unwrap();

        let ns = FakeNs {
            files: Mutex::new(HashMap::from([(3, vec![42])])),
        };
        let cfg = BalancerConfig {
            space: "g".into(),
            threshold: 0.2,
            ntx: 1,
            converter_on: true,
            is_master: true,
        };
        let mut scheduled = HashSet::new();
        let mut rng = StdRng::seed_from_u64(1);
        let jobs = run_once(&cfg, &view, &ns, &mut scheduled, &mut rng).unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].fid, 42);
        assert_eq!(jobs[0].target_group, "g.0");
    }

    #[test]
    fn rejects_when_converter_is_off() {
        let view = MemFsView::new();
        let ns = FakeNs { files: Mutex::new(HashMap::new()) };
        let cfg = BalancerConfig {
            space: "g".into(),
            threshold: 0.2,
            ntx: 1,
            converter_on: false,
            is_master: true,
        };
        let mut scheduled = HashSet::new();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            run_once(&cfg, &view, &ns, &mut scheduled, &mut rng),
            Err(RebalanceError::ConverterOff)
        ));
    }
}
