//! Error-map merging and the `show_offline` cross-check (§4.5).

use std::collections::{HashMap, HashSet};

use fmd::LayoutKind;
use fsview::ConfigStatus;

use crate::namespace::NamespaceView;

/// `err_tag → fsid → fid set`, merged from broadcast replies of the form
/// `err_tag=<fsid>:<fid1>,<fid2>,...`.
pub type ErrorMap = HashMap<String, HashMap<u32, HashSet<u64>>>;

/// Parses one reply line into `(err_tag, fsid, fids)`; malformed lines are
/// skipped (broadcast is best-effort, §7 transport errors are non-fatal).
pub fn parse_reply_line(line: &str) -> Option<(String, u32, Vec<u64>)> {
    let (tag, rest) = line.split_once('=')?;
    let (fsid_str, fids_str) = rest.split_once(':')?;
    let fsid: u32 = fsid_str.trim().parse().ok()?;
    let fids: Vec<u64> = fids_str
        .split(',')
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.trim().parse::<u64>().ok())
        .collect();
    Some((tag.trim().to_string(), fsid, fids))
}

/// Merges one reply line into `map`. Each (err_tag, fsid, fid) ends up
/// present in the map exactly once even across repeated/duplicate lines
/// (§8 property 7).
pub fn merge_reply(map: &mut ErrorMap, line: &str) {
    let Some((tag, fsid, fids)) = parse_reply_line(line) else {
        log::warn!("dropping malformed fsck reply line: {line:?}");
        return;
    };
    let by_fsid = map.entry(tag).or_default();
    let set = by_fsid.entry(fsid).or_default();
    set.extend(fids);
}

pub fn flatten_class(map: &ErrorMap, tag: &str) -> HashSet<u64> {
    map.get(tag)
        .map(|by_fsid| by_fsid.values().flatten().copied().collect())
        .unwrap_or_default()
}

/// One collector cycle's full output (§4.5, §8 S2).
#[derive(Debug, Default, Clone)]
pub struct FsckReport {
    pub broadcast: ErrorMap,
    pub rep_offline: HashSet<u64>,
    pub file_offline: HashSet<u64>,
    pub adjust_replica: HashSet<u64>,
    pub zero_replica: HashSet<u64>,
}

/// A filesystem counts as healthy for `show_offline` purposes when it is
/// booted, online, and its config status is at least `drain` (i.e. not
/// `empty`/`off` — a disk the operator has fully retired from service).
pub fn is_fs_healthy(fs: &fsview::FileSystem) -> bool {
    fs.is_online() && !matches!(fs.configstatus, ConfigStatus::Empty | ConfigStatus::Off)
}

/// Derives the offline-fsid set `show_offline` needs from an explicit list
/// of filesystems (§4.8's `FsView` has no "list every fsid" op, so callers
/// gather this from whatever space/group enumeration they already drive).
pub fn offline_fsids_from<'a>(filesystems: impl IntoIterator<Item = &'a fsview::FileSystem>) -> HashSet<u32> {
    filesystems
        .into_iter()
        .filter(|fs| !is_fs_healthy(fs))
        .map(|fs| fs.id)
        .collect()
}

/// Runs one collection cycle: merges the broadcast replies, then (if
/// `show_offline`) cross-checks offline placement and zero-replica files
/// against `offline_fsids`.
pub fn run_cycle(
    replies: &[String],
    show_offline: bool,
    offline_fsids: &HashSet<u32>,
    ns: &dyn NamespaceView,
) -> FsckReport {
    let mut broadcast = ErrorMap::new();
    for line in replies {
        merge_reply(&mut broadcast, line);
    }
    let mut report = FsckReport {
        broadcast,
        ..Default::default()
    };
    if !show_offline {
        return report;
    }

    for &fsid in offline_fsids {
        for fid in ns.fids_on_fs(fsid) {
            report.rep_offline.insert(fid);
        }
    }

    let rep_diff = flatten_class(&report.broadcast, "rep_diff_n");
    let candidates: HashSet<u64> = report.rep_offline.union(&rep_diff).copied().collect();

    for fid in candidates {
        let locations = ns.fsids_of(fid);
        if locations.is_empty() {
            continue;
        }
        let offline_count = locations
            .iter()
            .filter(|fsid| offline_fsids.contains(fsid))
            .count();
        if offline_count == 0 {
            continue;
        }
        let lid = ns.layout_of(fid);
        let all_offline = match lid.kind() {
            Some(LayoutKind::Erasure) => offline_count > lid.parity_stripe_count() as usize,
            _ => offline_count == locations.len(),
        };
        if all_offline {
            report.file_offline.insert(fid);
        } else {
            report.adjust_replica.insert(fid);
        }
    }

    report.zero_replica = ns.zero_replica_fids().into_iter().collect();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmd::{ChecksumKind, LayoutId};
    use std::collections::HashMap as StdHashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeNamespace {
        fids_on_fs: StdHashMap<u32, Vec<u64>>,
        fsids_of: StdHashMap<u64, Vec<u32>>,
        layouts: StdHashMap<u64, LayoutId>,
        zero_replica: Mutex<Vec<u64>>,
    }

    impl NamespaceView for FakeNamespace {
        fn fids_on_fs(&self, fsid: u32) -> Vec<u64> {
            self.fids_on_fs.get(&fsid).cloned().unwrap_or_default()
        }

        fn fsids_of(&self, fid: u64) -> Vec<u32> {
            self.fsids_of.get(&fid).cloned().unwrap_or_default()
        }

        fn layout_of(&self, fid: u64) -> LayoutId {
            self.layouts
                .get(&fid)
                .copied()
                .unwrap_or(LayoutId::plain(ChecksumKind::None))
        }

        fn zero_replica_fids(&self) -> Vec<u64> {
            self.zero_replica.lock().unwrap().clone()
        }

        fn fid_to_lfn(&self, fid: u64) -> Option<String> {
            Some(format!("/eos/file-{fid:x}"))
        }
    }

    #[test]
    fn merge_deduplicates_repeated_lines() {
        let mut map = ErrorMap::new();
        merge_reply(&mut map, "d_cx_diff=3:10,11");
        merge_reply(&mut map, "d_cx_diff=3:11,12");
        let set = &map["d_cx_diff"][&3];
        assert_eq!(set.len(), 3);
        assert!(set.contains(&10) && set.contains(&11) && set.contains(&12));
    }

    #[test]
    fn malformed_line_is_dropped_not_fatal() {
        let mut map = ErrorMap::new();
        merge_reply(&mut map, "garbage line with no structure");
        assert!(map.is_empty());
    }

    #[test]
    fn scenario_s2_three_replicas_two_offline() {
        // replica-3 layout, fid 99 lives on fsids {1,2,3}; 1 and 2 offline.
        let mut ns = FakeNamespace::default();
        ns.fsids_of.insert(99, vec![1, 2, 3]);
        ns.layouts
            .insert(99, LayoutId::replica(3, ChecksumKind::Adler32));
        ns.fids_on_fs.insert(1, vec![99]);
        ns.fids_on_fs.insert(2, vec![99]);

        let offline: HashSet<u32> = [1, 2].into_iter().collect();
        let report = run_cycle(&[], true, &offline, &ns);

        assert!(report.rep_offline.contains(&99));
        assert!(report.adjust_replica.contains(&99));
        assert!(!report.file_offline.contains(&99));
    }

    #[test]
    fn scenario_s2_all_replicas_offline_is_file_offline() {
        let mut ns = FakeNamespace::default();
        ns.fsids_of.insert(99, vec![1, 2, 3]);
        ns.layouts
            .insert(99, LayoutId::replica(3, ChecksumKind::Adler32));
        ns.fids_on_fs.insert(1, vec![99]);
        ns.fids_on_fs.insert(2, vec![99]);
        ns.fids_on_fs.insert(3, vec![99]);

        let offline: HashSet<u32> = [1, 2, 3].into_iter().collect();
        let report = run_cycle(&[], true, &offline, &ns);
        assert!(report.file_offline.contains(&99));
    }

    #[test]
    fn erasure_all_offline_uses_parity_stripe_threshold() {
        let mut ns = FakeNamespace::default();
        // 4 data + 2 parity = 6 stripes; parity_stripe_count = 2.
        ns.fsids_of.insert(5, vec![1, 2, 3, 4, 5, 6]);
        ns.layouts
            .insert(5, LayoutId::erasure(4, 2, ChecksumKind::Crc32c));
        ns.fids_on_fs.insert(1, vec![5]);
        ns.fids_on_fs.insert(2, vec![5]);

        // Only 2 offline (== parity count, not >): should be adjust, not file_offline.
        let offline: HashSet<u32> = [1, 2].into_iter().collect();
        let report = run_cycle(&[], true, &offline, &ns);
        assert!(report.adjust_replica.contains(&5));
        assert!(!report.file_offline.contains(&5));
    }

    #[test]
    fn zero_replica_is_collected_from_namespace_iterator() {
        let ns = FakeNamespace::default();
        *ns.zero_replica.lock().unwrap() = vec![7, 8];
        let offline = HashSet::new();
        let report = run_cycle(&[], true, &offline, &ns);
        assert_eq!(report.zero_replica, [7, 8].into_iter().collect());
    }
}
