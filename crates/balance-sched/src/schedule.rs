//! The pull endpoint: one balance job per call (§4.7).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use fmd::LayoutKind;
use fsck::Tracker;
use fsview::{ConfigStatus, FileSystem, FsView};
use symkey::{Env, SymKeyStore};

use crate::auth::AuthCheck;
use crate::error::{Result, SchedError};
use crate::namespace::NamespaceSource;

pub struct SchedulerConfig {
    pub mgm_manager: String,
    pub capability_validity: Duration,
    pub min_source_fill: f64,
    pub tracker_ttl: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferJob {
    pub fid: u64,
    pub source_url: String,
    pub target_url: String,
}

pub struct BalanceScheduler {
    cfg: SchedulerConfig,
    symkeys: SymKeyStore,
    tracker: Tracker<u64>,
    rr_cursor: Mutex<HashMap<String, usize>>,
}

impl BalanceScheduler {
    pub fn new(cfg: SchedulerConfig, symkeys: SymKeyStore) -> Self {
        let tracker = Tracker::new(cfg.tracker_ttl);
        BalanceScheduler {
            cfg,
            symkeys,
            tracker,
            rr_cursor: Mutex::new(HashMap::new()),
        }
    }

    /// `schedule2balance`. Returns `Ok(None)` on any cold path — no source
    /// fit, fs-view cache cold, file tracker full (§4.7, final paragraph).
    pub fn schedule2balance(
        &self,
        target_fsid: u32,
        freebytes: u64,
        auth_token: &str,
        auth: &dyn AuthCheck,
        fsview: &dyn FsView,
        ns: &dyn NamespaceSource,
    ) -> Result<Option<TransferJob>> {
        if !auth.validate(auth_token) {
            return Err(SchedError::Unauthorized);
        }

        let Ok(target) = fsview.snapshot(target_fsid) else {
            return Ok(None);
        };
        let Ok(members) = fsview.filesystems_in_group(&target.schedgroup) else {
            return Ok(None);
        };

        let Some(src) = self.pick_source(&target.schedgroup, &members) else {
            return Ok(None);
        };

        let num_files = ns.num_files_on_fs(src.id).min(64);
        let mut chosen = None;
        for _ in 0..num_files.max(1) {
            let Some(fid) = ns.approximately_random_fid_on_fs(src.id) else {
                continue;
            };
            let Some(rec) = ns.file_record(fid) else {
                continue;
            };
            if fmd::parse_locations(&rec.locations)
                .iter()
                .any(|l| l.fsid == target_fsid)
            {
                continue;
            }
            if self.tracker.is_tracked(&fid) {
                continue;
            }
            if rec.size == 0 || rec.size > freebytes {
                continue;
            }
            chosen = Some((fid, rec));
            break;
        }
        let Some((fid, rec)) = chosen else {
            return Ok(None);
        };

        let transfer_lid = match rec.lid.kind() {
            Some(LayoutKind::Replica) => rec.lid.with_block_checksum_none(),
            Some(LayoutKind::Erasure) => rec.lid.with_checksums_none(),
            _ => rec.lid,
        };

        let mut source_env = Env::new();
        source_env.set("access", "read");
        source_env.set("fid", fid.to_string());
        source_env.set("cid", rec.cid.to_string());
        source_env.set("lid", format!("{:08x}", transfer_lid.0));
        source_env.set("drainfsid", src.id.to_string());
        source_env.set("localprefix", src.path.clone());
        source_env.set("fsid", src.id.to_string());
        source_env.set("sourcehostport", src.hostport());
        source_env.set("path", fid::fid_prefix2fullpath(&fid::fid_to_hex(fid), &src.path, 0));
        source_env.set("sec", "sss");
        source_env.set("mgm.manager", self.cfg.mgm_manager.clone());

        let mut target_env = source_env.clone();
        target_env.set("access", "write");
        target_env.set("targethostport", target.hostport());
        target_env.set("bookingsize", rec.size.to_string());
        target_env.set("source.lid", format!("{:08x}", rec.lid.0));
        target_env.set("source.ruid", rec.uid.to_string());
        target_env.set("source.rgid", rec.gid.to_string());

        let sealed_source = self.symkeys.create_capability(&source_env, self.cfg.capability_validity)?;
        let sealed_target = self.symkeys.create_capability(&target_env, self.cfg.capability_validity)?;

        let source_url = format!(
            "root://{}//replicate:{fid:016x}?{}",
            src.hostport(),
            sealed_source
        );
        let target_url = format!(
            "root://{}//replicate:{fid:016x}?{}",
            target.hostport(),
            sealed_target
        );

        self.tracker.try_track(fid, ());
        log::info!("scheduled balance of fid {fid:#x} from fs {} to fs {target_fsid}", src.id);

        Ok(Some(TransferJob {
            fid,
            source_url,
            target_url,
        }))
    }

    /// Round-robin source selection, one cursor per group, held by this
    /// scheduler instance (never process-global — §9 open question,
    /// resolved the same way as the drainer's analogous cursor).
    fn pick_source(&self, group: &str, members: &[FileSystem]) -> Option<FileSystem> {
        if members.is_empty() {
            return None;
        }
        let mut cursor = self.rr_cursor.lock().expect("rr cursor lock poisoned");
        let start = *cursor.get(group).unwrap_or(&0);
        for offset in 0..members.len() {
            let idx = (start + offset) % members.len();
            let fs = &members[idx];
            if self.is_eligible_source(fs) {
                cursor.insert(group.to_string(), (idx + 1) % members.len());
                return Some(fs.clone());
            }
        }
        None
    }

    fn is_eligible_source(&self, fs: &FileSystem) -> bool {
        fs.is_online()
            && fs.is_rw()
            && fs.configstatus != ConfigStatus::DrainDead
            && fs.fill_ratio() >= self.cfg.min_source_fill
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmd::{ChecksumKind, FileRecord, LayoutId};
    use fsview::{BootStatus, MemFsView, Space};
    use symkey::KeyInput;

    fn fs(id: u32, group: &str, fill: f64) -> FileSystem {
        let mut fs = FileSystem::new(id, format!("uuid-{id}"), format!("host-{id}"), 1095);
        fs.schedgroup = group.into();
        fs.configstatus = ConfigStatus::Rw;
        fs.active = true;
        fs.boot = BootStatus::Booted;
        fs.capacity_bytes = 100;
        fs.used_bytes = (fill * 100.0) as u64;
        fs.path = format!("/data/{id:02}");
        fs
    }

    struct FakeNs {
        files: Vec<u64>,
        record: FileRecord,
    }

    impl NamespaceSource for FakeNs {
        fn num_files_on_fs(&self, _fsid: u32) -> u64 {
            self.files.len() as u64
        }

        fn approximately_random_fid_on_fs(&self, _fsid: u32) -> Option<u64> {
            self.files.first().copied()
        }

        fn file_record(&self, fid: u64) -> Option<FileRecord> {
            if fid == self.record.fid {
                Some(self.record.clone())
            } else {
                None
            }
        }
    }

    fn scheduler() -> BalanceScheduler {
        let symkeys = SymKeyStore::new();
        symkeys.set_key(KeyInput::Raw(&[7u8; 20]), 0).unwrap();
        BalanceScheduler::new(
            SchedulerConfig {
                mgm_manager: "mgm.example".into(),
                capability_validity: Duration::from_secs(300),
                min_source_fill: 0.0,
                tracker_ttl: Duration::from_secs(600),
            },
            symkeys,
        )
    }

    #[test]
    fn scenario_s4_second_call_suppressed_by_tracker() {
        let view = MemFsView::new();
        view.register_space(Space { groupsize: 2, groupmod: 1, ..Space::new("g") }).unwrap();
        view.register(fs(1, "g.0", 0.5)).unwrap();
        view.register(fs(2, "g.0", 0.5)).unwrap();

        let mut rec = FileRecord::new(42, 1, 0, 0, LayoutId::plain(ChecksumKind::Adler32));
        rec.size = 5 * 1024 * 1024;
        let ns = FakeNs {
            files: vec![42],
            record: rec,
        };
        let sched = scheduler();

        let first = sched
            .schedule2balance(2, 10 * 1024 * 1024, "tok", &crate::auth::AllowAll, &view, &ns)
            .unwrap();
        assert!(first.is_some());

        let second = sched
            .schedule2balance(2, 10 * 1024 * 1024, "tok", &crate::auth::AllowAll, &view, &ns)
            .unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn rejects_unauthorized_caller() {
        let view = MemFsView::new();
        let ns = FakeNs {
            files: vec![],
            record: FileRecord::new(1, 1, 0, 0, LayoutId::plain(ChecksumKind::Adler32)),
        };
        let sched = scheduler();
        let err = sched
            .schedule2balance(1, 1024, "", &crate::auth::AllowAll, &view, &ns)
            .unwrap_err();
        assert!(matches!(err, SchedError::Unauthorized));
    }

    #[test]
    fn cold_path_returns_none_for_unknown_target() {
        let view = MemFsView::new();
        let ns = FakeNs {
            files: vec![],
            record: FileRecord::new(1, 1, 0, 0, LayoutId::plain(ChecksumKind::Adler32)),
        };
        let sched = scheduler();
        let result = sched
            .schedule2balance(999, 1024, "tok", &crate::auth::AllowAll, &view, &ns)
            .unwrap();
        assert!(result.is_none());
    }
}
