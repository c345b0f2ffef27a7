//! Disk and MGM resync sweeps (§4.4).

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use fid::hex_to_fid;

use crate::error::{FmdError, Result};
use crate::layout::{classify_layout_error, ChecksumKind, LayoutId};
use crate::record::Timestamp;
use crate::store::FmdStore;

/// One raw attribute snapshot for a file found on disk, as read from its
/// extended attributes and `stat()`.
#[derive(Debug, Clone)]
pub struct DiskAttrs {
    pub size: u64,
    pub checksum_raw: Vec<u8>,
    pub checksum_kind: ChecksumKind,
    pub timestamp_us: u64,
    pub filecxerror: bool,
    pub blockcxerror: bool,
}

/// Abstracts the filesystem walk + xattr read so the engine can be tested
/// without a real mount. The production implementation walks `mount_prefix`
/// on disk and reads `user.eos.*` via the `xattr` crate.
pub trait DiskWalk {
    /// Yields `(fid, DiskAttrs)` for every eligible file under the prefix.
    /// A file is eligible when its basename doesn't start with `.`, doesn't
    /// match `*.xsmap`, and parses as a hex fid.
    fn walk(&self, fsid: u32) -> Result<Vec<(u64, DiskAttrs)>>;
}

/// Walks a real directory tree using `std::fs` and the `xattr` crate.
pub struct RealDiskWalk {
    pub mount_prefix: std::path::PathBuf,
}

impl RealDiskWalk {
    pub fn new(mount_prefix: impl Into<std::path::PathBuf>) -> Self {
        RealDiskWalk {
            mount_prefix: mount_prefix.into(),
        }
    }

    fn read_one(path: &Path) -> Result<DiskAttrs> {
        let meta = std::fs::metadata(path)?;
        let checksum_raw = xattr::get(path, "user.eos.checksum")?.unwrap_or_default();
        let checksum_type = xattr::get(path, "user.eos.checksumtype")?
            .map(|v| String::from_utf8_lossy(&v).to_string())
            .unwrap_or_default();
        let timestamp_us = xattr::get(path, "user.eos.timestamp")?
            .and_then(|v| String::from_utf8_lossy(&v).parse::<u64>().ok())
            .unwrap_or(0);
        let filecxerror = xattr::get(path, "user.eos.filecxerror")?
            .map(|v| v == b"1")
            .unwrap_or(false);
        let blockcxerror = xattr::get(path, "user.eos.blockcxerror")?
            .map(|v| v == b"1")
            .unwrap_or(false);
        Ok(DiskAttrs {
            size: meta.len(),
            checksum_raw,
            checksum_kind: parse_checksum_tag(&checksum_type),
            timestamp_us,
            filecxerror,
            blockcxerror,
        })
    }

    fn walk_dir(dir: &Path, out: &mut Vec<(u64, DiskAttrs)>) -> Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') {
                continue;
            }
            if name.ends_with(".xsmap") {
                continue;
            }
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                Self::walk_dir(&path, out)?;
                continue;
            }
            let basename = Path::new(name.as_ref())
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| name.to_string());
            if !basename.chars().all(|c| c.is_ascii_hexdigit()) || basename.is_empty() {
                continue;
            }
            let fid = hex_to_fid(&basename);
            match Self::read_one(&path) {
                Ok(attrs) => out.push((fid, attrs)),
                Err(e) => log::warn!("skipping {}: failed to read xattrs: {e}", path.display()),
            }
        }
        Ok(())
    }
}

impl DiskWalk for RealDiskWalk {
    fn walk(&self, fsid: u32) -> Result<Vec<(u64, DiskAttrs)>> {
        let mut out = Vec::new();
        if self.mount_prefix.exists() {
            Self::walk_dir(&self.mount_prefix, &mut out)?;
        }
        log::debug!(
            "disk walk on fsid {fsid} under {} found {} candidate files",
            self.mount_prefix.display(),
            out.len()
        );
        Ok(out)
    }
}

fn parse_checksum_tag(tag: &str) -> ChecksumKind {
    match tag {
        "adler" | "adler32" => ChecksumKind::Adler32,
        "crc32c" => ChecksumKind::Crc32c,
        "md5" => ChecksumKind::Md5,
        "sha1" => ChecksumKind::Sha1,
        _ => ChecksumKind::None,
    }
}

fn hex_digest(raw: &[u8]) -> String {
    raw.iter().map(|b| format!("{b:02x}")).collect()
}

/// Runs a full disk resync for `fsid`: `reset_disk`, walk, merge, mark
/// syncing for the duration.
pub fn resync_disk(
    store: &FmdStore,
    walker: &dyn DiskWalk,
    fsid: u32,
    flag_layout_error: bool,
) -> Result<usize> {
    store.reset_disk(fsid)?;
    store.set_syncing(fsid, true)?;
    let found = walker.walk(fsid)?;
    let mut merged = 0usize;
    for (fid, attrs) in found {
        let lid = LayoutId::plain(attrs.checksum_kind);
        let mut rec = store.create_if_writable(fid, fsid, 0, 0, lid).or_else(|e| {
            if matches!(e, FmdError::NotWritable(_)) {
                store.get(fid, fsid, true)
            } else {
                Err(e)
            }
        })?;
        rec.disksize = attrs.size;
        rec.diskchecksum = hex_digest(&attrs.checksum_raw);
        rec.size = attrs.size;
        rec.checksum = rec.diskchecksum.clone();
        rec.checktime = Timestamp {
            sec: attrs.timestamp_us / 1_000_000,
            ns: ((attrs.timestamp_us % 1_000_000) * 1_000) as u32,
        };
        rec.filecxerror = attrs.filecxerror;
        rec.blockcxerror = attrs.blockcxerror;
        if flag_layout_error {
            rec.layouterror |= crate::layout::layout_error::ORPHAN;
        }
        store.put(fid, fsid, &rec)?;
        merged += 1;
    }
    store.set_syncing(fsid, false)?;
    log::info!("disk resync of fsid {fsid} merged {merged} records");
    Ok(merged)
}

/// One line of the `dumpmd` stream, already parsed out of its env encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MgmFileRecord {
    pub id: u64,
    pub cid: u64,
    pub ctime: Timestamp,
    pub mtime: Timestamp,
    pub size: u64,
    pub checksum: String,
    pub lid: LayoutId,
    pub uid: u32,
    pub gid: u32,
    pub location: String,
}

/// Abstracts the opaque MGM query protocol (`pcmd=dumpmd`/`getfmd`). Real
/// requests and replies are env-encoded strings on the wire; implementors
/// parse/format at the edge and hand typed values inward.
pub trait MgmQuery {
    /// Streams every record the MGM believes lives on `fsid`.
    fn dumpmd(&self, fsid: u32) -> Result<Vec<MgmFileRecord>>;

    /// Looks up a single fid. `Ok(None)` means the MGM replied "not found".
    fn getfmd(&self, fid: u64) -> Result<Option<MgmFileRecord>>;
}

/// Runs a full MGM resync for `fsid`: `reset_mgm`, query, merge, re-derive
/// `layouterror`.
pub fn resync_mgm(store: &FmdStore, mgm: &dyn MgmQuery, fsid: u32) -> Result<usize> {
    store.reset_mgm(fsid)?;
    store.set_syncing(fsid, true)?;
    let records = mgm.dumpmd(fsid)?;
    let mut merged = 0usize;
    for r in records {
        let mut rec = store.create_if_writable(r.id, fsid, r.uid, r.gid, r.lid)?;
        rec.cid = r.cid;
        rec.ctime = r.ctime;
        rec.mtime = r.mtime;
        rec.mgmsize = r.size;
        rec.mgmchecksum = r.checksum.clone();
        rec.lid = r.lid;
        rec.locations = r.location.clone();
        rec.layouterror = classify_layout_error(fsid, r.lid, &r.location);
        store.put(r.id, fsid, &rec)?;
        merged += 1;
    }
    store.set_syncing(fsid, false)?;
    log::info!("MGM resync of fsid {fsid} merged {merged} records");
    Ok(merged)
}

/// Single-fid MGM resync (`ResyncMgm`). A "not found" reply propagates as
/// [`FmdError::NoData`] and only the local `layouterror` is updated.
/// Transient transport errors retry once after a 1-second back-off.
pub fn resync_mgm_one(store: &FmdStore, mgm: &dyn MgmQuery, fsid: u32, fid: u64) -> Result<()> {
    let reply = match mgm.getfmd(fid) {
        Ok(r) => r,
        Err(FmdError::Transport(_)) => {
            std::thread::sleep(Duration::from_secs(1));
            mgm.getfmd(fid)?
        }
        Err(e) => return Err(e),
    };
    let Some(r) = reply else {
        let mut rec = store.get(fid, fsid, true)?;
        rec.layouterror = classify_layout_error(fsid, LayoutId::ZERO, "");
        store.put(fid, fsid, &rec)?;
        return Err(FmdError::NoData(format!("fid {fid:#x} not found on MGM")));
    };
    let mut rec = store.create_if_writable(fid, fsid, r.uid, r.gid, r.lid)?;
    rec.cid = r.cid;
    rec.ctime = r.ctime;
    rec.mtime = r.mtime;
    rec.mgmsize = r.size;
    rec.mgmchecksum = r.checksum.clone();
    rec.lid = r.lid;
    rec.locations = r.location.clone();
    rec.layouterror = classify_layout_error(fsid, r.lid, &r.location);
    store.put(fid, fsid, &rec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn open_store() -> (tempfile::TempDir, FmdStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FmdStore::open_db(dir.path()).unwrap();
        store.open(1, true).unwrap();
        (dir, store)
    }

    struct FakeDiskWalk(Vec<(u64, DiskAttrs)>);

    impl DiskWalk for FakeDiskWalk {
        fn walk(&self, _fsid: u32) -> Result<Vec<(u64, DiskAttrs)>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn disk_resync_merges_found_files_and_clears_syncing() {
        let (_dir, store) = open_store();
        let walker = FakeDiskWalk(vec![(
            0xdeadbeef,
            DiskAttrs {
                size: 4096,
                checksum_raw: vec![0xab, 0xcd],
                checksum_kind: ChecksumKind::Adler32,
                timestamp_us: 2_000_000,
                filecxerror: false,
                blockcxerror: false,
            },
        )]);

        let n = resync_disk(&store, &walker, 1, true).unwrap();
        assert_eq!(n, 1);
        assert!(!store.is_syncing(1).unwrap());

        let rec = store.get(0xdeadbeef, 1, true).unwrap();
        assert_eq!(rec.disksize, 4096);
        assert_eq!(rec.diskchecksum, "abcd");
        assert_eq!(rec.checktime.sec, 2);
        assert_eq!(
            rec.layouterror & crate::layout::layout_error::ORPHAN,
            crate::layout::layout_error::ORPHAN
        );
    }

    #[derive(Default)]
    struct FakeMgmQuery {
        dump: Vec<MgmFileRecord>,
        single: Mutex<HashMap<u64, Option<MgmFileRecord>>>,
    }

    impl MgmQuery for FakeMgmQuery {
        fn dumpmd(&self, _fsid: u32) -> Result<Vec<MgmFileRecord>> {
            Ok(self.dump.clone())
        }

        fn getfmd(&self, fid: u64) -> Result<Option<MgmFileRecord>> {
            Ok(self.single.lock().unwrap().get(&fid).cloned().flatten())
        }
    }

    #[test]
    fn mgm_resync_merges_and_flags_replica_wrong() {
        let (_dir, store) = open_store();
        let lid = LayoutId::replica(2, ChecksumKind::Adler32);
        let mgm = FakeMgmQuery {
            dump: vec![MgmFileRecord {
                id: 42,
                cid: 1,
                ctime: Timestamp::now(),
                mtime: Timestamp::now(),
                size: 10,
                checksum: "aa".into(),
                lid,
                uid: 0,
                gid: 0,
                location: "1".into(),
            }],
            ..Default::default()
        };

        let n = resync_mgm(&store, &mgm, 1).unwrap();
        assert_eq!(n, 1);
        let rec = store.get(42, 1, true).unwrap();
        assert_eq!(
            rec.layouterror & crate::layout::layout_error::REPLICA_WRONG,
            crate::layout::layout_error::REPLICA_WRONG
        );
    }

    #[test]
    fn single_fid_not_found_sets_orphan_and_returns_nodata() {
        let (_dir, store) = open_store();
        let lid = LayoutId::plain(ChecksumKind::Adler32);
        store.create_if_writable(7, 1, 0, 0, lid).unwrap();
        let mgm = FakeMgmQuery::default();

        let err = resync_mgm_one(&store, &mgm, 1, 7).unwrap_err();
        assert!(matches!(err, FmdError::NoData(_)));
        let rec = store.get(7, 1, true).unwrap();
        assert_eq!(
            rec.layouterror & crate::layout::layout_error::ORPHAN,
            crate::layout::layout_error::ORPHAN
        );
    }
}
