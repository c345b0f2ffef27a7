use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::{FmdError, Result};
use crate::layout::layout_error;
use crate::record::{FileRecord, UNDEF_SIZE};

const OPEN_MARKER_KEY: &[u8] = b"__fmd_open_marker__";

/// Per-class count and fid set, as returned by
/// [`FmdStore::get_inconsistency_statistics`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClassStat {
    pub fids: BTreeSet<u64>,
}

impl ClassStat {
    pub fn count(&self) -> u64 {
        self.fids.len() as u64
    }
}

/// Counters plus fid sets for each inconsistency class (§4.4).
#[derive(Debug, Default, Clone)]
pub struct InconsistencyStats {
    pub mem_n: ClassStat,
    pub d_sync_n: ClassStat,
    pub m_sync_n: ClassStat,
    pub d_mem_sz_diff: ClassStat,
    pub m_mem_sz_diff: ClassStat,
    pub d_cx_diff: ClassStat,
    pub m_cx_diff: ClassStat,
    pub orphans_n: ClassStat,
    pub unreg_n: ClassStat,
    pub rep_diff_n: ClassStat,
}

struct FsidTable {
    tree: sled::Tree,
    /// Serializes writers; readers need no lock since `sled::Tree` is
    /// already internally safe for concurrent reads.
    write_lock: RwLock<()>,
    dirty: AtomicBool,
    syncing: AtomicBool,
    writable: AtomicBool,
}

/// Durable per-FST key-value store of [`FileRecord`]s, one logical table per
/// fsid. Replaces the spec's two-level outer/inner RW scheme with a sharded
/// map where each fsid entry owns its own lock (§9 design notes): readers
/// never need to take two locks, only the outer map lookup.
pub struct FmdStore {
    db: sled::Db,
    tables: RwLock<HashMap<u32, Arc<FsidTable>>>,
}

impl FmdStore {
    pub fn open_db(path: &Path) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(FmdStore {
            db,
            tables: RwLock::new(HashMap::new()),
        })
    }

    fn table(&self, fsid: u32) -> Result<Arc<FsidTable>> {
        self.tables
            .read()
            .expect("fmd tables lock poisoned")
            .get(&fsid)
            .cloned()
            .ok_or(FmdError::NotOpen(fsid))
    }

    /// Attaches `fsid`'s table. Sets the dirty flag iff a prior `open()`
    /// never reached a matching `close()` (crash recovery signal).
    pub fn open(&self, fsid: u32, writable: bool) -> Result<bool> {
        let tree = self.db.open_tree(fsid_tree_name(fsid))?;
        let was_dirty = tree.contains_key(OPEN_MARKER_KEY)?;
        tree.insert(OPEN_MARKER_KEY, &[1u8])?;
        let table = Arc::new(FsidTable {
            tree,
            write_lock: RwLock::new(()),
            dirty: AtomicBool::new(was_dirty),
            syncing: AtomicBool::new(false),
            writable: AtomicBool::new(writable),
        });
        self.tables
            .write()
            .expect("fmd tables lock poisoned")
            .insert(fsid, table);
        if was_dirty {
            log::warn!("fsid {fsid} opened dirty; needs a full resync before serving reads without force");
        }
        Ok(was_dirty)
    }

    /// Clears the dirty marker and detaches `fsid`.
    pub fn close(&self, fsid: u32) -> Result<()> {
        let table = self.table(fsid)?;
        let _guard = table.write_lock.write().expect("fsid write lock poisoned");
        table.tree.remove(OPEN_MARKER_KEY)?;
        table.dirty.store(false, Ordering::SeqCst);
        drop(_guard);
        self.tables
            .write()
            .expect("fmd tables lock poisoned")
            .remove(&fsid);
        Ok(())
    }

    pub fn is_dirty(&self, fsid: u32) -> Result<bool> {
        Ok(self.table(fsid)?.dirty.load(Ordering::SeqCst))
    }

    pub fn is_syncing(&self, fsid: u32) -> Result<bool> {
        Ok(self.table(fsid)?.syncing.load(Ordering::SeqCst))
    }

    pub fn set_syncing(&self, fsid: u32, syncing: bool) -> Result<()> {
        self.table(fsid)?.syncing.store(syncing, Ordering::SeqCst);
        Ok(())
    }

    pub fn is_writable(&self, fsid: u32) -> Result<bool> {
        Ok(self.table(fsid)?.writable.load(Ordering::SeqCst))
    }

    pub fn set_writable(&self, fsid: u32, writable: bool) -> Result<()> {
        self.table(fsid)?.writable.store(writable, Ordering::SeqCst);
        Ok(())
    }

    /// Best-effort compaction: flushes pending writes to the backing log.
    pub fn trim(&self, fsid: u32) -> Result<()> {
        let table = self.table(fsid)?;
        let _guard = table.write_lock.write().expect("fsid write lock poisoned");
        table.tree.flush()?;
        Ok(())
    }

    pub fn exists(&self, fid: u64, fsid: u32) -> Result<bool> {
        let table = self.table(fsid)?;
        Ok(table.tree.contains_key(fid_key(fid))?)
    }

    /// Reads the record back. Refuses an inconsistent record unless `force`.
    pub fn get(&self, fid: u64, fsid: u32, force: bool) -> Result<FileRecord> {
        let table = self.table(fsid)?;
        let bytes = table
            .tree
            .get(fid_key(fid))?
            .ok_or(FmdError::NotFound { fid, fsid })?;
        let rec: FileRecord = serde_json::from_slice(&bytes)?;
        if !force && !rec.is_consistent() {
            return Err(FmdError::Inconsistent { fid, fsid });
        }
        Ok(rec)
    }

    /// Raw write, no timestamp bump. Used by resync paths, which manage
    /// their own timestamps explicitly.
    pub fn put(&self, fid: u64, fsid: u32, rec: &FileRecord) -> Result<()> {
        let table = self.table(fsid)?;
        let _guard = table.write_lock.write().expect("fsid write lock poisoned");
        let bytes = serde_json::to_vec(rec)?;
        table.tree.insert(fid_key(fid), bytes)?;
        Ok(())
    }

    pub fn delete(&self, fid: u64, fsid: u32) -> Result<()> {
        let table = self.table(fsid)?;
        let _guard = table.write_lock.write().expect("fsid write lock poisoned");
        table.tree.remove(fid_key(fid))?;
        Ok(())
    }

    /// Creates a fresh record if missing and the fsid is writable.
    pub fn create_if_writable(
        &self,
        fid: u64,
        fsid: u32,
        uid: u32,
        gid: u32,
        lid: crate::layout::LayoutId,
    ) -> Result<FileRecord> {
        if let Ok(rec) = self.get(fid, fsid, true) {
            return Ok(rec);
        }
        if !self.is_writable(fsid)? {
            return Err(FmdError::NotWritable(fsid));
        }
        let rec = FileRecord::new(fid, fsid, uid, gid, lid);
        self.put(fid, fsid, &rec)?;
        Ok(rec)
    }

    /// Bumps `mtime`/`atime` then writes the record. `lock` is accepted for
    /// interface parity with the original API (which allowed skipping the
    /// lock when the caller already holds it); this store always takes the
    /// per-fsid write lock inside `put`, so it has no separate effect.
    pub fn commit(&self, rec: &mut FileRecord, _lock: bool) -> Result<()> {
        rec.touch();
        self.put(rec.fid, rec.fsid, rec)
    }

    fn for_each_record(
        &self,
        fsid: u32,
        mut f: impl FnMut(u64, FileRecord) -> Option<FileRecord>,
    ) -> Result<()> {
        let table = self.table(fsid)?;
        let _guard = table.write_lock.write().expect("fsid write lock poisoned");
        let mut batch = sled::Batch::default();
        for item in table.tree.iter() {
            let (key, value) = item?;
            if key.as_ref() == OPEN_MARKER_KEY {
                continue;
            }
            let fid = u64::from_le_bytes(key.as_ref().try_into().expect("8-byte fid key"));
            let rec: FileRecord = serde_json::from_slice(&value)?;
            if let Some(updated) = f(fid, rec) {
                batch.insert(key.as_ref(), serde_json::to_vec(&updated)?);
            }
        }
        table.tree.apply_batch(batch)?;
        Ok(())
    }

    /// Sets every disk-observed field to sentinel across the whole fsid.
    pub fn reset_disk(&self, fsid: u32) -> Result<()> {
        self.for_each_record(fsid, |_fid, mut rec| {
            rec.reset_disk();
            Some(rec)
        })
    }

    /// Sets every MGM-observed field to sentinel across the whole fsid.
    pub fn reset_mgm(&self, fsid: u32) -> Result<()> {
        self.for_each_record(fsid, |_fid, mut rec| {
            rec.reset_mgm();
            Some(rec)
        })
    }

    /// Returns every record currently stored for `fsid`, for inspection and
    /// namespace-adapter use by callers above this crate (`storectl dump`).
    pub fn dump(&self, fsid: u32) -> Result<Vec<FileRecord>> {
        let table = self.table(fsid)?;
        let mut out = Vec::new();
        for item in table.tree.iter() {
            let (key, value) = item?;
            if key.as_ref() == OPEN_MARKER_KEY {
                continue;
            }
            out.push(serde_json::from_slice(&value)?);
        }
        Ok(out)
    }

    /// Scans the fsid's table and returns the inconsistency statistics
    /// (§4.4). While the fsid is syncing, every counter is 0.
    pub fn get_inconsistency_statistics(&self, fsid: u32) -> Result<InconsistencyStats> {
        let mut stats = InconsistencyStats::default();
        if self.is_syncing(fsid)? {
            return Ok(stats);
        }
        let table = self.table(fsid)?;
        for item in table.tree.iter() {
            let (key, value) = item?;
            if key.as_ref() == OPEN_MARKER_KEY {
                continue;
            }
            let fid = u64::from_le_bytes(key.as_ref().try_into().expect("8-byte fid key"));
            let rec: FileRecord = serde_json::from_slice(&value)?;

            stats.mem_n.fids.insert(fid);
            if rec.disksize == UNDEF_SIZE {
                stats.d_sync_n.fids.insert(fid);
            }
            if rec.mgmsize == UNDEF_SIZE {
                stats.m_sync_n.fids.insert(fid);
            }
            if rec.disksize != UNDEF_SIZE && rec.disksize != rec.size {
                stats.d_mem_sz_diff.fids.insert(fid);
            }
            if rec.mgmsize != UNDEF_SIZE && rec.mgmsize != rec.size {
                stats.m_mem_sz_diff.fids.insert(fid);
            }
            if !rec.diskchecksum.is_empty() && rec.diskchecksum != rec.checksum {
                stats.d_cx_diff.fids.insert(fid);
            }
            if !rec.mgmchecksum.is_empty() && rec.mgmchecksum != rec.checksum {
                stats.m_cx_diff.fids.insert(fid);
            }
            if rec.layouterror & layout_error::ORPHAN != 0 {
                stats.orphans_n.fids.insert(fid);
            }
            if rec.layouterror & layout_error::UNREGISTERED != 0 {
                stats.unreg_n.fids.insert(fid);
            }
            if rec.layouterror & layout_error::REPLICA_WRONG != 0 {
                stats.rep_diff_n.fids.insert(fid);
            }
        }
        Ok(stats)
    }
}

fn fsid_tree_name(fsid: u32) -> String {
    format!("fsid-{fsid}")
}

fn fid_key(fid: u64) -> [u8; 8] {
    fid.to_le_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{ChecksumKind, LayoutId};

    fn open_store() -> (tempfile::TempDir, FmdStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FmdStore::open_db(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn round_trip_put_get() {
        let (_dir, store) = open_store();
        store.open(1, true).unwrap();
        let rec = FileRecord::new(42, 1, 0, 0, LayoutId::plain(ChecksumKind::Adler32));
        store.put(42, 1, &rec).unwrap();
        let got = store.get(42, 1, false).unwrap();
        assert_eq!(got.fid, 42);
    }

    #[test]
    fn commit_bumps_mtime_and_atime() {
        let (_dir, store) = open_store();
        store.open(1, true).unwrap();
        let mut rec = FileRecord::new(1, 1, 0, 0, LayoutId::plain(ChecksumKind::Adler32));
        let created_mtime = rec.mtime;
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.commit(&mut rec, true).unwrap();
        let got = store.get(1, 1, false).unwrap();
        assert!(got.mtime >= created_mtime);
    }

    #[test]
    fn get_refuses_inconsistent_without_force() {
        let (_dir, store) = open_store();
        store.open(1, true).unwrap();
        let mut rec = FileRecord::new(1, 1, 0, 0, LayoutId::plain(ChecksumKind::Adler32));
        rec.size = 100;
        rec.disksize = 100;
        rec.mgmsize = 101;
        store.put(1, 1, &rec).unwrap();

        assert!(matches!(
            store.get(1, 1, false),
            Err(FmdError::Inconsistent { .. })
        ));
        assert!(store.get(1, 1, true).is_ok());
    }

    #[test]
    fn reopening_without_close_marks_dirty() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FmdStore::open_db(dir.path()).unwrap();
            let was_dirty = store.open(1, true).unwrap();
            assert!(!was_dirty);
            // No close(): simulates a crash.
        }
        let store = FmdStore::open_db(dir.path()).unwrap();
        let was_dirty = store.open(1, true).unwrap();
        assert!(was_dirty);
    }

    #[test]
    fn clean_close_then_reopen_is_not_dirty() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FmdStore::open_db(dir.path()).unwrap();
            store.open(1, true).unwrap();
            store.close(1).unwrap();
        }
        let store = FmdStore::open_db(dir.path()).unwrap();
        let was_dirty = store.open(1, true).unwrap();
        assert!(!was_dirty);
    }

    #[test]
    fn reset_disk_clears_only_disk_fields() {
        let (_dir, store) = open_store();
        store.open(1, true).unwrap();
        let mut rec = FileRecord::new(1, 1, 0, 0, LayoutId::plain(ChecksumKind::Adler32));
        rec.size = 10;
        rec.disksize = 10;
        rec.diskchecksum = "abcd".into();
        rec.mgmsize = 10;
        store.put(1, 1, &rec).unwrap();

        store.reset_disk(1).unwrap();
        let got = store.get(1, 1, true).unwrap();
        assert_eq!(got.disksize, UNDEF_SIZE);
        assert!(got.diskchecksum.is_empty());
        assert_eq!(got.mgmsize, 10);
    }

    #[test]
    fn statistics_zero_while_syncing() {
        let (_dir, store) = open_store();
        store.open(1, true).unwrap();
        let mut rec = FileRecord::new(1, 1, 0, 0, LayoutId::plain(ChecksumKind::Adler32));
        rec.size = 100;
        rec.disksize = 100;
        rec.mgmsize = 101;
        store.put(1, 1, &rec).unwrap();

        store.set_syncing(1, true).unwrap();
        let stats = store.get_inconsistency_statistics(1).unwrap();
        assert_eq!(stats.mem_n.count(), 0);

        store.set_syncing(1, false).unwrap();
        let stats = store.get_inconsistency_statistics(1).unwrap();
        assert_eq!(stats.m_mem_sz_diff.count(), 1);
        assert!(stats.m_mem_sz_diff.fids.contains(&1));
    }

    #[test]
    fn create_if_writable_refuses_on_readonly_fs() {
        let (_dir, store) = open_store();
        store.open(1, false).unwrap();
        let err = store
            .create_if_writable(1, 1, 0, 0, LayoutId::plain(ChecksumKind::Adler32))
            .unwrap_err();
        assert!(matches!(err, FmdError::NotWritable(1)));
    }
}
