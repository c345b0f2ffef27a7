//! Per-FST file-metadata store (FMD): the `FileRecord` entity, its sled-backed
//! store, and the disk/MGM resync engine that keeps it truthful.

mod error;
mod layout;
mod record;
mod resync;
mod store;

pub use error::{FmdError, Result};
pub use layout::{
    classify_layout_error, layout_error, parse_locations, ChecksumKind, LayoutId, LayoutKind,
    LocationEntry,
};
pub use record::{FileRecord, Timestamp, UNDEF_SIZE};
pub use resync::{
    resync_disk, resync_mgm, resync_mgm_one, DiskAttrs, DiskWalk, MgmFileRecord, MgmQuery,
    RealDiskWalk,
};
pub use store::{ClassStat, FmdStore, InconsistencyStats};

#[cfg(test)]
mod dump_tests {
    use super::*;

    #[test]
    fn dump_lists_every_record_and_skips_the_open_marker() {
        let dir = tempfile::tempdir().unwrap();
        let store = FmdStore::open_db(dir.path()).unwrap();
        store.open(1, true).unwrap();
        store
            .put(1, 1, &FileRecord::new(1, 1, 0, 0, LayoutId::plain(ChecksumKind::Adler32)))
            .unwrap();
        store
            .put(2, 1, &FileRecord::new(2, 1, 0, 0, LayoutId::plain(ChecksumKind::Adler32)))
            .unwrap();

        let mut fids: Vec<u64> = store.dump(1).unwrap().iter().map(|r| r.fid).collect();
        fids.sort();
        assert_eq!(fids, vec![1, 2]);
    }
}
