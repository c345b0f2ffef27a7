//! A toy namespace adapter over [`fmd::FmdStore`], standing in for the real
//! MGM namespace that every consuming component treats as an external
//! collaborator. Good enough to drive `storectl`'s sandbox commands; not a
//! substitute for the out-of-scope namespace service itself.

use rand::seq::SliceRandom;

use fmd::{FileRecord, FmdStore, LayoutId};

pub struct FmdNamespace<'a> {
    store: &'a FmdStore,
    fsids: Vec<u32>,
}

impl<'a> FmdNamespace<'a> {
    pub fn new(store: &'a FmdStore, fsids: Vec<u32>) -> Self {
        FmdNamespace { store, fsids }
    }

    fn records_on(&self, fsid: u32) -> Vec<FileRecord> {
        self.store.dump(fsid).unwrap_or_default()
    }

    fn find(&self, fid: u64) -> Option<FileRecord> {
        self.fsids
            .iter()
            .flat_map(|&fsid| self.records_on(fsid))
            .find(|r| r.fid == fid)
    }
}

impl<'a> fsck::NamespaceView for FmdNamespace<'a> {
    fn fids_on_fs(&self, fsid: u32) -> Vec<u64> {
        self.records_on(fsid).into_iter().map(|r| r.fid).collect()
    }

    fn fsids_of(&self, fid: u64) -> Vec<u32> {
        self.find(fid)
            .map(|r| fmd::parse_locations(&r.locations).into_iter().map(|l| l.fsid).collect())
            .unwrap_or_default()
    }

    fn layout_of(&self, fid: u64) -> LayoutId {
        self.find(fid).map(|r| r.lid).unwrap_or(LayoutId::ZERO)
    }

    fn zero_replica_fids(&self) -> Vec<u64> {
        self.fsids
            .iter()
            .flat_map(|&fsid| self.records_on(fsid))
            .filter(|r| fmd::parse_locations(&r.locations).is_empty())
            .map(|r| r.fid)
            .collect()
    }

    fn fid_to_lfn(&self, fid: u64) -> Option<String> {
        Some(format!("/eos/file-{fid:x}"))
    }
}

impl<'a> rebalance::NamespaceSource for FmdNamespace<'a> {
    fn num_files_on_fs(&self, fsid: u32) -> u64 {
        self.records_on(fsid).len() as u64
    }

    fn approximately_random_fid_on_fs(&self, fsid: u32) -> Option<u64> {
        let recs = self.records_on(fsid);
        recs.choose(&mut rand::thread_rng()).map(|r| r.fid)
    }

    fn layout_of(&self, fid: u64) -> LayoutId {
        self.find(fid).map(|r| r.lid).unwrap_or(LayoutId::ZERO)
    }

    fn drain_page(&self, fsid: u32, max: usize) -> Vec<u64> {
        self.records_on(fsid).into_iter().take(max).map(|r| r.fid).collect()
    }
}

impl<'a> balance_sched::NamespaceSource for FmdNamespace<'a> {
    fn num_files_on_fs(&self, fsid: u32) -> u64 {
        self.records_on(fsid).len() as u64
    }

    fn approximately_random_fid_on_fs(&self, fsid: u32) -> Option<u64> {
        let recs = self.records_on(fsid);
        recs.choose(&mut rand::thread_rng()).map(|r| r.fid)
    }

    fn file_record(&self, fid: u64) -> Option<FileRecord> {
        self.find(fid)
    }
}
