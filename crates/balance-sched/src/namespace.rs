//! Namespace operations the scheduler consumes (§4.7 step 4).

use fmd::FileRecord;

pub trait NamespaceSource: Send + Sync {
    fn num_files_on_fs(&self, fsid: u32) -> u64;
    fn approximately_random_fid_on_fs(&self, fsid: u32) -> Option<u64>;
    fn file_record(&self, fid: u64) -> Option<FileRecord>;
}
