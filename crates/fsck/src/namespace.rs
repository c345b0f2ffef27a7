//! The slice of the (out-of-scope, §1) namespace implementation that the
//! collector consumes: per-fs placement, per-fid location/layout, and a
//! zero-replica iterator.

use fmd::LayoutId;

pub trait NamespaceView: Send + Sync {
    fn fids_on_fs(&self, fsid: u32) -> Vec<u64>;
    fn fsids_of(&self, fid: u64) -> Vec<u32>;
    fn layout_of(&self, fid: u64) -> LayoutId;
    fn zero_replica_fids(&self) -> Vec<u64>;
    fn fid_to_lfn(&self, fid: u64) -> Option<String>;
}
