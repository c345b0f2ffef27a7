use crate::error::Result;
use crate::types::{FileSystem, Group, Space};

/// The façade the core consumes from the topology component (§4.8). One RW
/// mutex guards all the maps this trait's state lives behind; callers must
/// release a snapshot before any long blocking call (§3.2).
pub trait FsView: Send + Sync {
    fn register(&self, fs: FileSystem) -> Result<u32>;
    fn unregister(&self, fsid: u32) -> Result<()>;
    fn create_mapping(&self, uuid: &str) -> Result<u32>;
    fn remove_mapping(&self, fsid: u32) -> Result<()>;
    fn move_to_group(&self, fsid: u32, group: &str) -> Result<()>;
    fn store_fs_config(&self, fs: FileSystem) -> Result<()>;
    fn snapshot(&self, fsid: u32) -> Result<FileSystem>;
    fn find_by_queue_path(&self, path: &str) -> Result<FileSystem>;

    /// Not named in §4.8's operation list, but needed by C5/C6/C7 to
    /// enumerate topology; read-only and cheap, same lock discipline.
    fn register_space(&self, space: Space) -> Result<()>;
    fn space(&self, name: &str) -> Result<Space>;
    fn group(&self, name: &str) -> Result<Group>;
    fn groups_in_space(&self, space: &str) -> Result<Vec<Group>>;
    fn filesystems_in_group(&self, group: &str) -> Result<Vec<FileSystem>>;
}
