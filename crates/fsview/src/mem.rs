use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{FsViewError, Result};
use crate::types::{FileSystem, Group, Space};
use crate::view::FsView;

#[derive(Default)]
struct Inner {
    by_id: HashMap<u32, FileSystem>,
    by_queue: HashMap<String, u32>,
    uuid_to_fsid: HashMap<String, u32>,
    groups: HashMap<String, Group>,
    spaces: HashMap<String, Space>,
    rr_cursor: HashMap<String, usize>,
    next_fsid: u32,
}

/// In-memory topology snapshot behind a single RW mutex, as required by
/// §4.8. `register` applies the space's placement defaults automatically
/// when a filesystem arrives carrying the `<space>.random` sentinel.
#[derive(Default)]
pub struct MemFsView {
    inner: RwLock<Inner>,
}

impl MemFsView {
    pub fn new() -> Self {
        MemFsView::default()
    }

    fn space_name_of(schedgroup: &str) -> Option<&str> {
        schedgroup.split('.').next().filter(|s| !s.is_empty())
    }

    /// Picks a group for `host` within `space`, per §4.8: a group whose
    /// current size is below `groupsize` and that doesn't already host a
    /// filesystem on the same `host`. Tries every `groupmod` candidate
    /// group once, round-robin from the space's cursor.
    fn pick_group(inner: &mut Inner, space: &Space, host: &str) -> Result<String> {
        let start = *inner.rr_cursor.get(&space.name).unwrap_or(&0);
        for attempt in 0..space.groupmod.max(1) {
            let n = (start + attempt) % space.groupmod.max(1);
            let name = format!("{}.{}", space.name, n);
            let group = inner.groups.entry(name.clone()).or_insert_with(|| Group {
                name: name.clone(),
                space: space.name.clone(),
                status: None,
                members: Vec::new(),
            });
            let host_taken = group
                .members
                .iter()
                .any(|fsid| inner.by_id.get(fsid).map(|fs| fs.host.as_str()) == Some(host));
            if group.size() < space.groupsize && !host_taken {
                inner
                    .rr_cursor
                    .insert(space.name.clone(), (n + 1) % space.groupmod.max(1));
                return Ok(name);
            }
        }
        Err(FsViewError::SpaceFull(space.name.clone()))
    }

    fn attach_to_group(inner: &mut Inner, fsid: u32, group_name: &str, space_name: &str) {
        let group = inner
            .groups
            .entry(group_name.to_string())
            .or_insert_with(|| Group {
                name: group_name.to_string(),
                space: space_name.to_string(),
                status: None,
                members: Vec::new(),
            });
        if !group.members.contains(&fsid) {
            group.members.push(fsid);
        }
    }

    fn detach_from_group(inner: &mut Inner, fsid: u32, group_name: &str) {
        if let Some(group) = inner.groups.get_mut(group_name) {
            group.members.retain(|m| *m != fsid);
        }
    }
}

impl FsView for MemFsView {
    fn register(&self, mut fs: FileSystem) -> Result<u32> {
        let mut inner = self.inner.write().expect("fsview lock poisoned");

        let space_name = Self::space_name_of(&fs.schedgroup)
            .map(str::to_string)
            .or_else(|| inner.spaces.keys().next().cloned());

        if let Some(space_name) = &space_name {
            let wants_auto = inner
                .spaces
                .get(space_name)
                .map(|s| fs.schedgroup.is_empty() || fs.schedgroup == s.random_sentinel())
                .unwrap_or(false);
            if wants_auto {
                let space = inner
                    .spaces
                    .get(space_name)
                    .cloned()
                    .ok_or_else(|| FsViewError::SpaceNotFound(space_name.clone()))?;
                let host = fs.host.clone();
                let group_name = Self::pick_group(&mut inner, &space, &host)?;
                fs.schedgroup = group_name;
            }
        }

        let group_name = fs.schedgroup.clone();
        let space_for_group = space_name.unwrap_or_default();
        let fsid = fs.id;
        inner.by_queue.insert(fs.queue(), fsid);
        inner.uuid_to_fsid.insert(fs.uuid.clone(), fsid);
        Self::attach_to_group(&mut inner, fsid, &group_name, &space_for_group);
        inner.by_id.insert(fsid, fs);
        log::debug!("registered fsid {fsid} into group {group_name}");
        Ok(fsid)
    }

    fn unregister(&self, fsid: u32) -> Result<()> {
        let mut inner = self.inner.write().expect("fsview lock poisoned");
        let fs = inner
            .by_id
            .remove(&fsid)
            .ok_or(FsViewError::FsNotFound(fsid))?;
        inner.by_queue.remove(&fs.queue());
        inner.uuid_to_fsid.remove(&fs.uuid);
        Self::detach_from_group(&mut inner, fsid, &fs.schedgroup);
        Ok(())
    }

    fn create_mapping(&self, uuid: &str) -> Result<u32> {
        let mut inner = self.inner.write().expect("fsview lock poisoned");
        if inner.uuid_to_fsid.contains_key(uuid) {
            return Err(FsViewError::DuplicateUuid(uuid.to_string()));
        }
        inner.next_fsid += 1;
        let fsid = inner.next_fsid;
        inner.uuid_to_fsid.insert(uuid.to_string(), fsid);
        Ok(fsid)
    }

    fn remove_mapping(&self, fsid: u32) -> Result<()> {
        let mut inner = self.inner.write().expect("fsview lock poisoned");
        let uuid = inner
            .uuid_to_fsid
            .iter()
            .find(|(_, v)| **v == fsid)
            .map(|(k, _)| k.clone());
        match uuid {
            Some(uuid) => {
                inner.uuid_to_fsid.remove(&uuid);
                Ok(())
            }
            None => Err(FsViewError::NoMapping(fsid.to_string())),
        }
    }

    fn move_to_group(&self, fsid: u32, group: &str) -> Result<()> {
        let mut inner = self.inner.write().expect("fsview lock poisoned");
        let old_group = inner
            .by_id
            .get(&fsid)
            .ok_or(FsViewError::FsNotFound(fsid))?
            .schedgroup
            .clone();
        let space_name = Self::space_name_of(group).unwrap_or_default().to_string();
        Self::detach_from_group(&mut inner, fsid, &old_group);
        Self::attach_to_group(&mut inner, fsid, group, &space_name);
        inner.by_id.get_mut(&fsid).unwrap().schedgroup = group.to_string();
        Ok(())
    }

    fn store_fs_config(&self, fs: FileSystem) -> Result<()> {
        let mut inner = self.inner.write().expect("fsview lock poisoned");
        if !inner.by_id.contains_key(&fs.id) {
            return Err(FsViewError::FsNotFound(fs.id));
        }
        inner.by_queue.insert(fs.queue(), fs.id);
        inner.by_id.insert(fs.id, fs);
        Ok(())
    }

    fn snapshot(&self, fsid: u32) -> Result<FileSystem> {
        let inner = self.inner.read().expect("fsview lock poisoned");
        inner
            .by_id
            .get(&fsid)
            .cloned()
            .ok_or(FsViewError::FsNotFound(fsid))
    }

    fn find_by_queue_path(&self, path: &str) -> Result<FileSystem> {
        let inner = self.inner.read().expect("fsview lock poisoned");
        let fsid = *inner
            .by_queue
            .get(path)
            .ok_or_else(|| FsViewError::QueueNotFound(path.to_string()))?;
        inner
            .by_id
            .get(&fsid)
            .cloned()
            .ok_or(FsViewError::FsNotFound(fsid))
    }

    fn register_space(&self, space: Space) -> Result<()> {
        let mut inner = self.inner.write().expect("fsview lock poisoned");
        inner.spaces.insert(space.name.clone(), space);
        Ok(())
    }

    fn space(&self, name: &str) -> Result<Space> {
        let inner = self.inner.read().expect("fsview lock poisoned");
        inner
            .spaces
            .get(name)
            .cloned()
            .ok_or_else(|| FsViewError::SpaceNotFound(name.to_string()))
    }

    fn group(&self, name: &str) -> Result<Group> {
        let inner = self.inner.read().expect("fsview lock poisoned");
        inner
            .groups
            .get(name)
            .cloned()
            .ok_or_else(|| FsViewError::GroupNotFound(name.to_string()))
    }

    fn groups_in_space(&self, space: &str) -> Result<Vec<Group>> {
        let inner = self.inner.read().expect("fsview lock poisoned");
        Ok(inner
            .groups
            .values()
            .filter(|g| g.space == space)
            .cloned()
            .collect())
    }

    fn filesystems_in_group(&self, group: &str) -> Result<Vec<FileSystem>> {
        let inner = self.inner.read().expect("fsview lock poisoned");
        let Some(g) = inner.groups.get(group) else {
            return Err(FsViewError::GroupNotFound(group.to_string()));
        };
        Ok(g.members
            .iter()
            .filter_map(|fsid| inner.by_id.get(fsid).cloned())
            .collect())
    }
}
