//! `storectl fmd open/resync-disk/resync-mgm/stat/dump`.

use fmd::{FmdStore, MgmFileRecord, MgmQuery, RealDiskWalk};

use crate::error::Result;
use crate::sandbox::Sandbox;

fn open_store(sandbox: &Sandbox) -> Result<FmdStore> {
    Ok(FmdStore::open_db(&sandbox.fmd_db_dir())?)
}

pub fn open(sandbox: &Sandbox, fsid: u32, writable: bool) -> Result<()> {
    let store = open_store(sandbox)?;
    let was_dirty = store.open(fsid, writable)?;
    if was_dirty {
        println!("fsid {fsid} opened dirty; resync before trusting reads without force");
    } else {
        println!("fsid {fsid} opened clean");
    }
    Ok(())
}

pub fn resync_disk(sandbox: &Sandbox, fsid: u32, mount_prefix: &str, flag_layout_error: bool) -> Result<()> {
    let store = open_store(sandbox)?;
    store.open(fsid, true)?;
    let walker = RealDiskWalk::new(mount_prefix);
    let n = fmd::resync_disk(&store, &walker, fsid, flag_layout_error)?;
    println!("disk resync merged {n} records for fsid {fsid}");
    Ok(())
}

struct FileMgmQuery {
    records: Vec<MgmFileRecord>,
}

impl MgmQuery for FileMgmQuery {
    fn dumpmd(&self, _fsid: u32) -> fmd::Result<Vec<MgmFileRecord>> {
        Ok(self.records.clone())
    }

    fn getfmd(&self, fid: u64) -> fmd::Result<Option<MgmFileRecord>> {
        Ok(self.records.iter().find(|r| r.id == fid).cloned())
    }
}

pub fn resync_mgm(sandbox: &Sandbox, fsid: u32, dump_file: &str) -> Result<()> {
    let store = open_store(sandbox)?;
    store.open(fsid, true)?;
    let records: Vec<MgmFileRecord> = crate::sandbox::read_json(std::path::Path::new(dump_file))?;
    let mgm = FileMgmQuery { records };
    let n = fmd::resync_mgm(&store, &mgm, fsid)?;
    println!("MGM resync merged {n} records for fsid {fsid}");
    Ok(())
}

pub fn stat(sandbox: &Sandbox, fsid: u32) -> Result<()> {
    let store = open_store(sandbox)?;
    store.open(fsid, true)?;
    let stats = store.get_inconsistency_statistics(fsid)?;
    println!("mem_n={}", stats.mem_n.count());
    println!("d_sync_n={}", stats.d_sync_n.count());
    println!("m_sync_n={}", stats.m_sync_n.count());
    println!("d_mem_sz_diff={}", stats.d_mem_sz_diff.count());
    println!("m_mem_sz_diff={}", stats.m_mem_sz_diff.count());
    println!("d_cx_diff={}", stats.d_cx_diff.count());
    println!("m_cx_diff={}", stats.m_cx_diff.count());
    println!("orphans_n={}", stats.orphans_n.count());
    println!("unreg_n={}", stats.unreg_n.count());
    println!("rep_diff_n={}", stats.rep_diff_n.count());
    Ok(())
}

pub fn dump(sandbox: &Sandbox, fsid: u32) -> Result<()> {
    let store = open_store(sandbox)?;
    store.open(fsid, true)?;
    let records = store.dump(fsid)?;
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
