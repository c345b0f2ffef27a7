//! `storectl fsck enable/disable/report`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use fsck::{offline_fsids_from, run_cycle, ConfigStore, FidExpand, FsckController};
use fsview::FileSystem;

use crate::error::Result;
use crate::ns_fmd::FmdNamespace;
use crate::sandbox::Sandbox;

struct JsonConfigStore {
    path: std::path::PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl JsonConfigStore {
    fn open(sandbox: &Sandbox) -> Result<Self> {
        let path = sandbox.fsck_config_file();
        let values: HashMap<String, String> = crate::sandbox::load_json(&path)?;
        Ok(JsonConfigStore {
            path,
            values: Mutex::new(values),
        })
    }
}

impl ConfigStore for JsonConfigStore {
    fn set(&self, key: &str, value: &str) -> fsck::Result<()> {
        let mut values = self.values.lock().expect("config store lock poisoned");
        values.insert(key.to_string(), value.to_string());
        crate::sandbox::save_json(&self.path, &*values)
            .map_err(|e| fsck::FsckError::Config(e.to_string()))
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().expect("config store lock poisoned").get(key).cloned()
    }
}

pub fn enable(sandbox: &Sandbox) -> Result<()> {
    let controller = FsckController::new(JsonConfigStore::open(sandbox)?, Duration::from_secs(1800));
    controller.enable()?;
    println!("fsck enabled");
    Ok(())
}

pub fn disable(sandbox: &Sandbox) -> Result<()> {
    let controller = FsckController::new(JsonConfigStore::open(sandbox)?, Duration::from_secs(1800));
    controller.disable()?;
    println!("fsck disabled");
    Ok(())
}

pub fn report(sandbox: &Sandbox, fmd_db: &std::path::Path, replies_file: Option<&str>, show_offline: bool) -> Result<()> {
    let topology: crate::topology::TopologyFile =
        crate::sandbox::load_json(&sandbox.topology_file())?;
    let view = crate::topology::build_view(&topology)?;

    let replies: Vec<String> = match replies_file {
        Some(path) => std::fs::read_to_string(path)?.lines().map(str::to_string).collect(),
        None => Vec::new(),
    };

    let filesystems: Vec<FileSystem> = topology
        .filesystems
        .iter()
        .filter_map(|def| view.snapshot(def.id).ok())
        .collect();
    let offline = offline_fsids_from(&filesystems);

    let store = fmd::FmdStore::open_db(fmd_db)?;
    let fsids: Vec<u32> = topology.filesystems.iter().map(|def| def.id).collect();
    for &fsid in &fsids {
        let _ = store.open(fsid, true);
    }
    let ns = FmdNamespace::new(&store, fsids);

    let report = run_cycle(&replies, show_offline, &offline, &ns);
    println!("{}", fsck::render_json(&report, FidExpand::Hex, Some(&ns)));
    Ok(())
}
