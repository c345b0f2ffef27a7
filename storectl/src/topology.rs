//! JSON description of a toy topology, loaded fresh into a [`MemFsView`] at
//! the start of every `rebalance`/`balance` invocation (the view itself
//! isn't persisted; the sandbox's source of truth is this file).

use serde::{Deserialize, Serialize};

use fsview::{BootStatus, ConfigStatus, FileSystem, FsView, MemFsView, Space};

use crate::error::Result;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TopologyFile {
    #[serde(default)]
    pub spaces: Vec<SpaceDef>,
    #[serde(default)]
    pub filesystems: Vec<FsDef>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SpaceDef {
    pub name: String,
    #[serde(default = "default_one")]
    pub groupsize: usize,
    #[serde(default = "default_one")]
    pub groupmod: usize,
    #[serde(default)]
    pub converter: bool,
    #[serde(default)]
    pub groupbalancer: bool,
    #[serde(default)]
    pub threshold: f64,
}

fn default_one() -> usize {
    1
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FsDef {
    pub id: u32,
    pub uuid: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub path: String,
    pub schedgroup: String,
    #[serde(default)]
    pub configstatus: String,
    #[serde(default)]
    pub capacity_bytes: u64,
    #[serde(default)]
    pub used_bytes: u64,
}

fn default_port() -> u16 {
    1095
}

fn parse_configstatus(s: &str) -> ConfigStatus {
    match s {
        "off" => ConfigStatus::Off,
        "drain" => ConfigStatus::Drain,
        "draindead" => ConfigStatus::DrainDead,
        "ro" => ConfigStatus::Ro,
        "rw" => ConfigStatus::Rw,
        _ => ConfigStatus::Empty,
    }
}

pub fn build_view(topology: &TopologyFile) -> Result<MemFsView> {
    let view = MemFsView::new();
    for space in &topology.spaces {
        view.register_space(Space {
            name: space.name.clone(),
            groupsize: space.groupsize,
            groupmod: space.groupmod,
            converter: space.converter,
            groupbalancer: space.groupbalancer,
            threshold: space.threshold,
        })?;
    }
    for def in &topology.filesystems {
        let mut fs = FileSystem::new(def.id, def.uuid.clone(), def.host.clone(), def.port);
        fs.path = def.path.clone();
        fs.schedgroup = def.schedgroup.clone();
        fs.configstatus = parse_configstatus(&def.configstatus);
        fs.active = true;
        fs.boot = BootStatus::Booted;
        fs.capacity_bytes = def.capacity_bytes;
        fs.used_bytes = def.used_bytes;
        view.register(fs)?;
    }
    Ok(view)
}
