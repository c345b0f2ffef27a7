//! Topology entities (§3.1 `FileSystem`/`Group`/`Space`).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigStatus {
    Empty,
    Off,
    Drain,
    DrainDead,
    Ro,
    Rw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootStatus {
    Booted,
    NotBooted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupStatus {
    On,
    Off,
    Drain,
}

/// One local disk on one FST.
#[derive(Debug, Clone, PartialEq)]
pub struct FileSystem {
    pub id: u32,
    pub uuid: String,
    pub host: String,
    pub port: u16,
    /// Mount prefix, e.g. `/data/01`.
    pub path: String,
    /// `space.N`, e.g. `"default.3"`.
    pub schedgroup: String,
    pub configstatus: ConfigStatus,
    pub active: bool,
    pub boot: BootStatus,
    pub used_bytes: u64,
    pub capacity_bytes: u64,
}

impl FileSystem {
    pub fn new(id: u32, uuid: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        FileSystem {
            id,
            uuid: uuid.into(),
            host: host.into(),
            port,
            path: String::new(),
            schedgroup: String::new(),
            configstatus: ConfigStatus::Off,
            active: false,
            boot: BootStatus::NotBooted,
            used_bytes: 0,
            capacity_bytes: 0,
        }
    }

    pub fn queue(&self) -> String {
        format!("/eos/{}:{}/fst{}", self.host, self.port, self.path)
    }

    pub fn fill_ratio(&self) -> f64 {
        if self.capacity_bytes == 0 {
            0.0
        } else {
            self.used_bytes as f64 / self.capacity_bytes as f64
        }
    }

    pub fn is_online(&self) -> bool {
        self.active && self.boot == BootStatus::Booted
    }

    pub fn is_rw(&self) -> bool {
        self.configstatus == ConfigStatus::Rw
    }

    pub fn is_no_drain(&self) -> bool {
        !matches!(self.configstatus, ConfigStatus::Drain | ConfigStatus::DrainDead)
    }

    pub fn hostport(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Ordered set of filesystems sharing one `schedgroup`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    pub name: String,
    pub space: String,
    pub status: Option<GroupStatus>,
    pub members: Vec<u32>,
}

impl Group {
    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn status(&self) -> GroupStatus {
        self.status.unwrap_or(GroupStatus::On)
    }
}

/// Set of groups sharing a name prefix, with placement defaults and policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Space {
    pub name: String,
    pub groupsize: usize,
    pub groupmod: usize,
    pub converter: bool,
    pub groupbalancer: bool,
    pub threshold: f64,
}

impl Space {
    pub fn new(name: impl Into<String>) -> Self {
        Space {
            name: name.into(),
            groupsize: 1,
            groupmod: 1,
            converter: false,
            groupbalancer: false,
            threshold: 0.0,
        }
    }

    /// The `schedgroup=<space>.random` sentinel that requests automatic
    /// group placement at register time.
    pub fn random_sentinel(&self) -> String {
        format!("{}.random", self.name)
    }
}
