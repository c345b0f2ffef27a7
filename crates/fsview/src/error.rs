use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsViewError {
    #[error("no filesystem registered with fsid {0}")]
    FsNotFound(u32),

    #[error("no group named {0}")]
    GroupNotFound(String),

    #[error("no space named {0}")]
    SpaceNotFound(String),

    #[error("uuid {0} is already mapped")]
    DuplicateUuid(String),

    #[error("no mapping for uuid {0}")]
    NoMapping(String),

    #[error("host {host} already contributes a filesystem to group {group}")]
    HostAlreadyInGroup { host: String, group: String },

    #[error("every group in space {0} is at its configured groupsize")]
    SpaceFull(String),

    #[error("no queue registered at path {0}")]
    QueueNotFound(String),
}

pub type Result<T> = std::result::Result<T, FsViewError>;
