use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsckError {
    #[error("fsck is disabled")]
    Disabled,

    #[error("config store write failed: {0}")]
    Config(String),

    #[error("repair queue is shut down")]
    QueueClosed,
}

pub type Result<T> = std::result::Result<T, FsckError>;
