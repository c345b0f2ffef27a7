use thiserror::Error;

#[derive(Debug, Error)]
pub enum FmdError {
    #[error("fsid {0} is not open")]
    NotOpen(u32),

    #[error("no record for fid {fid:#x} on fsid {fsid}")]
    NotFound { fid: u64, fsid: u32 },

    #[error(
        "record for fid {fid:#x} on fsid {fsid} is inconsistent (disk/mgm disagree with reference); use force=true to read it anyway"
    )]
    Inconsistent { fid: u64, fsid: u32 },

    #[error("fsid {0} is not writable")]
    NotWritable(u32),

    #[error("local I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage engine error: {0}")]
    Db(#[from] sled::Error),

    #[error("record codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("transient transport error, exhausted retries: {0}")]
    Transport(String),

    #[error("not found upstream: {0}")]
    NoData(String),
}

pub type Result<T> = std::result::Result<T, FmdError>;
