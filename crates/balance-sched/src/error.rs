use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedError {
    #[error("auth check failed")]
    Unauthorized,

    #[error("fsid {0} not found")]
    NoSuchFs(u32),

    #[error("capability error: {0}")]
    Capability(#[from] symkey::SymKeyError),

    #[error("fsview error: {0}")]
    FsView(#[from] fsview::FsViewError),
}

pub type Result<T> = std::result::Result<T, SchedError>;
