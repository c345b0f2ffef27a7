use thiserror::Error;

#[derive(Debug, Error)]
pub enum RebalanceError {
    #[error("converter is off for this space")]
    ConverterOff,

    #[error("this node is not the master")]
    NotMaster,

    #[error("no group found: {0}")]
    NoGroup(String),

    #[error("no eligible source/destination group pair under the current threshold")]
    NoCandidatePair,

    #[error("fsview error: {0}")]
    FsView(#[from] fsview::FsViewError),
}

pub type Result<T> = std::result::Result<T, RebalanceError>;
