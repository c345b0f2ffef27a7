use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Msg(String),

    #[error("symkey error: {0}")]
    SymKey(#[from] symkey::SymKeyError),

    #[error("fmd error: {0}")]
    Fmd(#[from] fmd::FmdError),

    #[error("fsview error: {0}")]
    FsView(#[from] fsview::FsViewError),

    #[error("fsck error: {0}")]
    Fsck(#[from] fsck::FsckError),

    #[error("rebalance error: {0}")]
    Rebalance(#[from] rebalance::RebalanceError),

    #[error("balance scheduler error: {0}")]
    Sched(#[from] balance_sched::SchedError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;
