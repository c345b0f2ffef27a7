//! Balance-transfer scheduler: the pull endpoint FSTs call to ask for one
//! balancing transfer job, with capability minting (§4.7).

mod auth;
mod error;
mod namespace;
mod schedule;

pub use auth::{AllowAll, AuthCheck};
pub use error::{Result, SchedError};
pub use namespace::NamespaceSource;
pub use schedule::{BalanceScheduler, SchedulerConfig, TransferJob};
