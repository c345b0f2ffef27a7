//! Replica placement rebalancer: group fill balancer and group drainer,
//! sharing one machinery (§4.6).

mod balancer;
mod conversion;
mod drainer;
mod error;
mod fill;
mod namespace;

pub use balancer::{run_once as balance_once, BalancerConfig};
pub use conversion::{conversion_job_name, ConversionJob};
pub use drainer::{run_once as drain_once, DrainerConfig};
pub use error::{RebalanceError, Result};
pub use fill::{average_fill, snapshot_group_fills, GroupFill};
pub use namespace::NamespaceSource;
