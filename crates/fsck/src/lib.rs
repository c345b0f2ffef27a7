//! MGM-side file-system consistency checker: broadcasts to FSTs, classifies
//! replica inconsistencies, and schedules repair work (§4.5).

mod collector;
mod error;
mod namespace;
mod report;
mod repair;
mod state;
mod tracker;

pub use collector::{
    flatten_class, is_fs_healthy, merge_reply, offline_fsids_from, parse_reply_line, run_cycle,
    ErrorMap, FsckReport,
};
pub use error::{FsckError, Result};
pub use namespace::NamespaceView;
pub use report::{render_json, render_monitor, FidExpand};
pub use repair::{dispatch_repairs, FsckEntry, RepairPool};
pub use state::{ConfigStore, FsckController, FsckState};
pub use tracker::Tracker;
