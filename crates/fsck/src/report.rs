//! Monitor-text and JSON rendering of a [`FsckReport`] (§4.5 "Output
//! reports"), with optional fid→hex/fid→lfn expansion.

use serde::Serialize;

use crate::collector::FsckReport;
use crate::namespace::NamespaceView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FidExpand {
    Raw,
    Hex,
    Lfn,
}

fn expand_fid(fid: u64, expand: FidExpand, ns: Option<&dyn NamespaceView>) -> String {
    match expand {
        FidExpand::Raw => fid.to_string(),
        FidExpand::Hex => fid::fid_to_hex(fid),
        FidExpand::Lfn => ns
            .and_then(|ns| ns.fid_to_lfn(fid))
            .unwrap_or_else(|| fid::fid_to_hex(fid)),
    }
}

/// Renders per-fs lines for each broadcast class, then the aggregate
/// classes, as monitor text (`key=value` pairs, one line per class/fsid).
pub fn render_monitor(report: &FsckReport, expand: FidExpand, ns: Option<&dyn NamespaceView>) -> String {
    let mut lines = Vec::new();
    let mut tags: Vec<&String> = report.broadcast.keys().collect();
    tags.sort();
    for tag in tags {
        let by_fsid = &report.broadcast[tag];
        let mut fsids: Vec<&u32> = by_fsid.keys().collect();
        fsids.sort();
        for fsid in fsids {
            let mut fids: Vec<&u64> = by_fsid[fsid].iter().collect();
            fids.sort();
            let rendered: Vec<String> = fids.iter().map(|f| expand_fid(**f, expand, ns)).collect();
            lines.push(format!("err_tag={tag} fsid={fsid} fids={}", rendered.join(",")));
        }
    }
    for (name, set) in [
        ("rep_offline", &report.rep_offline),
        ("file_offline", &report.file_offline),
        ("adjust_replica", &report.adjust_replica),
        ("zero_replica", &report.zero_replica),
    ] {
        if set.is_empty() {
            continue;
        }
        let mut fids: Vec<&u64> = set.iter().collect();
        fids.sort();
        let rendered: Vec<String> = fids.iter().map(|f| expand_fid(**f, expand, ns)).collect();
        lines.push(format!("class={name} fids={}", rendered.join(",")));
    }
    lines.join("\n")
}

#[derive(Serialize)]
struct JsonReport {
    broadcast: Vec<JsonClassEntry>,
    rep_offline: Vec<String>,
    file_offline: Vec<String>,
    adjust_replica: Vec<String>,
    zero_replica: Vec<String>,
}

#[derive(Serialize)]
struct JsonClassEntry {
    err_tag: String,
    fsid: u32,
    fids: Vec<String>,
}

pub fn render_json(report: &FsckReport, expand: FidExpand, ns: Option<&dyn NamespaceView>) -> String {
    let mut broadcast = Vec::new();
    let mut tags: Vec<&String> = report.broadcast.keys().collect();
    tags.sort();
    for tag in tags {
        let by_fsid = &report.broadcast[tag];
        let mut fsids: Vec<&u32> = by_fsid.keys().collect();
        fsids.sort();
        for fsid in fsids {
            let mut fids: Vec<&u64> = by_fsid[fsid].iter().collect();
            fids.sort();
            broadcast.push(JsonClassEntry {
                err_tag: tag.clone(),
                fsid: *fsid,
                fids: fids.iter().map(|f| expand_fid(**f, expand, ns)).collect(),
            });
        }
    }
    let sorted = |set: &std::collections::HashSet<u64>| {
        let mut v: Vec<&u64> = set.iter().collect();
        v.sort();
        v.iter().map(|f| expand_fid(**f, expand, ns)).collect()
    };
    let out = JsonReport {
        broadcast,
        rep_offline: sorted(&report.rep_offline),
        file_offline: sorted(&report.file_offline),
        adjust_replica: sorted(&report.adjust_replica),
        zero_replica: sorted(&report.zero_replica),
    };
    serde_json::to_string_pretty(&out).expect("report serializes")
}
