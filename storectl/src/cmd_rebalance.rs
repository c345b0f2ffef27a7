//! `storectl rebalance run-once --space`.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::SeedableRng;

use rebalance::{balance_once, drain_once, BalancerConfig, DrainerConfig};

use crate::error::Result;
use crate::ns_fmd::FmdNamespace;
use crate::sandbox::Sandbox;

pub fn run_once(sandbox: &Sandbox, fmd_db: &std::path::Path, space: &str, threshold: f64, ntx: usize) -> Result<()> {
    let topology: crate::topology::TopologyFile =
        crate::sandbox::load_json(&sandbox.topology_file())?;
    let view = crate::topology::build_view(&topology)?;

    let store = fmd::FmdStore::open_db(fmd_db)?;
    let fsids: Vec<u32> = topology.filesystems.iter().map(|def| def.id).collect();
    for &fsid in &fsids {
        let _ = store.open(fsid, true);
    }
    let ns = FmdNamespace::new(&store, fsids);

    let space_def = topology
        .spaces
        .iter()
        .find(|s| s.name == space)
        .ok_or_else(|| crate::error::CliError::Msg(format!("no space named {space} in topology")))?;

    let mut scheduled = HashSet::new();
    let mut rng = StdRng::from_entropy();
    let balance_cfg = BalancerConfig {
        space: space.to_string(),
        threshold,
        ntx,
        converter_on: space_def.converter,
        is_master: true,
    };
    let balance_jobs = balance_once(&balance_cfg, &view, &ns, &mut scheduled, &mut rng)?;
    for job in &balance_jobs {
        println!("balance: {}", job.proc_name());
    }

    let drain_cfg = DrainerConfig {
        space: space.to_string(),
        converter_on: space_def.converter,
        is_master: true,
        page_size: 1024,
    };
    let drain_jobs = drain_once(&drain_cfg, &view, &ns)?;
    for job in &drain_jobs {
        println!("drain: {}", job.proc_name());
    }

    println!(
        "{} balance job(s), {} drain job(s)",
        balance_jobs.len(),
        drain_jobs.len()
    );
    Ok(())
}
