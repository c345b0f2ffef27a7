//! `storectl balance schedule --target --free`.

use std::time::Duration;

use balance_sched::{AllowAll, BalanceScheduler, SchedulerConfig};
use symkey::{KeyInput, SymKeyStore};

use crate::error::{CliError, Result};
use crate::ns_fmd::FmdNamespace;
use crate::sandbox::Sandbox;

pub fn schedule(
    sandbox: &Sandbox,
    fmd_db: &std::path::Path,
    target_fsid: u32,
    freebytes: u64,
    mgm_manager: &str,
) -> Result<()> {
    let topology: crate::topology::TopologyFile =
        crate::sandbox::load_json(&sandbox.topology_file())?;
    let view = crate::topology::build_view(&topology)?;

    let store = fmd::FmdStore::open_db(fmd_db)?;
    let fsids: Vec<u32> = topology.filesystems.iter().map(|def| def.id).collect();
    for &fsid in &fsids {
        let _ = store.open(fsid, true);
    }
    let ns = FmdNamespace::new(&store, fsids);

    let symkeys = SymKeyStore::new();
    let current_digest = std::fs::read_to_string(sandbox.keys_dir().join("current"))
        .map_err(|_| CliError::Msg("no current key installed; run `key set` first".into()))?;
    let stored: serde_json::Value = crate::sandbox::read_json(
        &sandbox.keys_dir().join(format!("{}.json", current_digest.trim().replace(['/', '+', '='], "_"))),
    )?;
    let raw_base64 = stored["base64"].as_str().ok_or_else(|| CliError::Msg("corrupt key file".into()))?;
    symkeys.set_key(KeyInput::Base64(raw_base64), 0)?;

    let scheduler = BalanceScheduler::new(
        SchedulerConfig {
            mgm_manager: mgm_manager.to_string(),
            capability_validity: Duration::from_secs(300),
            min_source_fill: 0.0,
            tracker_ttl: Duration::from_secs(600),
        },
        symkeys,
    );

    let job = scheduler.schedule2balance(target_fsid, freebytes, "sandbox-token", &AllowAll, &view, &ns)?;
    match job {
        Some(job) => {
            println!("scheduled fid={:#x}", job.fid);
            println!("source={}", job.source_url);
            println!("target={}", job.target_url);
        }
        None => println!("no eligible transfer found"),
    }
    Ok(())
}
