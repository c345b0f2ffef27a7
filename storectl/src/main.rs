mod cli;
mod cmd_balance;
mod cmd_fmd;
mod cmd_fsck;
mod cmd_key;
mod cmd_rebalance;
mod error;
mod ns_fmd;
mod sandbox;
mod topology;

use clap::Parser;

use cli::{BalanceCommands, Cli, Commands, FmdCommands, FsckCommands, KeyCommands, RebalanceCommands};
use sandbox::Sandbox;

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();

    if let Err(e) = run(cli) {
        eprintln!("storectl: error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> error::Result<()> {
    let sandbox = Sandbox::new(&cli.sandbox);
    sandbox.ensure()?;
    let fmd_db = sandbox.fmd_db_dir();

    match cli.command {
        Commands::Key { command } => match command {
            KeyCommands::Set { base64, expiry } => cmd_key::set(&sandbox, &base64, expiry),
            KeyCommands::List => cmd_key::list(&sandbox),
            KeyCommands::Current => cmd_key::current(&sandbox),
        },
        Commands::Fmd { command } => match command {
            FmdCommands::Open { fsid, writable } => cmd_fmd::open(&sandbox, fsid, writable),
            FmdCommands::ResyncDisk { fsid, mount_prefix, flag_layout_error } => {
                cmd_fmd::resync_disk(&sandbox, fsid, &mount_prefix, flag_layout_error)
            }
            FmdCommands::ResyncMgm { fsid, dump_file } => cmd_fmd::resync_mgm(&sandbox, fsid, &dump_file),
            FmdCommands::Stat { fsid } => cmd_fmd::stat(&sandbox, fsid),
            FmdCommands::Dump { fsid } => cmd_fmd::dump(&sandbox, fsid),
        },
        Commands::Fsck { command } => match command {
            FsckCommands::Enable => cmd_fsck::enable(&sandbox),
            FsckCommands::Disable => cmd_fsck::disable(&sandbox),
            FsckCommands::Report { replies_file, show_offline } => {
                cmd_fsck::report(&sandbox, &fmd_db, replies_file.as_deref(), show_offline)
            }
        },
        Commands::Rebalance { command } => match command {
            RebalanceCommands::RunOnce { space, threshold, ntx } => {
                cmd_rebalance::run_once(&sandbox, &fmd_db, &space, threshold, ntx)
            }
        },
        Commands::Balance { command } => match command {
            BalanceCommands::Schedule { target, free, mgm_manager } => {
                cmd_balance::schedule(&sandbox, &fmd_db, target, free, &mgm_manager)
            }
        },
    }
}
