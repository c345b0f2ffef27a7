use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Sandbox directory holding the fmd db, topology, and key material.
    #[arg(long, global = true, default_value = "./storectl-sandbox")]
    pub sandbox: String,

    /// Raises the logging verbosity (repeatable).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Symmetric-key store operations.
    Key {
        #[command(subcommand)]
        command: KeyCommands,
    },
    /// Per-FST metadata store operations.
    Fmd {
        #[command(subcommand)]
        command: FmdCommands,
    },
    /// MGM-side consistency checker operations.
    Fsck {
        #[command(subcommand)]
        command: FsckCommands,
    },
    /// Replica-placement rebalancer.
    Rebalance {
        #[command(subcommand)]
        command: RebalanceCommands,
    },
    /// Balance-transfer pull endpoint.
    Balance {
        #[command(subcommand)]
        command: BalanceCommands,
    },
}

#[derive(Subcommand)]
pub enum KeyCommands {
    /// Installs a new key, making it current.
    Set {
        /// Base64-encoded 20-byte key.
        #[arg(long)]
        base64: String,
        /// Unix expiry timestamp (0 = never expires).
        #[arg(long, default_value_t = 0)]
        expiry: u64,
    },
    /// Lists every key in the sandbox.
    List,
    /// Shows the current key.
    Current,
}

#[derive(Subcommand)]
pub enum FmdCommands {
    /// Attaches an fsid's table, detecting an unclean prior close.
    Open {
        #[arg(long)]
        fsid: u32,
        #[arg(long)]
        writable: bool,
    },
    /// Walks a disk mount prefix and merges observed attributes.
    ResyncDisk {
        #[arg(long)]
        fsid: u32,
        #[arg(long)]
        mount_prefix: String,
        #[arg(long)]
        flag_layout_error: bool,
    },
    /// Merges a `dumpmd`-style JSON reply file into the local store.
    ResyncMgm {
        #[arg(long)]
        fsid: u32,
        #[arg(long)]
        dump_file: String,
    },
    /// Prints the inconsistency-statistics summary for an fsid.
    Stat {
        #[arg(long)]
        fsid: u32,
    },
    /// Dumps every record held for an fsid as JSON.
    Dump {
        #[arg(long)]
        fsid: u32,
    },
}

#[derive(Subcommand)]
pub enum FsckCommands {
    /// Enables periodic collection.
    Enable,
    /// Disables periodic collection.
    Disable,
    /// Runs one collection cycle and prints the report.
    Report {
        /// File of broadcast reply lines (`err_tag=<fsid>:<fid1>,<fid2>`).
        #[arg(long)]
        replies_file: Option<String>,
        #[arg(long, default_value_t = true)]
        show_offline: bool,
    },
}

#[derive(Subcommand)]
pub enum RebalanceCommands {
    /// Runs one balancer + drainer cycle over a space.
    RunOnce {
        #[arg(long)]
        space: String,
        #[arg(long, default_value_t = 0.05)]
        threshold: f64,
        #[arg(long, default_value_t = 10)]
        ntx: usize,
    },
}

#[derive(Subcommand)]
pub enum BalanceCommands {
    /// Requests one balancing transfer job for a target fsid.
    Schedule {
        #[arg(long)]
        target: u32,
        #[arg(long)]
        free: u64,
        #[arg(long, default_value = "mgm.example.invalid:1094")]
        mgm_manager: String,
    },
}
