//! CLI command definitions and subcommands

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// c0 - submit commands to a remote executor and collect their results
#[derive(Parser, Debug)]
#[command(
    name = "c0",
    about = "Submit commands to a remote executor over a shared Redis queue",
    version,
    after_help = "Logs are written to stderr; set RUST_LOG to adjust the filter."
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Redis host (overrides config)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Redis port (overrides config)
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Redis password (overrides config)
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Redis database index (overrides config)
    #[arg(long, global = true)]
    pub db: Option<i64>,

    /// Seconds to wait for a result (0 waits forever)
    #[arg(short, long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Submit an arbitrary command and print its result
    Raw {
        /// Command verb, e.g. `info.os`
        command: String,

        /// Arguments as a JSON object
        #[arg(value_name = "JSON")]
        arguments: Option<String>,

        /// Print the correlation ID and exit without waiting
        #[arg(long)]
        no_wait: bool,
    },

    /// Run a process on the executor
    System {
        /// Command line, split with shell quoting rules
        cmdline: String,

        /// Working directory
        #[arg(long, default_value = "")]
        dir: String,

        /// Data written to the process's stdin
        #[arg(long, default_value = "")]
        stdin: String,

        /// Print the correlation ID and exit without waiting
        #[arg(long)]
        no_wait: bool,
    },

    /// Run a bash script on the executor
    Bash {
        script: String,

        /// Print the correlation ID and exit without waiting
        #[arg(long)]
        no_wait: bool,
    },

    /// Wait on an existing correlation ID
    Result {
        id: String,
    },

    /// Query host information
    Info {
        #[arg(value_enum)]
        kind: InfoKind,
    },

    /// Manage containers
    Container {
        #[command(subcommand)]
        command: ContainerCommand,
    },

    /// Manage network bridges
    Bridge {
        #[command(subcommand)]
        command: BridgeCommand,
    },
}

/// Host information categories
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InfoKind {
    Cpu,
    Nic,
    Mem,
    Disk,
    Os,
}

/// Container subcommands
#[derive(Subcommand, Debug)]
pub enum ContainerCommand {
    /// List running containers
    List,

    /// Create a container and print its ID
    Create {
        /// URL of the root filesystem plist
        plist: String,

        /// Bind mount, repeatable
        #[arg(long = "mount", value_name = "SRC:DST", value_parser = parse_mount)]
        mounts: Vec<(String, String)>,

        /// ZeroTier network to join
        #[arg(long)]
        zerotier: Option<String>,

        /// Bridge to attach to, repeatable
        #[arg(long = "bridge", value_name = "NAME")]
        bridges: Vec<String>,
    },

    /// Terminate a container
    Terminate {
        id: u16,
    },

    /// Run a process inside a container
    System {
        id: u16,

        cmdline: String,
    },
}

/// Bridge subcommands
#[derive(Subcommand, Debug)]
pub enum BridgeCommand {
    /// List bridges
    List,

    /// Create a bridge
    Create {
        name: String,

        /// MAC address of the bridge
        #[arg(long)]
        hwaddr: Option<String>,
    },

    /// Delete a bridge
    Delete {
        name: String,
    },
}

/// Parse a `src:dst` mount pair
pub fn parse_mount(s: &str) -> Result<(String, String), String> {
    match s.split_once(':') {
        Some((src, dst)) if !src.is_empty() && !dst.is_empty() => Ok((src.to_string(), dst.to_string())),
        _ => Err(format!("Invalid mount: {}. Use: SRC:DST", s)),
    }
}
