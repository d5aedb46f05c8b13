//! Command line diagnostics for Bambu Lab printers.

use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use bambu_probe::Config;
use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;

mod cmd_discover;
mod cmd_provision;
mod cmd_serial;
mod cmd_snapshot;
mod cmd_status;
mod printer;

/// Config file read when `--config` is not given, if it exists.
const DEFAULT_CONFIG: &str = "bambu-probe.toml";

/// Find, query and configure Bambu Lab printers on the local network.
#[derive(Parser, Debug, Clone)]
#[clap(version = clap::crate_version!(), author = clap::crate_authors!("\n"))]
pub struct Opts {
    /// Print debug info
    #[clap(short, long)]
    pub debug: bool,

    /// Print logs as json
    #[clap(short, long)]
    pub json: bool,

    /// Path to config file.
    #[clap(short, long, env = "BAMBU_PROBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// The subcommand to run.
    #[clap(subcommand)]
    pub subcmd: SubCommand,
}

impl Opts {
    /// Load the config file. A missing default file means an empty config; a
    /// missing explicit one is an error.
    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::from_file(path),
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG);
                if path.exists() {
                    Config::from_file(&path)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }
}

/// A subcommand for our cli.
#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// Scan a subnet for printers.
    Discover(cmd_discover::CmdDiscover),
    /// Read one status report from a printer.
    Status(cmd_status::CmdStatus),
    /// Find out a printer's serial number.
    Serial(cmd_serial::CmdSerial),
    /// Download the latest camera snapshot.
    Snapshot(cmd_snapshot::CmdSnapshot),
    /// Register a printer with the companion display.
    Provision(cmd_provision::CmdProvision),
}

fn init_tracing(opts: &Opts) {
    let default_level = if opts.debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let (json, plain) = if opts.json {
        (Some(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)), None)
    } else {
        (
            None,
            Some(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr)),
        )
    };

    tracing_subscriber::registry().with(filter).with(json).with(plain).init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let opts = Opts::parse();
    init_tracing(&opts);

    let cfg = opts.load_config()?;

    match &opts.subcmd {
        SubCommand::Discover(cmd) => cmd.run().await,
        SubCommand::Status(cmd) => cmd.run(&cfg).await,
        SubCommand::Serial(cmd) => cmd.run(&cfg).await,
        SubCommand::Snapshot(cmd) => cmd.run(&cfg).await,
        SubCommand::Provision(cmd) => cmd.run(&cfg).await,
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Opts::command().debug_assert();
    }

    #[test]
    fn test_parse_snapshot() {
        let opts = Opts::try_parse_from([
            "bambu-probe",
            "--debug",
            "snapshot",
            "--host",
            "10.0.0.2",
            "--access-code",
            "abc",
            "--print-start",
            "2024-06-01 10:00:00",
            "--duration-minutes",
            "20",
        ])
        .unwrap();

        assert!(opts.debug);
        let SubCommand::Snapshot(cmd) = opts.subcmd else {
            panic!("expected snapshot");
        };
        assert_eq!(cmd.printer.host.as_deref(), Some("10.0.0.2"));
        assert_eq!(cmd.duration_minutes, Some(20));
    }
}
