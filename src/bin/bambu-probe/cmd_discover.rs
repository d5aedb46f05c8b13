use std::{process::ExitCode, time::Duration};

use anyhow::Result;
use bambu_probe::discover::{local_subnet, scan_subnet, ScanOptions};
use ipnet::Ipv4Net;

/// Scan a subnet for printers.
#[derive(clap::Args, Debug, Clone)]
pub struct CmdDiscover {
    /// Network to scan in CIDR notation. Defaults to the /24 of this
    /// machine's outbound address.
    pub subnet: Option<Ipv4Net>,

    /// Probes in flight at once.
    #[clap(long, default_value_t = 50)]
    pub concurrency: usize,

    /// Connect timeout per probe, in milliseconds.
    #[clap(long, default_value_t = 500)]
    pub timeout_ms: u64,
}

impl CmdDiscover {
    pub async fn run(&self) -> Result<ExitCode> {
        let net = match self.subnet {
            Some(net) => net,
            None => local_subnet().await?,
        };
        let options = ScanOptions {
            concurrency: self.concurrency,
            timeout: Duration::from_millis(self.timeout_ms),
            ..Default::default()
        };

        println!("Scanning {} for Bambu Lab printers...", net);
        let found = scan_subnet(net, options).await?;

        if found.is_empty() {
            println!("No printers found.");
            println!("Check that the printer is powered on, in LAN mode, and on this network.");
            return Ok(ExitCode::FAILURE);
        }

        println!("Found {} printer(s):", found.len());
        for printer in &found {
            let ftp = printer
                .ftp_port
                .map_or_else(|| "closed".to_string(), |port| port.to_string());
            println!("  {}  mqtt {}  ftps {}", printer.ip, printer.mqtt_port, ftp);
        }
        println!();
        println!("Next: bambu-probe serial --host {} --access-code <code>", found[0].ip);

        Ok(ExitCode::SUCCESS)
    }
}
