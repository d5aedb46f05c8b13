use std::{process::ExitCode, time::Duration};

use anyhow::Result;
use bambu_probe::{status::PrinterModel, Config};
use bambulabs::ReportOutcome;

use crate::printer::PrinterArgs;

/// Find out a printer's serial number from the topic of its first report.
#[derive(clap::Args, Debug, Clone)]
pub struct CmdSerial {
    #[clap(flatten)]
    pub printer: PrinterArgs,

    /// Seconds to wait for a report.
    #[clap(long, default_value_t = 10)]
    pub wait: u64,
}

impl CmdSerial {
    pub async fn run(&self, cfg: &Config) -> Result<ExitCode> {
        let printer = self.printer.resolve(cfg)?;

        println!("Connecting to {}:{}...", printer.host, printer.mqtt_port);
        let outcome = printer
            .mqtt_client(false)
            .fetch_report(Duration::from_secs(self.wait))
            .await?;

        let report = match outcome {
            ReportOutcome::Received(report) => report,
            ReportOutcome::TimedOut(wait) => {
                println!("No report within {} seconds.", wait.as_secs());
                println!("Check the access code and that LAN mode is enabled on the printer.");
                return Ok(ExitCode::FAILURE);
            }
        };

        let Some(serial) = report.serial.clone() else {
            anyhow::bail!("report arrived on unexpected topic {}", report.topic);
        };

        println!("Found printer serial: {}", serial);
        if let Some(model) = PrinterModel::from_serial(&serial) {
            println!("  Model: {}", model);
        }
        if let Some(name) = report
            .print_object()
            .and_then(|print| print.get("name"))
            .and_then(|name| name.as_str())
        {
            println!("  Printer name: {}", name);
        }

        let mut printer = printer;
        printer.serial = Some(serial);
        println!();
        println!("Config file section:");
        println!();
        let section = Config {
            printer: Some(printer.to_config()),
            ..Default::default()
        };
        print!("{}", toml::to_string(&section)?);

        Ok(ExitCode::SUCCESS)
    }
}
