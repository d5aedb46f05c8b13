use std::{path::PathBuf, process::ExitCode, time::Duration};

use anyhow::{Context, Result};
use bambu_probe::{
    status::{describe_fields, extract_printer_info, StatusSummary},
    Config,
};
use bambulabs::ReportOutcome;

use crate::printer::PrinterArgs;

/// Read one status report from a printer.
#[derive(clap::Args, Debug, Clone)]
pub struct CmdStatus {
    #[clap(flatten)]
    pub printer: PrinterArgs,

    /// Seconds to wait for a report.
    #[clap(long, default_value_t = 10)]
    pub wait: u64,

    /// List the top-level fields of the report.
    #[clap(long)]
    pub fields: bool,

    /// Write the raw report JSON to this file.
    #[clap(long)]
    pub save: Option<PathBuf>,
}

impl CmdStatus {
    pub async fn run(&self, cfg: &Config) -> Result<ExitCode> {
        let printer = self.printer.resolve(cfg)?;
        if printer.serial.is_none() {
            tracing::warn!("no serial given, waiting for the printer's own periodic report");
        }

        println!("Connecting to {}:{}...", printer.host, printer.mqtt_port);
        let report = match printer.mqtt_client(true).fetch_report(Duration::from_secs(self.wait)).await? {
            ReportOutcome::Received(report) => report,
            ReportOutcome::TimedOut(wait) => {
                println!("Timeout after {} seconds, no data received.", wait.as_secs());
                return Ok(ExitCode::FAILURE);
            }
        };

        println!("Topic: {}", report.topic);
        if let Some(serial) = &report.serial {
            println!("Serial: {}", serial);
        }
        println!("Payload size: {} bytes", report.payload_len);

        if self.fields {
            if let Some(raw) = &report.raw {
                println!();
                println!("Available fields in report:");
                for line in describe_fields(raw) {
                    println!("  {}", line);
                }
            }
        }

        if let Some(status) = report.message.push_status() {
            println!();
            println!("--- Printer Status ---");
            println!("{}", StatusSummary(status));
        }

        println!();
        println!("Extracted Printer Info:");
        for (key, value) in extract_printer_info(&report, &printer.host) {
            println!("  {}: {}", key, value);
        }

        if let Some(path) = &self.save {
            let raw = report.raw.as_ref().context("report payload is not JSON")?;
            tokio::fs::write(path, serde_json::to_vec_pretty(raw)?)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            println!();
            println!("Saved report to {}", path.display());
        }

        Ok(ExitCode::SUCCESS)
    }
}
