use std::process::ExitCode;

use anyhow::Result;
use bambu_probe::{
    provision::{manual_config, DisplayClient, PrinterEntry, ProvisionOutcome},
    status::PrinterModel,
    Config,
};

use crate::printer::PrinterArgs;

/// Register a printer with the companion display.
#[derive(clap::Args, Debug, Clone)]
pub struct CmdProvision {
    #[clap(flatten)]
    pub printer: PrinterArgs,

    /// Display hostname or IP address.
    #[clap(long, env = "BAMBU_DISPLAY")]
    pub display: Option<String>,

    /// Name to show on the display.
    #[clap(long)]
    pub name: Option<String>,
}

impl CmdProvision {
    pub async fn run(&self, cfg: &Config) -> Result<ExitCode> {
        let printer = self.printer.resolve(cfg)?;
        let serial = printer
            .serial
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no serial: run `bambu-probe serial` first, then pass --serial"))?;
        let display = self
            .display
            .clone()
            .or_else(|| cfg.display.as_ref().map(|d| d.host.clone()))
            .ok_or_else(|| anyhow::anyhow!("no display host: pass --display or add [display] to the config"))?;

        let name = self
            .name
            .clone()
            .or_else(|| cfg.display.as_ref().and_then(|d| d.name.clone()))
            .unwrap_or_else(|| match PrinterModel::from_serial(&serial) {
                Some(model) => format!("Bambu {}", model),
                None => "Bambu Printer".to_string(),
            });

        let entry = PrinterEntry::new(name, printer.host.clone(), printer.access_code.clone(), serial);

        println!("Configuring display at {}", display);
        println!("Printer: {} (Serial: {})", entry.ip_address, entry.serial);

        let outcome = match DisplayClient::new(&display)?.add_printer(&entry).await {
            Ok(outcome) => outcome,
            Err(err) => {
                println!("Cannot reach the display: {:#}", err);
                print_manual(&entry)?;
                return Ok(ExitCode::FAILURE);
            }
        };

        match outcome {
            ProvisionOutcome::Configured => {
                println!("Printer configured.");
                println!("Restart the display or wait for it to connect.");
                return Ok(ExitCode::SUCCESS);
            }
            ProvisionOutcome::Rejected { status, body } => {
                println!("Failed to add printer (HTTP {})", status);
                println!("  Response: {}", body);
            }
            ProvisionOutcome::Unavailable { status } => {
                println!("Display API returned {}", status);
            }
        }

        print_manual(&entry)?;
        Ok(ExitCode::FAILURE)
    }
}

fn print_manual(entry: &PrinterEntry) -> Result<()> {
    println!();
    println!("Manual configuration, add this to the display's config.json:");
    println!();
    println!("{}", serde_json::to_string_pretty(&manual_config(entry))?);
    Ok(())
}
