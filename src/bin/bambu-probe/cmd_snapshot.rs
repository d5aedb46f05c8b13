use std::{path::PathBuf, process::ExitCode, time::Duration};

use anyhow::Result;
use bambu_probe::{
    config::parse_print_start,
    snapshot::{fetch_latest, DirectorySink},
    Config, ValidityWindow,
};
use bambulabs::ReportOutcome;
use chrono::NaiveDateTime;

use crate::printer::{Printer, PrinterArgs};

/// Download the latest camera snapshot from the printer's SD card.
#[derive(clap::Args, Debug, Clone)]
pub struct CmdSnapshot {
    #[clap(flatten)]
    pub printer: PrinterArgs,

    /// Directory to save into.
    #[clap(long, short)]
    pub output_dir: Option<PathBuf>,

    /// Local start time of the current print (`YYYY-MM-DD HH:MM:SS`).
    #[clap(long, value_parser = parse_print_start)]
    pub print_start: Option<NaiveDateTime>,

    /// Expected print duration in minutes.
    #[clap(long)]
    pub duration_minutes: Option<u32>,

    /// Ask the printer for the current job's start and remaining time.
    #[clap(long)]
    pub from_status: bool,

    /// Seconds to wait for the status report with `--from-status`.
    #[clap(long, default_value_t = 10)]
    pub wait: u64,
}

impl CmdSnapshot {
    async fn window(&self, printer: &Printer, cfg: &Config, now: NaiveDateTime) -> Result<ValidityWindow> {
        if self.from_status {
            let outcome = printer
                .mqtt_client(true)
                .fetch_report(Duration::from_secs(self.wait))
                .await?;
            let window = match &outcome {
                ReportOutcome::Received(report) => report
                    .message
                    .push_status()
                    .and_then(|status| ValidityWindow::from_status(status, now)),
                ReportOutcome::TimedOut(_) => None,
            };
            match window {
                Some(window) => return Ok(window),
                None => tracing::warn!("no job timing in the printer status, falling back"),
            }
        }

        let file = cfg.snapshot.clone().unwrap_or_default();
        let start = match self.print_start {
            Some(start) => Some(start),
            None => file.print_start()?,
        };
        let duration = self.duration_minutes.or(file.print_duration_minutes);

        Ok(ValidityWindow::from_anchor(start, duration))
    }

    pub async fn run(&self, cfg: &Config) -> Result<ExitCode> {
        let printer = self.printer.resolve(cfg)?;
        let now = chrono::Local::now().naive_local();

        let window = self.window(&printer, cfg, now).await?;
        println!("Selection: {}", window);

        let output_dir = self
            .output_dir
            .clone()
            .or_else(|| cfg.snapshot.as_ref().and_then(|s| s.output_dir.clone()))
            .unwrap_or_else(|| PathBuf::from("."));
        let sink = DirectorySink::new(output_dir);

        let Some(snapshot) = fetch_latest(&printer.ftps_source(), &sink, &window, now).await? else {
            println!("No valid camera snapshots found.");
            println!("Make sure the camera is on and recording is enabled in the printer settings.");
            return Ok(ExitCode::FAILURE);
        };

        println!(
            "Snapshot {} ({} bytes), taken {} ({} min ago)",
            snapshot.filename,
            snapshot.data.len(),
            snapshot.timestamp.format("%Y-%m-%d %H:%M:%S"),
            snapshot.age(now).num_minutes()
        );
        if !snapshot.is_jpeg() {
            tracing::warn!(file = %snapshot.filename, "downloaded file does not look like a JPEG");
        }
        for path in &snapshot.saved {
            println!("  saved {}", path.display());
        }

        Ok(ExitCode::SUCCESS)
    }
}
