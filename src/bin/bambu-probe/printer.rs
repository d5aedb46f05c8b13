use std::path::PathBuf;

use anyhow::Result;
use bambu_probe::{config::PrinterConfig, snapshot::FtpsSource, Config};
use bambulabs::{Client, TlsMode};

/// Which printer to talk to. Flags win over the environment, which wins
/// over the `[printer]` section of the config file.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct PrinterArgs {
    /// Printer hostname or IP address.
    #[clap(long, env = "BAMBU_HOST")]
    pub host: Option<String>,

    /// LAN access code.
    #[clap(long, env = "BAMBU_ACCESS_CODE", hide_env_values = true)]
    pub access_code: Option<String>,

    /// Printer serial number.
    #[clap(long, env = "BAMBU_SERIAL")]
    pub serial: Option<String>,

    /// CA bundle to verify the printer certificate against.
    #[clap(long)]
    pub ca_file: Option<PathBuf>,
}

/// A fully resolved printer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Printer {
    pub host: String,
    pub access_code: String,
    pub serial: Option<String>,
    pub mqtt_port: u16,
    pub ftp_port: u16,
    pub ca_file: Option<PathBuf>,
}

impl PrinterArgs {
    pub fn resolve(&self, cfg: &Config) -> Result<Printer> {
        let file = cfg.printer.as_ref();

        let host = self
            .host
            .clone()
            .or_else(|| file.map(|p| p.host.clone()))
            .ok_or_else(|| anyhow::anyhow!("no printer host: pass --host, set BAMBU_HOST or add [printer] to the config"))?;
        let access_code = self
            .access_code
            .clone()
            .or_else(|| file.map(|p| p.access_code.clone()))
            .ok_or_else(|| {
                anyhow::anyhow!("no access code: pass --access-code, set BAMBU_ACCESS_CODE or add it to the config")
            })?;

        Ok(Printer {
            host,
            access_code,
            serial: self.serial.clone().or_else(|| file.and_then(|p| p.serial.clone())),
            mqtt_port: file.map_or(bambulabs::client::MQTT_PORT, |p| p.mqtt_port),
            ftp_port: file.map_or(bambu_probe::snapshot::FTPS_PORT, |p| p.ftp_port),
            ca_file: self.ca_file.clone().or_else(|| file.and_then(|p| p.ca_file.clone())),
        })
    }
}

impl Printer {
    /// MQTT client for this printer. `with_serial` controls whether the
    /// serial is used to target the printer.
    pub fn mqtt_client(&self, with_serial: bool) -> Client {
        let mut client = Client::new(self.host.clone(), self.access_code.clone()).with_port(self.mqtt_port);
        if let (true, Some(serial)) = (with_serial, &self.serial) {
            client = client.with_serial(serial.clone());
        }
        if let Some(ca_file) = &self.ca_file {
            client = client.with_tls(TlsMode::CaFile(ca_file.clone()));
        }
        client
    }

    pub fn ftps_source(&self) -> FtpsSource {
        FtpsSource::new(self.host.clone(), self.access_code.clone()).with_port(self.ftp_port)
    }

    /// The config section describing this printer.
    pub fn to_config(&self) -> PrinterConfig {
        PrinterConfig {
            host: self.host.clone(),
            access_code: self.access_code.clone(),
            serial: self.serial.clone(),
            mqtt_port: self.mqtt_port,
            ftp_port: self.ftp_port,
            ca_file: self.ca_file.clone(),
        }
    }
}
