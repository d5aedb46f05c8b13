//! Code for the configuration of the application.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The configuration of the application.
#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// The printer to talk to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub printer: Option<PrinterConfig>,
    /// Where and what to fetch for snapshots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SnapshotConfig>,
    /// The companion display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<DisplayConfig>,
}

impl Config {
    /// Parse a configuration from a toml file.
    pub fn from_file(file: &Path) -> Result<Self> {
        let config =
            std::fs::read_to_string(file).with_context(|| format!("reading config {}", file.display()))?;
        Self::from_str(&config)
    }

    /// Parse a configuration from a toml string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(config: &str) -> Result<Self> {
        Ok(toml::from_str(config)?)
    }
}

fn default_mqtt_port() -> u16 {
    8883
}

fn default_ftp_port() -> u16 {
    990
}

/// Connection details for a single printer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PrinterConfig {
    /// Hostname or IP address.
    pub host: String,
    /// The LAN access code shown on the printer's screen.
    pub access_code: String,
    /// The printer's serial number; needed to request a full status push.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    /// MQTT port.
    #[serde(default = "default_mqtt_port")]
    pub mqtt_port: u16,
    /// Implicit FTPS port.
    #[serde(default = "default_ftp_port")]
    pub ftp_port: u16,
    /// CA bundle to verify the printer's certificate with. Without one the
    /// certificate is not checked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_file: Option<PathBuf>,
}

/// Snapshot options.
#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SnapshotConfig {
    /// Directory downloaded snapshots are written to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// Local start time of the current print, as `YYYY-MM-DD HH:MM:SS`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_start: Option<String>,
    /// Expected length of the current print.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_duration_minutes: Option<u32>,
}

/// Accepted layouts for a print start time.
const START_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a local print start time.
pub fn parse_print_start(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    START_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| anyhow::anyhow!("invalid print start {:?}, expected YYYY-MM-DD HH:MM:SS", value))
}

impl SnapshotConfig {
    /// The configured print start, if any.
    pub fn print_start(&self) -> Result<Option<NaiveDateTime>> {
        self.print_start.as_deref().map(parse_print_start).transpose()
    }
}

/// The companion display.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DisplayConfig {
    /// Hostname or IP address of the display.
    pub host: String,
    /// The name the printer is registered under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn test_config_from_str_full() -> TestResult {
        let config = Config::from_str(
            r#"
            [printer]
            host = "192.168.1.50"
            access_code = "12345678"
            serial = "01P00A123456789"
            ca_file = "/etc/bambu/ca.pem"

            [snapshot]
            output_dir = "/tmp/snapshots"
            print_start = "2024-06-01 10:00:00"
            print_duration_minutes = 20

            [display]
            host = "display.local"
            name = "P1S"
        "#,
        )?;

        let printer = config.printer.as_ref().ok_or("no printer")?;
        assert_eq!(printer.host, "192.168.1.50");
        assert_eq!(printer.serial.as_deref(), Some("01P00A123456789"));
        assert_eq!(printer.mqtt_port, 8883);
        assert_eq!(printer.ftp_port, 990);
        assert_eq!(printer.ca_file, Some(PathBuf::from("/etc/bambu/ca.pem")));

        let snapshot = config.snapshot.as_ref().ok_or("no snapshot")?;
        assert_eq!(snapshot.print_duration_minutes, Some(20));
        assert_eq!(
            snapshot.print_start()?,
            NaiveDate::from_ymd_opt(2024, 6, 1).and_then(|d| d.and_hms_opt(10, 0, 0))
        );

        assert_eq!(
            config.display,
            Some(DisplayConfig {
                host: "display.local".to_string(),
                name: Some("P1S".to_string()),
            })
        );
        Ok(())
    }

    #[test]
    fn test_config_from_str_empty() -> TestResult {
        assert_eq!(Config::from_str("")?, Config::default());
        Ok(())
    }

    #[test]
    fn test_config_missing_access_code() {
        assert!(Config::from_str("[printer]\nhost = \"printer.local\"\n").is_err());
    }

    #[test]
    fn test_bad_print_start() {
        let snapshot = SnapshotConfig {
            print_start: Some("yesterday".to_string()),
            ..Default::default()
        };
        assert!(snapshot.print_start().is_err());
        assert!(parse_print_start("2024-06-01T10:00:00").is_ok());
    }

    #[test]
    fn test_config_from_file() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("bambu-probe.toml");
        std::fs::write(&path, "[display]\nhost = \"10.0.0.9\"\n")?;

        let config = Config::from_file(&path)?;

        assert_eq!(config.display.map(|d| d.host), Some("10.0.0.9".to_string()));
        assert!(Config::from_file(&dir.path().join("missing.toml")).is_err());
        Ok(())
    }

    #[test]
    fn test_config_serializes_without_empty_sections() -> TestResult {
        let config = Config {
            display: Some(DisplayConfig {
                host: "10.0.0.9".to_string(),
                name: None,
            }),
            ..Default::default()
        };
        assert_eq!(toml::to_string(&config)?, "[display]\nhost = \"10.0.0.9\"\n");
        Ok(())
    }
}
