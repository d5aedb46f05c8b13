use std::time::Duration;

use anyhow::{Context, Result};

use super::SnapshotSource;

/// Implicit TLS port of the printer's FTP server.
pub const FTPS_PORT: u16 = 990;
const USERNAME: &str = "bblp";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Reads the printer's SD card over implicit FTPS.
///
/// Every call is a single `curl` run that logs in, does one transfer and
/// disconnects. The printer's certificate is self-signed, so it is not
/// verified.
#[derive(Debug, Clone)]
pub struct FtpsSource {
    host: String,
    port: u16,
    access_code: String,
    connect_timeout: Duration,
}

impl FtpsSource {
    /// A source for the printer at `host`.
    pub fn new(host: impl Into<String>, access_code: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: FTPS_PORT,
            access_code: access_code.into(),
            connect_timeout: CONNECT_TIMEOUT,
        }
    }

    /// Use a port other than 990.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// How long to wait for the control connection.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> Result<url::Url> {
        let mut url = url::Url::parse(&format!("ftps://{}:{}/", self.host, self.port))
            .with_context(|| format!("invalid printer address {}", self.host))?;
        url.set_path(path);
        Ok(url)
    }

    fn args(&self, url: &url::Url) -> Vec<String> {
        vec![
            "--silent".to_string(),
            "--show-error".to_string(),
            "--insecure".to_string(),
            "--ftp-pasv".to_string(),
            "--connect-timeout".to_string(),
            self.connect_timeout.as_secs().max(1).to_string(),
            "--user".to_string(),
            format!("{}:{}", USERNAME, self.access_code),
            url.to_string(),
        ]
    }

    async fn run(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.url(path)?;
        tracing::debug!(%url, "ftps request");

        let output = tokio::process::Command::new("curl")
            .args(self.args(&url))
            .kill_on_drop(true)
            .output()
            .await
            .context("failed to run curl")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("ftps {} failed ({}): {}", path, output.status, stderr.trim());
        }

        Ok(output.stdout)
    }
}

impl SnapshotSource for FtpsSource {
    async fn list(&self, directory: &str) -> Result<Vec<String>> {
        // A trailing slash makes curl send LIST instead of RETR.
        let path = format!("{}/", directory.trim_end_matches('/'));
        let stdout = self.run(&path).await?;

        Ok(String::from_utf8_lossy(&stdout)
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn retrieve(&self, path: &str) -> Result<Vec<u8>> {
        self.run(path).await
    }
}
