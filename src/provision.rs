//! Registering a printer with the companion touch display over its web API.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const PRINTERS_PATH: &str = "/api/printers";

/// A printer as the display stores it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PrinterEntry {
    /// Display name.
    pub name: String,
    /// Printer address.
    pub ip_address: String,
    /// The access code.
    pub token: String,
    /// The serial number.
    pub serial: String,
    /// Whether the display should connect to it.
    pub enabled: bool,
    /// Printers use self-signed certificates, so this is normally set.
    pub disable_ssl_verify: bool,
}

impl PrinterEntry {
    /// An enabled entry with certificate checks off.
    pub fn new(
        name: impl Into<String>,
        ip_address: impl Into<String>,
        token: impl Into<String>,
        serial: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            ip_address: ip_address.into(),
            token: token.into(),
            serial: serial.into(),
            enabled: true,
            disable_ssl_verify: true,
        }
    }
}

/// The configuration file fragment to add by hand when the API can't be
/// used.
pub fn manual_config(entry: &PrinterEntry) -> serde_json::Value {
    serde_json::json!({ "printers": [entry] })
}

/// What happened to an add request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The display accepted the printer.
    Configured,
    /// The API is up but refused the entry.
    Rejected {
        /// HTTP status of the POST.
        status: u16,
        /// Response body.
        body: String,
    },
    /// The printer list could not be read, so nothing was sent.
    Unavailable {
        /// HTTP status of the GET.
        status: u16,
    },
}

/// Handle to a display's web API.
#[derive(Debug, Clone)]
pub struct DisplayClient {
    url_base: url::Url,
    client: reqwest::Client,
}

impl DisplayClient {
    /// A client for the display at `host` (optionally with `:port`).
    pub fn new(host: &str) -> Result<Self> {
        let url_base = url::Url::parse(&format!("http://{}/", host.trim_end_matches('/')))
            .with_context(|| format!("invalid display address {}", host))?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building http client")?;

        Ok(Self { url_base, client })
    }

    /// The printer list endpoint.
    pub fn printers_url(&self) -> Result<url::Url> {
        Ok(self.url_base.join(PRINTERS_PATH)?)
    }

    /// Check that the API answers, then post `entry` to it.
    ///
    /// Transport errors (refused connection, timeout) are returned as errors;
    /// HTTP level failures come back as an outcome.
    pub async fn add_printer(&self, entry: &PrinterEntry) -> Result<ProvisionOutcome> {
        let url = self.printers_url()?;

        let existing = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("cannot reach display at {}", url))?;
        if existing.status() != reqwest::StatusCode::OK {
            tracing::warn!(status = %existing.status(), "printer list unavailable");
            return Ok(ProvisionOutcome::Unavailable {
                status: existing.status().as_u16(),
            });
        }
        tracing::debug!(%url, "display api available");

        let response = self
            .client
            .post(url.clone())
            .json(entry)
            .send()
            .await
            .with_context(|| format!("posting printer to {}", url))?;

        let status = response.status();
        if status == reqwest::StatusCode::OK {
            return Ok(ProvisionOutcome::Configured);
        }

        let body = response.text().await.unwrap_or_default();
        Ok(ProvisionOutcome::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
