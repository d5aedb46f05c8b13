//! The Bambu MQTT client.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use rumqttc::{mqttbytes::QoS, ConnectReturnCode, ConnectionError};

use crate::{
    command::Command,
    parser::{parse_report, Report},
};

/// The port printers serve MQTT over TLS on.
pub const MQTT_PORT: u16 = 8883;
const MAX_PACKET_SIZE: usize = 1024 * 1024;
const USERNAME: &str = "bblp";

/// How the broker's certificate is checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsMode {
    /// Accept whatever certificate the printer presents.
    #[default]
    Insecure,
    /// Verify the printer against the CA certificate(s) in this PEM file.
    CaFile(PathBuf),
}

/// The outcome of waiting for a report.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    /// The first report published after subscribing.
    Received(Report),
    /// Nothing arrived within the wait window.
    TimedOut(Duration),
}

/// A one-shot client for the printer's local broker.
///
/// Every call opens its own connection, waits for one report and hangs up,
/// so there is no background task and no state shared between calls.
#[derive(Debug, Clone)]
pub struct Client {
    /// The IP address or hostname of the MQTT host.
    pub host: String,
    /// The broker port.
    pub port: u16,
    /// The access code.
    pub access_code: String,
    /// The serial number. Without it the client listens on every device's
    /// report topic and cannot ask the printer to push its status.
    pub serial: Option<String>,
    /// Certificate handling.
    pub tls: TlsMode,
}

impl Client {
    /// Creates a new Bambu printer MQTT client.
    pub fn new<S: Into<String>>(host: S, access_code: S) -> Self {
        Self {
            host: host.into(),
            port: MQTT_PORT,
            access_code: access_code.into(),
            serial: None,
            tls: TlsMode::default(),
        }
    }

    /// Target a specific printer.
    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    /// Use a non-standard broker port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Change how the broker certificate is checked.
    pub fn with_tls(mut self, tls: TlsMode) -> Self {
        self.tls = tls;
        self
    }

    /// The topic reports are read from.
    pub fn report_topic(&self) -> String {
        match &self.serial {
            Some(serial) => format!("device/{}/report", serial),
            None => "device/+/report".to_string(),
        }
    }

    /// The topic requests are published to, when the serial is known.
    pub fn request_topic(&self) -> Option<String> {
        self.serial.as_ref().map(|serial| format!("device/{}/request", serial))
    }

    fn get_config(&self) -> Result<rumqttc::MqttOptions> {
        let client_id = format!("bambu-probe-{}", nanoid::nanoid!(8));

        let transport = match &self.tls {
            TlsMode::Insecure => rumqttc::Transport::Tls(rumqttc::TlsConfiguration::Rustls(Arc::new(
                crate::tls::insecure_client_config()?,
            ))),
            TlsMode::CaFile(path) => rumqttc::Transport::Tls(rumqttc::TlsConfiguration::Rustls(Arc::new(
                crate::tls::ca_file_client_config(path)?,
            ))),
        };

        let mut opts = rumqttc::MqttOptions::new(client_id, &self.host, self.port);
        opts.set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE);
        opts.set_keep_alive(Duration::from_secs(5));
        opts.set_credentials(USERNAME, &self.access_code);
        opts.set_transport(transport);

        Ok(opts)
    }

    /// Connect, subscribe to the report topic, ask for a full status push
    /// when the serial is known, and wait at most `wait` for the first
    /// report.
    ///
    /// # Errors
    ///
    /// Returns an error if the broker refuses the connection or the
    /// connection fails before a report arrives. Silence is not an error; it
    /// is reported as [`ReportOutcome::TimedOut`].
    pub async fn fetch_report(&self, wait: Duration) -> Result<ReportOutcome> {
        let opts = self.get_config()?;
        let (client, mut event_loop) = rumqttc::AsyncClient::new(opts, 25);

        let report_topic = self.report_topic();
        client.subscribe(&report_topic, QoS::AtMostOnce).await?;
        tracing::debug!(topic = report_topic, "subscribed");

        if let Some(request_topic) = self.request_topic() {
            let command = Command::push_all();
            let payload = serde_json::to_string(&command)?;
            client
                .publish(&request_topic, QoS::AtMostOnce, false, payload)
                .await?;
            tracing::debug!(topic = request_topic, "requested pushall");
        }

        let first_report = async {
            loop {
                let event = event_loop.poll().await.map_err(describe_connection_error)?;
                if let Some(report) = parse_report(&event) {
                    return Ok::<_, anyhow::Error>(report);
                }
                tracing::trace!("mqtt event: {:?}", event);
            }
        };

        let outcome = match tokio::time::timeout(wait, first_report).await {
            Ok(report) => ReportOutcome::Received(report?),
            Err(_) => {
                tracing::debug!(host = self.host, "no report within {:?}", wait);
                ReportOutcome::TimedOut(wait)
            }
        };

        // Give the event loop one chance to flush the DISCONNECT.
        if client.disconnect().await.is_ok() {
            let _ = tokio::time::timeout(Duration::from_millis(250), event_loop.poll()).await;
        }

        Ok(outcome)
    }
}

fn describe_connection_error(err: ConnectionError) -> anyhow::Error {
    match err {
        ConnectionError::ConnectionRefused(ConnectReturnCode::BadUserNamePassword) => {
            anyhow::anyhow!("broker rejected the credentials; check the access code")
        }
        ConnectionError::ConnectionRefused(ConnectReturnCode::NotAuthorized) => {
            anyhow::anyhow!("broker refused the connection: not authorized")
        }
        ConnectionError::ConnectionRefused(code) => {
            anyhow::anyhow!("broker refused the connection: {:?}", code)
        }
        err => anyhow::Error::new(err).context("MQTT connection failed"),
    }
}
