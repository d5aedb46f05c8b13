//! Finding printers on the local network by probing their service ports.
//!
//! Printers in LAN mode always listen for MQTT on 8883, so an open 8883 is
//! taken as "this is a printer". The FTPS port is checked afterwards for
//! information only.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use ipnet::Ipv4Net;
use serde::Serialize;
use tokio::net::{TcpStream, UdpSocket};

/// The smallest prefix length [`scan_subnet`] accepts.
pub const MIN_PREFIX_LEN: u8 = 16;

/// Knobs for a subnet scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Maximum probes in flight.
    pub concurrency: usize,
    /// How long a single connection attempt may take.
    pub timeout: Duration,
    /// Port that marks a host as a printer.
    pub mqtt_port: u16,
    /// Port probed on hosts that turned out to be printers.
    pub ftp_port: u16,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            concurrency: 50,
            timeout: Duration::from_millis(500),
            mqtt_port: bambulabs::client::MQTT_PORT,
            ftp_port: crate::snapshot::FTPS_PORT,
        }
    }
}

/// A host that answered on the MQTT port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FoundPrinter {
    /// Its address.
    pub ip: Ipv4Addr,
    /// The MQTT port that accepted.
    pub mqtt_port: u16,
    /// The FTPS port, if it accepted too.
    pub ftp_port: Option<u16>,
}

/// Whether a TCP connection to `ip:port` succeeds within `timeout`.
pub async fn is_port_open(ip: IpAddr, port: u16, timeout: Duration) -> bool {
    let addr = SocketAddr::new(ip, port);
    matches!(tokio::time::timeout(timeout, TcpStream::connect(addr)).await, Ok(Ok(_)))
}

/// Probe one address.
pub async fn probe_host(ip: Ipv4Addr, options: ScanOptions) -> Option<FoundPrinter> {
    if !is_port_open(IpAddr::V4(ip), options.mqtt_port, options.timeout).await {
        return None;
    }

    let ftp_open = is_port_open(IpAddr::V4(ip), options.ftp_port, options.timeout).await;
    tracing::debug!(%ip, ftp_open, "mqtt port open");

    Some(FoundPrinter {
        ip,
        mqtt_port: options.mqtt_port,
        ftp_port: ftp_open.then_some(options.ftp_port),
    })
}

/// Probe every host address of `net`, at most `options.concurrency` at a
/// time. Results are sorted by address.
pub async fn scan_subnet(net: Ipv4Net, options: ScanOptions) -> Result<Vec<FoundPrinter>> {
    if net.prefix_len() < MIN_PREFIX_LEN {
        anyhow::bail!("refusing to scan {}: prefix must be /{} or longer", net, MIN_PREFIX_LEN);
    }

    tracing::info!(%net, concurrency = options.concurrency, "scanning");

    let mut found: Vec<FoundPrinter> = stream::iter(net.hosts())
        .map(|ip| probe_host(ip, options))
        .buffer_unordered(options.concurrency.max(1))
        .filter_map(|res| async move { res })
        .collect()
        .await;

    found.sort_by_key(|printer| printer.ip);
    Ok(found)
}

/// The /24 around the address this machine uses for outbound traffic.
///
/// No packet is sent: connecting a UDP socket only selects a route.
pub async fn local_subnet() -> Result<Ipv4Net> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .await
        .context("binding udp socket")?;
    socket
        .connect((Ipv4Addr::new(8, 8, 8, 8), 80))
        .await
        .context("no route to determine the local address")?;

    match socket.local_addr()?.ip() {
        IpAddr::V4(ip) => Ok(Ipv4Net::new(ip, 24)?.trunc()),
        IpAddr::V6(ip) => anyhow::bail!("local address {} is not IPv4", ip),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use testresult::TestResult;
    use tokio::net::TcpListener;

    use super::*;

    fn unused_port() -> u16 {
        portpicker::pick_unused_port().expect("no free port")
    }

    fn options(mqtt_port: u16, ftp_port: u16) -> ScanOptions {
        ScanOptions {
            timeout: Duration::from_millis(200),
            mqtt_port,
            ftp_port,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_options() {
        let options = ScanOptions::default();
        assert_eq!(options.concurrency, 50);
        assert_eq!(options.timeout, Duration::from_millis(500));
        assert_eq!(options.mqtt_port, 8883);
        assert_eq!(options.ftp_port, 990);
    }

    #[tokio::test]
    async fn test_is_port_open() -> TestResult {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();

        assert!(is_port_open(IpAddr::V4(Ipv4Addr::LOCALHOST), port, Duration::from_millis(200)).await);
        assert!(!is_port_open(IpAddr::V4(Ipv4Addr::LOCALHOST), unused_port(), Duration::from_millis(200)).await);
        Ok(())
    }

    #[tokio::test]
    async fn test_probe_host_with_both_ports() -> TestResult {
        let mqtt = TcpListener::bind("127.0.0.1:0").await?;
        let ftp = TcpListener::bind("127.0.0.1:0").await?;
        let options = options(mqtt.local_addr()?.port(), ftp.local_addr()?.port());

        let found = probe_host(Ipv4Addr::LOCALHOST, options).await;

        assert_eq!(
            found,
            Some(FoundPrinter {
                ip: Ipv4Addr::LOCALHOST,
                mqtt_port: options.mqtt_port,
                ftp_port: Some(options.ftp_port),
            })
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_probe_host_without_ftp() -> TestResult {
        let mqtt = TcpListener::bind("127.0.0.1:0").await?;
        let options = options(mqtt.local_addr()?.port(), unused_port());

        let found = probe_host(Ipv4Addr::LOCALHOST, options).await;

        assert_eq!(found.map(|p| p.ftp_port), Some(None));
        Ok(())
    }

    #[tokio::test]
    async fn test_probe_host_not_a_printer() {
        assert_eq!(probe_host(Ipv4Addr::LOCALHOST, options(unused_port(), unused_port())).await, None);
    }

    #[tokio::test]
    async fn test_scan_single_host() -> TestResult {
        let mqtt = TcpListener::bind("127.0.0.1:0").await?;
        let options = options(mqtt.local_addr()?.port(), unused_port());

        let found = scan_subnet("127.0.0.1/32".parse()?, options).await?;

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].ip, Ipv4Addr::LOCALHOST);
        Ok(())
    }

    #[tokio::test]
    async fn test_scan_rejects_huge_networks() -> TestResult {
        assert!(scan_subnet("10.0.0.0/8".parse()?, ScanOptions::default()).await.is_err());
        Ok(())
    }
}
