//! Active connectivity probing.
//!
//! Reachability flags only say that a route exists. The probe actually opens
//! TCP connections to well-known endpoints.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use access_core::logging::targets;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Configuration for [`probe_internet`].
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Endpoints tried in order until one accepts a connection.
    pub endpoints: Vec<SocketAddr>,
    /// Timeout for each connection attempt.
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![
                SocketAddr::new(IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)), 80), // Cloudflare
                SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 53), // Google DNS
                SocketAddr::new(IpAddr::V4(Ipv4Addr::new(208, 67, 222, 222)), 53), // OpenDNS
            ],
            timeout: Duration::from_secs(5),
        }
    }
}

impl ProbeConfig {
    /// Set the per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the endpoint list.
    pub fn endpoints(mut self, endpoints: Vec<SocketAddr>) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Append one endpoint.
    pub fn endpoint(mut self, endpoint: SocketAddr) -> Self {
        self.endpoints.push(endpoint);
        self
    }
}

/// Check actual internet connectivity.
///
/// Returns `true` as soon as one endpoint accepts a TCP connection.
///
/// # Example
///
/// ```ignore
/// use access_net::reachability::{probe_internet, ProbeConfig};
/// use std::time::Duration;
///
/// let config = ProbeConfig::default().timeout(Duration::from_secs(3));
/// if probe_internet(&config).await {
///     println!("Internet connection is available");
/// }
/// ```
pub async fn probe_internet(config: &ProbeConfig) -> bool {
    for &endpoint in &config.endpoints {
        match timeout(config.timeout, TcpStream::connect(endpoint)).await {
            Ok(Ok(_)) => {
                tracing::debug!(target: targets::PROBE, %endpoint, "probe succeeded");
                return true;
            }
            Ok(Err(e)) => {
                tracing::trace!(target: targets::PROBE, %endpoint, error = %e, "probe connection failed");
            }
            Err(_) => {
                tracing::trace!(target: targets::PROBE, %endpoint, "probe timed out");
            }
        }
    }
    false
}
