//! Connection targets.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// The link-local network number (169.254.0.0).
pub const LINK_LOCAL_NETWORK: Ipv4Addr = Ipv4Addr::new(169, 254, 0, 0);

/// What a reachability monitor watches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConnectionTarget {
    /// A host name, resolved by the backend whenever flags are read.
    Host(String),
    /// A socket address. Only the IP part matters for reachability.
    Address(SocketAddr),
}

impl ConnectionTarget {
    /// The "any route" sentinel (`0.0.0.0`), reachable whenever there is a
    /// default route.
    pub fn internet() -> Self {
        Self::Address(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0))
    }

    /// The link-local sentinel (`169.254.0.0`), reachable whenever a local
    /// network is attached.
    pub fn local_network() -> Self {
        Self::Address(SocketAddr::new(IpAddr::V4(LINK_LOCAL_NETWORK), 0))
    }

    /// Returns `true` for the "any route" sentinel.
    pub fn is_internet(&self) -> bool {
        self.ip().is_some_and(|ip| ip.is_unspecified())
    }

    /// Returns `true` for the link-local sentinel.
    pub fn is_local_network(&self) -> bool {
        self.ip() == Some(IpAddr::V4(LINK_LOCAL_NETWORK))
    }

    /// The IP address for address targets.
    pub fn ip(&self) -> Option<IpAddr> {
        match self {
            ConnectionTarget::Host(_) => None,
            ConnectionTarget::Address(addr) => Some(addr.ip()),
        }
    }

    /// The host name for host targets.
    pub fn host(&self) -> Option<&str> {
        match self {
            ConnectionTarget::Host(name) => Some(name),
            ConnectionTarget::Address(_) => None,
        }
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionTarget::Host(name) => write!(f, "{name}"),
            ConnectionTarget::Address(addr) => write!(f, "{}", addr.ip()),
        }
    }
}

impl From<SocketAddr> for ConnectionTarget {
    fn from(addr: SocketAddr) -> Self {
        Self::Address(addr)
    }
}

impl From<IpAddr> for ConnectionTarget {
    fn from(ip: IpAddr) -> Self {
        Self::Address(SocketAddr::new(ip, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels() {
        let internet = ConnectionTarget::internet();
        assert!(internet.is_internet());
        assert!(!internet.is_local_network());
        assert_eq!(internet.to_string(), "0.0.0.0");

        let local = ConnectionTarget::local_network();
        assert!(local.is_local_network());
        assert!(!local.is_internet());
        assert_eq!(local.to_string(), "169.254.0.0");
    }

    #[test]
    fn host_target() {
        let target = ConnectionTarget::Host("example.com".into());
        assert_eq!(target.host(), Some("example.com"));
        assert_eq!(target.ip(), None);
        assert!(!target.is_internet());
        assert_eq!(target.to_string(), "example.com");
    }

    #[test]
    fn unspecified_v6_is_internet() {
        let target = ConnectionTarget::from("::".parse::<IpAddr>().unwrap());
        assert!(target.is_internet());
    }
}
