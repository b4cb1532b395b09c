//! Interface snapshots and the flags they imply for a target address.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use super::flags::ReachabilityFlags;

/// Interface name prefixes used by cellular modems across platforms.
const CELLULAR_PREFIXES: [&str; 5] = ["wwan", "wwp", "rmnet", "pdp_ip", "ccmni"];

/// Interface name prefixes of point-to-point links brought up on demand.
const POINT_TO_POINT_PREFIXES: [&str; 2] = ["ppp", "utun"];

/// IPv4 address assigned to an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Info {
    /// The IPv4 address.
    pub address: Ipv4Addr,
    /// Network prefix length (CIDR notation).
    pub prefix_len: u8,
}

impl Ipv4Info {
    fn netmask(&self) -> u32 {
        if self.prefix_len >= 32 {
            u32::MAX
        } else if self.prefix_len == 0 {
            0
        } else {
            !((1u32 << (32 - self.prefix_len)) - 1)
        }
    }

    /// Returns `true` if `addr` lies in this address's subnet.
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        let mask = self.netmask();
        u32::from(self.address) & mask == u32::from(addr) & mask
    }
}

/// IPv6 address assigned to an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv6Info {
    /// The IPv6 address.
    pub address: Ipv6Addr,
    /// Network prefix length.
    pub prefix_len: u8,
}

impl Ipv6Info {
    fn netmask(&self) -> u128 {
        if self.prefix_len >= 128 {
            u128::MAX
        } else if self.prefix_len == 0 {
            0
        } else {
            !((1u128 << (128 - self.prefix_len)) - 1)
        }
    }

    /// Returns `true` if `addr` lies in this address's subnet.
    pub fn contains(&self, addr: Ipv6Addr) -> bool {
        let mask = self.netmask();
        u128::from(self.address) & mask == u128::from(addr) & mask
    }
}

/// The parts of a network interface that matter for reachability.
#[derive(Debug, Clone)]
pub struct InterfaceSnapshot {
    /// Interface name (e.g., "eth0", "en0", "wwan0").
    pub name: String,
    /// Interface index.
    pub index: u32,
    /// Whether the interface is currently up.
    pub is_up: bool,
    /// Whether this is the loopback interface.
    pub is_loopback: bool,
    /// Whether this is a tunnel or point-to-point link.
    pub is_point_to_point: bool,
    /// IPv4 addresses assigned to this interface.
    pub ipv4_addresses: Vec<Ipv4Info>,
    /// IPv6 addresses assigned to this interface.
    pub ipv6_addresses: Vec<Ipv6Info>,
}

impl InterfaceSnapshot {
    fn from_netdev(iface: &netdev::Interface) -> Self {
        let ipv4_addresses = iface
            .ipv4
            .iter()
            .map(|net| Ipv4Info {
                address: net.addr(),
                prefix_len: net.prefix_len(),
            })
            .collect();

        let ipv6_addresses = iface
            .ipv6
            .iter()
            .map(|net| Ipv6Info {
                address: net.addr(),
                prefix_len: net.prefix_len(),
            })
            .collect();

        let is_point_to_point = iface.is_tun()
            || POINT_TO_POINT_PREFIXES
                .iter()
                .any(|prefix| iface.name.starts_with(prefix));

        InterfaceSnapshot {
            name: iface.name.clone(),
            index: iface.index,
            is_up: iface.is_up(),
            is_loopback: iface.is_loopback(),
            is_point_to_point,
            ipv4_addresses,
            ipv6_addresses,
        }
    }

    /// Whether the interface name belongs to a cellular modem.
    pub fn is_cellular(&self) -> bool {
        CELLULAR_PREFIXES
            .iter()
            .any(|prefix| self.name.starts_with(prefix))
    }

    /// Check if this interface has any IP addresses assigned.
    pub fn has_addresses(&self) -> bool {
        !self.ipv4_addresses.is_empty() || !self.ipv6_addresses.is_empty()
    }

    fn is_usable(&self) -> bool {
        self.is_up && self.has_addresses()
    }

    fn owns(&self, ip: IpAddr) -> bool {
        match ip {
            IpAddr::V4(v4) => self.ipv4_addresses.iter().any(|info| info.address == v4),
            IpAddr::V6(v6) => self.ipv6_addresses.iter().any(|info| info.address == v6),
        }
    }

    fn on_link(&self, ip: IpAddr) -> bool {
        match ip {
            IpAddr::V4(v4) => self.ipv4_addresses.iter().any(|info| info.contains(v4)),
            IpAddr::V6(v6) => self.ipv6_addresses.iter().any(|info| info.contains(v6)),
        }
    }

    fn transport_flags(&self) -> ReachabilityFlags {
        let mut flags = ReachabilityFlags::REACHABLE;
        if self.is_cellular() {
            flags |= ReachabilityFlags::IS_WWAN;
        }
        if self.is_point_to_point {
            flags |= ReachabilityFlags::TRANSIENT_CONNECTION;
        }
        flags
    }
}

/// The interface table at one point in time.
#[derive(Debug, Clone, Default)]
pub struct NetworkSnapshot {
    /// All interfaces on the system.
    pub interfaces: Vec<InterfaceSnapshot>,
    /// Index of the interface carrying the default route, if any.
    pub default_index: Option<u32>,
}

impl NetworkSnapshot {
    /// Capture the current interface table.
    pub fn capture() -> Self {
        let interfaces = netdev::get_interfaces()
            .iter()
            .map(InterfaceSnapshot::from_netdev)
            .collect();
        let default_index = netdev::get_default_interface().ok().map(|iface| iface.index);

        Self {
            interfaces,
            default_index,
        }
    }

    /// The interface carrying the default route.
    pub fn default_interface(&self) -> Option<&InterfaceSnapshot> {
        let index = self.default_index?;
        self.interfaces.iter().find(|iface| iface.index == index)
    }

    /// Flags for traffic that has to leave through the default route.
    pub fn default_route_flags(&self) -> ReachabilityFlags {
        match self.default_interface() {
            Some(iface) if iface.is_usable() && !iface.is_loopback => iface.transport_flags(),
            _ => ReachabilityFlags::empty(),
        }
    }

    /// Flags for the link-local network: any attached IPv4 network counts.
    pub fn local_network_flags(&self) -> ReachabilityFlags {
        let attached = self
            .interfaces
            .iter()
            .any(|iface| iface.is_up && !iface.is_loopback && !iface.ipv4_addresses.is_empty());
        if attached {
            ReachabilityFlags::REACHABLE | ReachabilityFlags::IS_DIRECT
        } else {
            ReachabilityFlags::empty()
        }
    }

    /// Flags for an arbitrary target address.
    pub fn flags_for(&self, ip: IpAddr) -> ReachabilityFlags {
        let local = ReachabilityFlags::REACHABLE
            | ReachabilityFlags::IS_LOCAL_ADDRESS
            | ReachabilityFlags::IS_DIRECT;

        if ip.is_loopback() {
            let loopback_up = self
                .interfaces
                .iter()
                .any(|iface| iface.is_loopback && iface.is_up);
            return if loopback_up {
                local
            } else {
                ReachabilityFlags::empty()
            };
        }

        if ip.is_unspecified() {
            return self.default_route_flags();
        }

        let up = || self.interfaces.iter().filter(|iface| iface.is_up);

        if up().any(|iface| iface.owns(ip)) {
            return local;
        }

        if let Some(iface) = up().find(|iface| !iface.is_loopback && iface.on_link(ip)) {
            return iface.transport_flags() | ReachabilityFlags::IS_DIRECT;
        }

        self.default_route_flags()
    }
}
