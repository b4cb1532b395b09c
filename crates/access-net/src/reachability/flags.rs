//! Reachability flags and their translation into a [`NetworkStatus`].

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Snapshot of the connection-state bits reported for a target.
///
/// The bit values are the ones documented for the operating system's
/// reachability facility, so raw values obtained from it can be wrapped with
/// [`ReachabilityFlags::from_bits`] unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ReachabilityFlags(u32);

impl ReachabilityFlags {
    /// The connection is transient, such as PPP or a VPN tunnel.
    pub const TRANSIENT_CONNECTION: Self = Self(1 << 0);
    /// A route to the target exists.
    pub const REACHABLE: Self = Self(1 << 1);
    /// A connection must be established before the target is reachable.
    pub const CONNECTION_REQUIRED: Self = Self(1 << 2);
    /// The connection is brought up automatically on any traffic.
    pub const CONNECTION_ON_TRAFFIC: Self = Self(1 << 3);
    /// User action (password, VPN prompt) is needed to bring up the connection.
    pub const INTERVENTION_REQUIRED: Self = Self(1 << 4);
    /// The connection is brought up on demand by the networking stack.
    pub const CONNECTION_ON_DEMAND: Self = Self(1 << 5);
    /// The target is an address assigned to this host.
    pub const IS_LOCAL_ADDRESS: Self = Self(1 << 16);
    /// Traffic to the target does not go through a gateway.
    pub const IS_DIRECT: Self = Self(1 << 17);
    /// The route goes over a cellular (WWAN) interface.
    pub const IS_WWAN: Self = Self(1 << 18);

    /// No flags set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Wrap raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// The raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if any bit of `other` is set.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns `true` if no bit is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Set the bits of `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clear the bits of `other`.
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for ReachabilityFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ReachabilityFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ReachabilityFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for ReachabilityFlags {
    /// Renders the compact form `"WR ctiCDld"`, with `-` for absent bits.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = |flag: Self, c: char| if self.contains(flag) { c } else { '-' };
        write!(
            f,
            "{}{} {}{}{}{}{}{}{}",
            mark(Self::IS_WWAN, 'W'),
            mark(Self::REACHABLE, 'R'),
            mark(Self::CONNECTION_REQUIRED, 'c'),
            mark(Self::TRANSIENT_CONNECTION, 't'),
            mark(Self::INTERVENTION_REQUIRED, 'i'),
            mark(Self::CONNECTION_ON_TRAFFIC, 'C'),
            mark(Self::CONNECTION_ON_DEMAND, 'D'),
            mark(Self::IS_LOCAL_ADDRESS, 'l'),
            mark(Self::IS_DIRECT, 'd'),
        )
    }
}

/// How a target can currently be reached.
///
/// The discriminants match the classic reachability API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum NetworkStatus {
    /// No usable route.
    Unreachable = 0,
    /// Reachable over a cellular (WWAN) interface.
    ReachableViaCellular = 1,
    /// Reachable over WiFi, Ethernet or any other local transport.
    ReachableViaWiFi = 2,
}

impl NetworkStatus {
    /// Translate a flags snapshot into a status.
    ///
    /// A route that needs a connection first still counts as reachable when
    /// the connection comes up by itself (on demand, on traffic or as a
    /// transient link) and no user intervention is needed. Cellular routes
    /// count only when `cellular_counts_as_reachable` is set.
    pub fn from_flags(flags: ReachabilityFlags, cellular_counts_as_reachable: bool) -> Self {
        if !flags.contains(ReachabilityFlags::REACHABLE) {
            return Self::Unreachable;
        }

        if flags.contains(ReachabilityFlags::CONNECTION_REQUIRED) {
            let automatic = flags.intersects(
                ReachabilityFlags::CONNECTION_ON_DEMAND
                    | ReachabilityFlags::CONNECTION_ON_TRAFFIC
                    | ReachabilityFlags::TRANSIENT_CONNECTION,
            );
            if !automatic || flags.contains(ReachabilityFlags::INTERVENTION_REQUIRED) {
                return Self::Unreachable;
            }
        }

        if flags.contains(ReachabilityFlags::IS_WWAN) {
            if cellular_counts_as_reachable {
                Self::ReachableViaCellular
            } else {
                Self::Unreachable
            }
        } else {
            Self::ReachableViaWiFi
        }
    }

    /// Returns `true` for either reachable variant.
    pub fn is_reachable(self) -> bool {
        self != Self::Unreachable
    }
}

impl fmt::Display for NetworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkStatus::Unreachable => write!(f, "No Connection"),
            NetworkStatus::ReachableViaCellular => write!(f, "Cellular"),
            NetworkStatus::ReachableViaWiFi => write!(f, "WiFi"),
        }
    }
}
