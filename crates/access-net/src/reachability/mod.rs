//! Network reachability monitoring.
//!
//! This module answers "can traffic to this target leave the machine right
//! now, and over which kind of link?" and reports changes as they happen.
//!
//! # Features
//!
//! - **Status queries**: Synchronous checks that re-read the flags each time
//! - **Change callbacks**: Per-monitor reachable/unreachable/flags callbacks
//! - **Broadcast notification**: A process-wide signal carrying the monitor
//! - **Pluggable backends**: The system backend, or a simulated one for tests
//!
//! # Example
//!
//! ```ignore
//! use access_net::reachability::{reachability_changed, Reachability};
//!
//! let internet = Reachability::for_internet()?;
//! println!("{} ({})", internet.status_description(), internet.flags_description());
//!
//! internet.on_unreachable(|_| println!("offline"));
//! internet.start()?;
//!
//! // Anyone can listen to every monitor
//! reachability_changed().connect(|monitor| {
//!     println!("{} changed: {}", monitor.target(), monitor.status());
//! });
//! ```

mod backend;
mod flags;
mod interface;
mod monitor;
mod probe;
mod simulated;
mod system;
mod target;

pub use backend::{
    DeliveryThread, FlagsCallback, ReachabilityBackend, ReachabilityHandle, Subscription,
};
pub use flags::{NetworkStatus, ReachabilityFlags};
pub use interface::{InterfaceSnapshot, Ipv4Info, Ipv6Info, NetworkSnapshot};
pub use monitor::{
    reachability_changed, Reachability, ReachabilityBuilder, REACHABILITY_CHANGED_NOTIFICATION,
};
pub use probe::{probe_internet, ProbeConfig};
pub use simulated::{SimulatedBackend, SimulatedHandle};
pub use system::SystemBackend;
pub use target::{ConnectionTarget, LINK_LOCAL_NETWORK};
