//! Network reachability for Access.
//!
//! This crate tells an application whether a host, an address or the
//! internet at large is reachable, over which kind of link, and when that
//! changes:
//!
//! - **Reachability monitor**: [`Reachability`] with synchronous queries and
//!   start/stop change notification
//! - **Flag translation**: [`ReachabilityFlags`] to [`NetworkStatus`]
//! - **Broadcast**: [`reachability::reachability_changed`] for observers that
//!   do not own a monitor
//! - **Connectivity probe**: [`reachability::probe_internet`] for an active
//!   TCP check
//!
//! # Example
//!
//! ```ignore
//! use access_net::{NetworkStatus, Reachability};
//!
//! let monitor = Reachability::for_host("example.com")?;
//!
//! match monitor.status() {
//!     NetworkStatus::ReachableViaWiFi => println!("on WiFi"),
//!     NetworkStatus::ReachableViaCellular => println!("on cellular"),
//!     NetworkStatus::Unreachable => println!("offline"),
//! }
//!
//! monitor.on_reachable(|m| println!("{} is back", m.target()));
//! monitor.start()?;
//! ```

mod error;
pub mod reachability;

pub use error::{NetworkError, Result};

// Re-export commonly used types at the crate root
pub use reachability::{
    ConnectionTarget, NetworkStatus, Reachability, ReachabilityBuilder, ReachabilityFlags,
};
