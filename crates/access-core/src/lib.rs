//! Core primitives for Access.
//!
//! This crate provides the pieces shared by the reachability crates:
//!
//! - **Signals**: multi-listener callbacks behind the process-wide
//!   "reachability changed" broadcast
//! - **Logging**: Target names for filtering `tracing` output by subsystem
//!
//! # Example
//!
//! ```
//! use access_core::Signal;
//!
//! let reachable = Signal::<bool>::new();
//! let id = reachable.connect(|&up| println!("network {}", if up { "up" } else { "down" }));
//! reachable.emit(true);
//! reachable.disconnect(id);
//! ```

pub mod logging;
pub mod signal;

pub use signal::{ConnectionGuard, ConnectionId, Signal};
