//! Logging facilities for Access.
//!
//! Access uses the `tracing` crate for instrumentation. The library never
//! installs a subscriber; to see logs, install one in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("access_net::reachability=debug")
//!         .init();
//! }
//! ```

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Signal/slot system target.
    pub const SIGNAL: &str = "access_core::signal";
    /// Reachability monitor lifecycle and dispatch.
    pub const REACHABILITY: &str = "access_net::reachability";
    /// OS backends producing reachability flags.
    pub const BACKEND: &str = "access_net::reachability::backend";
    /// Active connectivity probing.
    pub const PROBE: &str = "access_net::reachability::probe";
}

#[cfg(test)]
mod tests {
    use super::targets;

    #[test]
    fn targets_are_nested_under_crate_names() {
        assert!(targets::SIGNAL.starts_with("access_core"));
        for target in [targets::REACHABILITY, targets::BACKEND, targets::PROBE] {
            assert!(target.starts_with("access_net::reachability"), "{target}");
        }
    }
}
