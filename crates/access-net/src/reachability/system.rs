//! Backend reading the host's interface table.

use std::net::{IpAddr, ToSocketAddrs};
use std::sync::Arc;

use access_core::logging::targets;
use parking_lot::Mutex;

use super::backend::{
    DeliveryThread, FlagsCallback, ReachabilityBackend, ReachabilityHandle, Subscription,
};
use super::flags::ReachabilityFlags;
use super::interface::NetworkSnapshot;
use super::target::ConnectionTarget;
use crate::error::{NetworkError, Result};

const MAX_HOSTNAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Reachability from the operating system's interfaces and routes.
///
/// Flags are derived from a fresh `netdev` snapshot on every read; change
/// notifications come from `netwatcher`, which uses the platform's native
/// interface-change API.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBackend;

impl SystemBackend {
    /// Create the system backend.
    pub fn new() -> Self {
        Self
    }
}

impl ReachabilityBackend for SystemBackend {
    fn open(&self, target: &ConnectionTarget) -> Result<Arc<dyn ReachabilityHandle>> {
        if let ConnectionTarget::Host(name) = target {
            validate_hostname(name).map_err(|reason| NetworkError::resolution(name.as_str(), reason))?;
        }

        tracing::debug!(target: targets::BACKEND, watched = %target, "opened system reachability handle");
        Ok(Arc::new(SystemHandle {
            target: target.clone(),
        }))
    }
}

struct SystemHandle {
    target: ConnectionTarget,
}

impl ReachabilityHandle for SystemHandle {
    fn flags(&self) -> Option<ReachabilityFlags> {
        Some(evaluate(&self.target))
    }

    fn subscribe(&self, on_change: FlagsCallback) -> Result<Subscription> {
        let target = self.target.clone();
        let last = Arc::new(Mutex::new(evaluate(&target)));
        let delivery = DeliveryThread::new();
        let watcher_delivery = delivery.clone();

        // Dropping the watch handle joins the watcher thread.
        let handle = netwatcher::watch_interfaces(move |_update| {
            watcher_delivery.mark();
            let flags = evaluate(&target);
            {
                let mut last = last.lock();
                if *last == flags {
                    return;
                }
                *last = flags;
            }
            tracing::trace!(target: targets::BACKEND, watched = %target, %flags, "interface change altered flags");
            on_change(flags);
        })
        .map_err(|e| NetworkError::Registration(e.to_string()))?;

        Ok(Subscription::joining(delivery, move || drop(handle)))
    }
}

/// Evaluate the current flags for `target`.
fn evaluate(target: &ConnectionTarget) -> ReachabilityFlags {
    let snapshot = NetworkSnapshot::capture();
    match target {
        ConnectionTarget::Address(_) if target.is_local_network() => snapshot.local_network_flags(),
        ConnectionTarget::Address(addr) => snapshot.flags_for(addr.ip()),
        ConnectionTarget::Host(name) => {
            let addresses = resolve(name);
            if addresses.is_empty() {
                tracing::trace!(target: targets::BACKEND, host = %name, "host did not resolve");
            }
            addresses
                .into_iter()
                .map(|ip| snapshot.flags_for(ip))
                .find(|flags| flags.contains(ReachabilityFlags::REACHABLE))
                .unwrap_or_default()
        }
    }
}

/// Resolve through the system resolver, the same one the OS facility uses.
fn resolve(name: &str) -> Vec<IpAddr> {
    match (name, 0).to_socket_addrs() {
        Ok(addrs) => addrs.map(|addr| addr.ip()).collect(),
        Err(_) => Vec::new(),
    }
}

/// Check that `name` is an IP literal or a syntactically valid host name.
fn validate_hostname(name: &str) -> std::result::Result<(), String> {
    if name.parse::<IpAddr>().is_ok() {
        return Ok(());
    }
    if name.is_empty() {
        return Err("host name is empty".to_string());
    }
    if name.len() > MAX_HOSTNAME_LEN {
        return Err(format!("host name exceeds {MAX_HOSTNAME_LEN} bytes"));
    }

    let trimmed = name.strip_suffix('.').unwrap_or(name);
    for label in trimmed.split('.') {
        if label.is_empty() || label.len() > MAX_LABEL_LEN {
            return Err(format!("invalid label length in '{name}'"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(format!("label '{label}' starts or ends with '-'"));
        }
        if let Some(c) = label
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(format!("invalid character {c:?} in '{name}'"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_names() {
        for name in ["example.com", "localhost", "a-b.c_d.example.", "10.0.0.1", "::1"] {
            assert!(validate_hostname(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_invalid_names() {
        let long_label = "a".repeat(64);
        let long_name = vec!["abc"; 70].join(".");
        for name in [
            "",
            "exa mple.com",
            "-example.com",
            "example-.com",
            "example..com",
            long_label.as_str(),
            long_name.as_str(),
        ] {
            assert!(validate_hostname(name).is_err(), "{name}");
        }
    }

    #[test]
    fn open_rejects_invalid_host() {
        let err = SystemBackend::new()
            .open(&ConnectionTarget::Host("bad host".into()))
            .err()
            .unwrap();
        assert!(matches!(err, NetworkError::Resolution { .. }));
    }

    #[test]
    fn loopback_address_is_local() {
        let handle = SystemBackend::new()
            .open(&ConnectionTarget::from("127.0.0.1".parse::<IpAddr>().unwrap()))
            .unwrap();
        let flags = handle.flags().unwrap();
        if flags.contains(ReachabilityFlags::REACHABLE) {
            assert!(flags.contains(ReachabilityFlags::IS_LOCAL_ADDRESS));
        }
    }
}
