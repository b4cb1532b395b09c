//! Connectivity probe tests against local listeners.

use std::time::Duration;

use access_net::reachability::{ProbeConfig, probe_internet};
use tokio::net::TcpListener;

#[tokio::test]
async fn test_probe_succeeds_against_listener() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let config = ProbeConfig::default()
        .endpoints(vec![addr])
        .timeout(Duration::from_secs(2));

    assert!(probe_internet(&config).await);
}

#[tokio::test]
async fn test_probe_falls_through_to_next_endpoint() {
    let closed = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let open = listener.local_addr().unwrap();

    let config = ProbeConfig::default()
        .endpoints(vec![closed])
        .endpoint(open)
        .timeout(Duration::from_secs(2));

    assert!(probe_internet(&config).await);
}

#[tokio::test]
async fn test_probe_without_endpoints_fails() {
    let config = ProbeConfig::default().endpoints(Vec::new());
    assert!(!probe_internet(&config).await);
}

#[test]
fn test_default_config() {
    let config = ProbeConfig::default();
    assert_eq!(config.endpoints.len(), 3);
    assert_eq!(config.timeout, Duration::from_secs(5));
}
