//! Advisory network reachability check.
//!
//! A negative answer saves a doomed connection attempt; a positive answer
//! guarantees nothing about the transfer that follows.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::debug;

/// Reports whether the host appears to be connected to a network.
#[async_trait]
pub trait ConnectivityCheck: Send + Sync {
    /// Returns `true` when an active, connected interface is available.
    async fn is_reachable(&self) -> bool;
}

/// Connectivity check based on the routing table.
///
/// Connecting a UDP socket sends nothing on the wire but fails with
/// "network unreachable" when no interface can route to the probe address.
#[derive(Debug, Clone)]
pub struct RouteProbe {
    targets: Vec<SocketAddr>,
}

impl Default for RouteProbe {
    fn default() -> Self {
        Self {
            targets: vec![
                SocketAddr::from((Ipv4Addr::new(1, 1, 1, 1), 53)),
                SocketAddr::from((Ipv6Addr::new(0x2606, 0x4700, 0x4700, 0, 0, 0, 0, 0x1111), 53)),
            ],
        }
    }
}

impl RouteProbe {
    /// Creates a probe using public resolver addresses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a probe against explicit targets; any routable one is enough.
    #[must_use]
    pub fn with_targets(targets: Vec<SocketAddr>) -> Self {
        Self { targets }
    }

    async fn routable(target: SocketAddr) -> bool {
        let bind_addr: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = match UdpSocket::bind(bind_addr).await {
            Ok(socket) => socket,
            Err(error) => {
                debug!(%target, error = %error, "cannot bind probe socket");
                return false;
            }
        };
        match socket.connect(target).await {
            Ok(()) => true,
            Err(error) => {
                debug!(%target, error = %error, "no route to probe target");
                false
            }
        }
    }
}

#[async_trait]
impl ConnectivityCheck for RouteProbe {
    async fn is_reachable(&self) -> bool {
        for target in &self.targets {
            if Self::routable(*target).await {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_loopback_target_is_reachable() {
        let probe = RouteProbe::with_targets(vec![SocketAddr::from((Ipv4Addr::LOCALHOST, 9))]);
        assert!(probe.is_reachable().await);
    }

    #[tokio::test]
    async fn test_no_targets_is_unreachable() {
        let probe = RouteProbe::with_targets(Vec::new());
        assert!(!probe.is_reachable().await);
    }

    #[tokio::test]
    async fn test_probe_is_usable_as_trait_object() {
        let checks: Vec<Box<dyn ConnectivityCheck>> = vec![
            Box::new(RouteProbe::with_targets(vec![SocketAddr::from((
                Ipv4Addr::LOCALHOST,
                9,
            ))])),
            Box::new(RouteProbe::with_targets(Vec::new())),
        ];
        let mut answers = Vec::new();
        for check in &checks {
            answers.push(check.is_reachable().await);
        }
        assert_eq!(answers, vec![true, false]);
    }
}
