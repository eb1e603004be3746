//! Connectivity Probing Abstraction
//!
//! Answers a single question: can the remote service's network be reached right
//! now. Used to gate login and catalog refresh attempts.

use async_trait::async_trait;

/// Connectivity prober trait
///
/// A probe is a short-lived reachability check against a fixed well-known
/// endpoint. Implementations must not retry internally and must never surface
/// errors: timeouts, DNS failures and any other fault all mean `false`.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::network::ConnectivityProbe;
///
/// async fn wait_online(probe: &dyn ConnectivityProbe) {
///     while !probe.probe().await {
///         tokio::time::sleep(std::time::Duration::from_secs(10)).await;
///     }
/// }
/// ```
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Returns `true` when the well-known endpoint answered
    async fn probe(&self) -> bool;
}

/// Probe with a fixed answer, for hosts that track connectivity themselves.
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe(pub bool);

#[async_trait]
impl ConnectivityProbe for StaticProbe {
    async fn probe(&self) -> bool {
        self.0
    }
}
