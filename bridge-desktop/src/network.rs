//! Connectivity Probe Implementation

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    network::ConnectivityProbe,
};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Endpoint probed by default
pub const DEFAULT_PROBE_ENDPOINT: &str = "https://www.google.com/";

/// Probe configuration
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Well-known endpoint that must answer for the network to count as up
    pub endpoint: String,
    /// Upper bound for the whole round trip
    pub timeout: Duration,
    /// Optional HTTP proxy, e.g. `http://proxy.local:3128`
    pub proxy: Option<String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_PROBE_ENDPOINT.to_string(),
            timeout: Duration::from_secs(5),
            proxy: None,
        }
    }
}

impl ProbeConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }
}

/// Desktop connectivity probe
///
/// Issues a single GET against the configured endpoint. Any successful response
/// counts as reachable; timeouts, DNS errors, TLS errors and error statuses all
/// count as unreachable.
pub struct HttpConnectivityProbe {
    client: Client,
    endpoint: String,
}

impl HttpConnectivityProbe {
    /// Create a probe against [`DEFAULT_PROBE_ENDPOINT`]
    pub fn new() -> Result<Self> {
        Self::with_config(ProbeConfig::default())
    }

    pub fn with_config(config: ProbeConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .user_agent(concat!("catalog-core/", env!("CARGO_PKG_VERSION")));

        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| BridgeError::NotAvailable(format!("Invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("HTTP client unavailable: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ConnectivityProbe for HttpConnectivityProbe {
    async fn probe(&self) -> bool {
        let reachable = match self.client.get(&self.endpoint).send().await {
            Ok(response) => response.error_for_status().is_ok(),
            Err(e) => {
                debug!(endpoint = %self.endpoint, error = %e, "Connectivity probe failed");
                false
            }
        };

        debug!(endpoint = %self.endpoint, reachable, "Connectivity probe finished");
        reachable
    }
}
