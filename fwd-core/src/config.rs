use std::time::Duration;

/// Policy values for address resolution and locally generated traffic.
///
/// Built the same way as the rest of the router's parts: start from `RouterConfig::default()`
/// and override what you need.
///
/// ```
/// use fwd_core::config::RouterConfig;
/// use std::time::Duration;
///
/// let config = RouterConfig::default()
///     .retry_interval(Duration::from_millis(500))
///     .max_attempts(3);
/// assert_eq!(config.max_attempts, 3);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct RouterConfig {
    /// How long a resolved IP to MAC mapping stays usable after the reply that taught it.
    pub entry_lifetime: Duration,
    /// Minimum time between two ARP requests for the same pending address.
    pub retry_interval: Duration,
    /// Requests sent for one address before its queued packets are answered with host
    /// unreachable errors.
    pub max_attempts: u32,
    /// How often the sweeper runs.
    pub sweep_period: Duration,
    /// TTL of ICMP messages the router originates.
    pub icmp_ttl: u8,
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            entry_lifetime: Duration::from_secs(15),
            retry_interval: Duration::from_secs(1),
            max_attempts: 5,
            sweep_period: Duration::from_secs(1),
            icmp_ttl: 64,
        }
    }
}

impl RouterConfig {
    pub fn entry_lifetime(self, entry_lifetime: Duration) -> Self {
        RouterConfig {
            entry_lifetime,
            ..self
        }
    }

    pub fn retry_interval(self, retry_interval: Duration) -> Self {
        RouterConfig {
            retry_interval,
            ..self
        }
    }

    pub fn max_attempts(self, max_attempts: u32) -> Self {
        assert!(max_attempts > 0, "max_attempts must allow at least one request");
        RouterConfig {
            max_attempts,
            ..self
        }
    }

    pub fn sweep_period(self, sweep_period: Duration) -> Self {
        RouterConfig {
            sweep_period,
            ..self
        }
    }

    pub fn icmp_ttl(self, icmp_ttl: u8) -> Self {
        RouterConfig { icmp_ttl, ..self }
    }
}
