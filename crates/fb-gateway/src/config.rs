//! Gateway configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Tunables for the HTTP surface. `TEST=1` disables rate limiting so test
/// suites can hammer a local server.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Listen port.
    pub port: u16,
    /// Optional URL prefix stripped before routing (path-based LBs).
    pub base_path: Option<String>,
    /// Request body cap in bytes.
    pub body_limit: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Per-IP request budget per minute.
    pub rate_limit_per_minute: u32,
    /// Disables the rate limiter (TEST mode).
    pub rate_limit_disabled: bool,
    /// Maximum concurrent SSE connections per process.
    pub max_sse_connections: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            base_path: None,
            body_limit: 1024 * 1024,
            timeout_secs: 15,
            rate_limit_per_minute: 100,
            rate_limit_disabled: false,
            max_sse_connections: 256,
        }
    }
}

impl GatewayConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.body_limit == 0 {
            return Err("body_limit must be positive".to_string());
        }
        if self.rate_limit_per_minute == 0 && !self.rate_limit_disabled {
            return Err("rate_limit_per_minute must be positive".to_string());
        }
        if let Some(base) = &self.base_path {
            if !base.starts_with('/') || base.ends_with('/') {
                return Err("base_path must start with '/' and not end with one".to_string());
            }
        }
        Ok(())
    }

    /// The listen address.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(GatewayConfig::default().validate().is_ok());
    }

    #[test]
    fn test_base_path_shape() {
        let mut config = GatewayConfig {
            base_path: Some("/foodblock".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        config.base_path = Some("foodblock".to_string());
        assert!(config.validate().is_err());

        config.base_path = Some("/foodblock/".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_body_limit_is_one_mebibyte() {
        assert_eq!(GatewayConfig::default().body_limit, 1_048_576);
    }
}
