//! Environment-driven node configuration.

use std::env;

/// Everything the node reads from the environment.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// `PORT` — listen port.
    pub port: u16,
    /// `BASE_PATH` — URL prefix behind a path-based load balancer.
    pub base_path: Option<String>,
    /// `FOODBLOCK_SERVER_NAME` — federation display name.
    pub server_name: String,
    /// `FOODBLOCK_SERVER_URL` — this server's public URL.
    pub server_url: String,
    /// `FEDERATION_PRIVATE_KEY` — hex Ed25519 seed; ephemeral when absent.
    pub federation_private_key: Option<String>,
    /// `FEDERATION_PUBLIC_KEY` — expected public key, checked against the
    /// one derived from the private seed.
    pub federation_public_key: Option<String>,
    /// `FOODBLOCK_PEERS` — comma-separated peer base URLs.
    pub peers: Vec<String>,
    /// `LOG_LEVEL` — error|warn|info|debug.
    pub log_level: String,
    /// `TEST` — suppresses the HTTP rate limiter.
    pub test_mode: bool,
    /// `AGENT_MASTER_KEY` — server-side agent key encryption, when enabled.
    pub agent_master_key: Option<String>,
    /// `DATABASE_URL` — external database; this build runs the in-memory
    /// reference engine.
    pub database_url: Option<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            base_path: None,
            server_name: "foodblock".to_string(),
            server_url: "http://localhost:3000".to_string(),
            federation_private_key: None,
            federation_public_key: None,
            peers: Vec::new(),
            log_level: "info".to_string(),
            test_mode: false,
            agent_master_key: None,
            database_url: None,
        }
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl NodeConfig {
    /// Read the recognized environment variables over the defaults.
    pub fn from_env() -> Result<Self, String> {
        let mut config = Self::default();

        if let Some(port) = non_empty("PORT") {
            config.port = port
                .parse()
                .map_err(|_| format!("PORT is not a port number: {port}"))?;
        }
        config.base_path = non_empty("BASE_PATH");
        if let Some(name) = non_empty("FOODBLOCK_SERVER_NAME") {
            config.server_name = name;
        }
        config.server_url = non_empty("FOODBLOCK_SERVER_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", config.port));
        config.federation_private_key = non_empty("FEDERATION_PRIVATE_KEY");
        config.federation_public_key = non_empty("FEDERATION_PUBLIC_KEY");
        if let Some(peers) = non_empty("FOODBLOCK_PEERS") {
            config.peers = peers
                .split(',')
                .map(|p| p.trim().trim_end_matches('/').to_string())
                .filter(|p| !p.is_empty())
                .collect();
        }
        if let Some(level) = non_empty("LOG_LEVEL") {
            if !matches!(level.as_str(), "error" | "warn" | "info" | "debug") {
                return Err(format!("LOG_LEVEL must be error|warn|info|debug, got {level}"));
            }
            config.log_level = level;
        }
        config.test_mode = non_empty("TEST")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        config.agent_master_key = non_empty("AGENT_MASTER_KEY");
        config.database_url = non_empty("DATABASE_URL");

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert!(!config.test_mode);
        assert!(config.peers.is_empty());
    }
}
