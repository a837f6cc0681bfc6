//! Configuration management for the gateway.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Main configuration for the gateway process.
///
/// Values may come from a TOML file; CLI flags override the file. Vendor
/// credentials are never configured here; they are fetched from MGS.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Metadata-cluster configuration.
    pub cluster: ClusterConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl GatewayConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(crate::Error::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed.
    pub fn parse(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| crate::Error::InvalidArgument(e.to_string()))
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the S3 frontend listens on.
    pub address: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:9000".parse().expect("valid default address"),
        }
    }
}

/// Metadata-cluster configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ClusterConfig {
    /// Address of the management service, `host:port`.
    pub mgs: String,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter, `RUST_LOG` syntax.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Text }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.server.address.port(), 9000);
        assert!(config.cluster.mgs.is_empty());
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_parse_partial() {
        let config = GatewayConfig::parse(
            r#"
            [server]
            address = "127.0.0.1:9100"

            [cluster]
            mgs = "10.0.0.5:8000"

            [logging]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.address.port(), 9100);
        assert_eq!(config.cluster.mgs, "10.0.0.5:8000");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(GatewayConfig::parse("server = 3").is_err());
    }
}
