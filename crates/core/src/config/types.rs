use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::compressor::CompressorConfig;
use crate::converter::ConverterConfig;
use crate::exporter::{ExporterBackend, ExporterConfig};
use crate::queue::QueueConfig;
use crate::storage::StorageConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub exporter: ExporterConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub compressor: CompressorConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub queue: QueueConfig,
    pub exporter: SanitizedExporterConfig,
    pub converter: ConverterConfig,
    pub compressor: CompressorConfig,
    pub storage: SanitizedStorageConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedExporterConfig {
    pub backend: ExporterBackend,
    pub sketchup_path: Option<PathBuf>,
    pub sdk_path: Option<PathBuf>,
    pub timeout_secs: u64,
    /// Strategy names, in the order they are tried.
    pub strategies: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedStorageConfig {
    pub output_root: PathBuf,
    pub scratch_root: PathBuf,
    pub upload_root: PathBuf,
    pub public_prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<SanitizedRemoteStoreConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedRemoteStoreConfig {
    pub base_url: String,
    pub internal_key_configured: bool,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let exporter = &config.exporter;
        let strategies = match exporter.backend {
            ExporterBackend::Sketchup => &exporter.sketchup_strategies,
            ExporterBackend::Sdk => &exporter.sdk_strategies,
        };

        Self {
            server: config.server.clone(),
            queue: config.queue.clone(),
            exporter: SanitizedExporterConfig {
                backend: exporter.backend,
                sketchup_path: exporter.sketchup_path.clone(),
                sdk_path: exporter.sdk_path.clone(),
                timeout_secs: exporter.timeout_secs,
                strategies: strategies.iter().map(|s| s.name.clone()).collect(),
            },
            converter: config.converter.clone(),
            compressor: config.compressor.clone(),
            storage: SanitizedStorageConfig {
                output_root: config.storage.output_root.clone(),
                scratch_root: config.storage.scratch_root.clone(),
                upload_root: config.storage.upload_root.clone(),
                public_prefix: config.storage.public_prefix.clone(),
                remote: config
                    .storage
                    .remote
                    .as_ref()
                    .map(|r| SanitizedRemoteStoreConfig {
                        base_url: r.base_url.clone(),
                        internal_key_configured: r.key().is_some(),
                        timeout_secs: r.timeout_secs,
                    }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RemoteStoreConfig;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.queue.attempts, 3);
        assert_eq!(config.queue.concurrency, 4);
        assert_eq!(config.exporter.timeout_secs, 300);
        assert!(!config.compressor.enabled);
        assert!(config.storage.remote.is_none());
    }

    #[test]
    fn test_sanitized_config_redacts_key() {
        let mut config = Config::default();
        config.storage.remote =
            Some(RemoteStoreConfig::new("https://api.example.com").with_internal_key("s3cret"));

        let sanitized = SanitizedConfig::from(&config);
        let remote = sanitized.storage.remote.as_ref().unwrap();
        assert!(remote.internal_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("s3cret"));
        assert!(json.contains("internal_key_configured"));
    }

    #[test]
    fn test_sanitized_config_blank_key_is_not_configured() {
        let mut config = Config::default();
        config.storage.remote =
            Some(RemoteStoreConfig::new("https://api.example.com").with_internal_key("  "));
        let sanitized = SanitizedConfig::from(&config);
        assert!(!sanitized.storage.remote.unwrap().internal_key_configured);
    }

    #[test]
    fn test_sanitized_exporter_lists_active_strategies() {
        let config = Config::default();
        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(
            sanitized.exporter.strategies,
            vec!["ruby-startup", "input-first", "ruby-startup-lowercase"]
        );
    }
}
