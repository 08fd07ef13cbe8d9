use super::{types::Config, ConfigError};
use crate::exporter::ExporterBackend;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Queue attempts and concurrency are at least 1
/// - Remote store base URL is http(s) when present
/// - Tool timeouts are not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Queue validation
    if config.queue.attempts == 0 {
        return Err(ConfigError::ValidationError(
            "queue.attempts must be at least 1".to_string(),
        ));
    }
    if config.queue.concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "queue.concurrency must be at least 1".to_string(),
        ));
    }

    // Exporter validation
    if config.exporter.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "exporter.timeout_secs cannot be 0".to_string(),
        ));
    }
    let strategies = match config.exporter.backend {
        ExporterBackend::Sketchup => &config.exporter.sketchup_strategies,
        ExporterBackend::Sdk => &config.exporter.sdk_strategies,
    };
    if strategies.is_empty() {
        return Err(ConfigError::ValidationError(
            "exporter needs at least one invocation strategy for the selected backend"
                .to_string(),
        ));
    }

    if config.converter.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "converter.timeout_secs cannot be 0".to_string(),
        ));
    }

    // Storage validation
    if let Some(remote) = &config.storage.remote {
        let url = remote.base_url.trim();
        if !url.is_empty() && !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "storage.remote.base_url must be an http(s) URL, got {url:?}"
            )));
        }
    }
    if config.storage.upload_root.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "storage.upload_root cannot be empty".to_string(),
        ));
    }
    if !config.storage.public_prefix.starts_with('/') {
        return Err(ConfigError::ValidationError(
            "storage.public_prefix must start with '/'".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use std::path::PathBuf;
    use crate::storage::RemoteStoreConfig;
    use std::net::IpAddr;

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let config = Config {
            server: ServerConfig {
                host: "0.0.0.0".parse::<IpAddr>().unwrap(),
                port: 0,
            },
            ..Config::default()
        };
        let result = validate_config(&config);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_queue_bounds() {
        let mut config = Config::default();
        config.queue.attempts = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.queue.concurrency = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_remote_url_scheme() {
        let mut config = Config::default();
        config.storage.remote = Some(RemoteStoreConfig::new("ftp://example.com"));
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("storage.remote.base_url"));

        config.storage.remote = Some(RemoteStoreConfig::new("https://example.com"));
        assert!(validate_config(&config).is_ok());

        // Blank means local mode.
        config.storage.remote = Some(RemoteStoreConfig::new(""));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_timeouts_and_strategies() {
        let mut config = Config::default();
        config.exporter.timeout_secs = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.exporter.sketchup_strategies.clear();
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.converter.timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_public_prefix() {
        let mut config = Config::default();
        config.storage.public_prefix = "models".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_upload_root() {
        let mut config = Config::default();
        config.storage.upload_root = PathBuf::new();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("storage.upload_root"));
    }
}
