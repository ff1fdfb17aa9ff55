mod file_config;

pub use file_config::FileConfig;

use crate::server::{RequestsLoggingLevel, ServerConfig};
use crate::stats::FieldCapabilities;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_CATALOG_BASE_URL: &str = "http://127.0.0.1:8001/api/v1";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub catalog_base_url: Option<String>,
    pub dev_role_header: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub catalog_base_url: String,
    pub dev_role_header: Option<String>,
    pub capabilities: FieldCapabilities,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        // TOML overrides CLI for each field
        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        // Validate db_dir exists
        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let catalog_base_url = file
            .catalog_base_url
            .or_else(|| cli.catalog_base_url.clone())
            .unwrap_or_else(|| DEFAULT_CATALOG_BASE_URL.to_string());

        let dev_role_header = file.dev_role_header.or_else(|| cli.dev_role_header.clone());

        let capabilities = file.capabilities.unwrap_or_default();

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            catalog_base_url,
            dev_role_header,
            capabilities,
        })
    }

    pub fn stats_db_path(&self) -> PathBuf {
        self.db_dir.join("stats.db")
    }

    pub fn user_db_path(&self) -> PathBuf {
        self.db_dir.join("user.db")
    }

    /// The subset of the resolved configuration the HTTP server needs.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            requests_logging_level: self.logging_level.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            dev_role_header: self.dev_role_header.clone(),
        }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_temp_db_dir() -> TempDir {
        TempDir::new().unwrap()
    }

    #[test]
    fn test_parse_logging_level() {
        assert!(matches!(
            parse_logging_level("none"),
            Some(RequestsLoggingLevel::None)
        ));
        assert!(matches!(
            parse_logging_level("path"),
            Some(RequestsLoggingLevel::Path)
        ));
        assert!(matches!(
            parse_logging_level("headers"),
            Some(RequestsLoggingLevel::Headers)
        ));
        assert!(matches!(
            parse_logging_level("body"),
            Some(RequestsLoggingLevel::Body)
        ));
        // Case insensitive
        assert!(matches!(
            parse_logging_level("PATH"),
            Some(RequestsLoggingLevel::Path)
        ));
        // Invalid
        assert!(parse_logging_level("invalid").is_none());
    }

    #[test]
    fn test_resolve_cli_only() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            port: 3001,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::Headers,
            catalog_base_url: Some("http://catalog:8001/api/v1".to_string()),
            dev_role_header: None,
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.port, 3001);
        assert_eq!(config.metrics_port, 9091);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Headers);
        assert_eq!(config.catalog_base_url, "http://catalog:8001/api/v1");
        assert!(config.dev_role_header.is_none());
        assert_eq!(config.capabilities, FieldCapabilities::default());
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(PathBuf::from("/should/be/overridden")),
            port: 3001,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::Path,
            catalog_base_url: Some("http://cli-catalog:8001".to_string()),
            ..Default::default()
        };

        let file_config = FileConfig {
            db_dir: Some(temp_dir.path().to_string_lossy().to_string()),
            port: Some(4000),
            logging_level: Some("body".to_string()),
            catalog_base_url: Some("http://toml-catalog:8001".to_string()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();

        // TOML values should override CLI
        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.port, 4000);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Body);
        assert_eq!(config.catalog_base_url, "http://toml-catalog:8001");
        // CLI value used when TOML doesn't specify
        assert_eq!(config.metrics_port, 9091);
    }

    #[test]
    fn test_resolve_missing_db_dir_error() {
        let cli = CliConfig::default();
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("db_dir must be specified"));
    }

    #[test]
    fn test_resolve_nonexistent_db_dir_error() {
        let cli = CliConfig {
            db_dir: Some(PathBuf::from("/nonexistent/path/that/should/not/exist")),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_resolve_db_dir_not_directory_error() {
        // Create a temporary file (not a directory)
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let cli = CliConfig {
            db_dir: Some(temp_file.path().to_path_buf()),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not a directory"));
    }

    #[test]
    fn test_resolve_default_catalog_url() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, None).unwrap();
        assert_eq!(config.catalog_base_url, DEFAULT_CATALOG_BASE_URL);
    }

    #[test]
    fn test_resolve_capabilities_table() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };

        let toml_str = format!(
            "db_dir = \"{}\"\n\n[capabilities]\nplayback_labels = false\nrating_artists = false\n",
            temp_dir.path().to_string_lossy()
        );
        let file_config: FileConfig = toml::from_str(&toml_str).unwrap();

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();
        assert!(!config.capabilities.playback_labels);
        assert!(!config.capabilities.rating_artists);
        // Fields left out of a partial table stay enabled
        assert!(config.capabilities.playback_validity);
        assert!(config.capabilities.rating_timestamps);
    }

    #[test]
    fn test_db_path_helpers() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.stats_db_path(), temp_dir.path().join("stats.db"));
        assert_eq!(config.user_db_path(), temp_dir.path().join("user.db"));
    }

    #[test]
    fn test_server_config_projection() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            port: 4010,
            metrics_port: 9100,
            logging_level: RequestsLoggingLevel::Headers,
            dev_role_header: Some("X-Dev-Role".to_string()),
            ..Default::default()
        };

        let server_config = AppConfig::resolve(&cli, None).unwrap().server_config();
        assert_eq!(server_config.port, 4010);
        assert_eq!(server_config.metrics_port, 9100);
        assert_eq!(
            server_config.requests_logging_level,
            RequestsLoggingLevel::Headers
        );
        assert_eq!(server_config.dev_role_header, Some("X-Dev-Role".to_string()));
    }
}
