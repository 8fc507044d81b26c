//! Bridge configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration:
//!
//! ```toml
//! listen = "127.0.0.1:8765"
//! document_root = "~/Documents"
//! command_timeout_secs = 60
//! backend = "libreoffice"
//!
//! [office]
//! port = 2002
//! launch = true
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use writer_office::OfficeConfig;
use writer_protocol::{Position, DEFAULT_ADDR};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which document engine serves commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Libreoffice,
    /// JSON-backed documents; no office install needed.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub listen: SocketAddr,
    /// Base for relative document paths; `~` is expanded.
    pub document_root: String,
    pub command_timeout_secs: u64,
    /// How long a client may take to send its request.
    pub read_timeout_secs: u64,
    pub max_request_bytes: usize,
    /// Commands waiting for the worker before producers block.
    pub queue_depth: usize,
    /// Used when a request gives no `position`.
    pub default_position: Position,
    /// `RUST_LOG` takes precedence.
    pub log_level: String,
    pub backend: Backend,
    pub office: OfficeConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8765))),
            document_root: "~/Documents".to_string(),
            command_timeout_secs: 60,
            read_timeout_secs: 30,
            max_request_bytes: 1024 * 1024,
            queue_depth: 64,
            default_position: Position::End,
            log_level: "info".to_string(),
            backend: Backend::default(),
            office: OfficeConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Read and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: BridgeConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command_timeout_secs == 0 {
            return Err(ConfigError::Invalid("command_timeout_secs must be positive".into()));
        }
        if self.read_timeout_secs == 0 {
            return Err(ConfigError::Invalid("read_timeout_secs must be positive".into()));
        }
        if self.max_request_bytes == 0 {
            return Err(ConfigError::Invalid("max_request_bytes must be positive".into()));
        }
        if self.queue_depth == 0 {
            return Err(ConfigError::Invalid("queue_depth must be positive".into()));
        }
        if self.office.connect_attempts == 0 {
            return Err(ConfigError::Invalid("office.connect_attempts must be positive".into()));
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_gives_defaults() {
        let config: BridgeConfig = toml::from_str("").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.listen.to_string(), "127.0.0.1:8765");
        assert_eq!(config.command_timeout(), Duration::from_secs(60));
        assert_eq!(config.office.port, 2002);
    }

    #[test]
    fn fields_and_office_table_override_defaults() {
        let config: BridgeConfig = toml::from_str(
            r#"
            listen = "127.0.0.1:9000"
            default_position = "start"
            backend = "memory"

            [office]
            port = 2100
            launch = false
            "#,
        )
        .unwrap();
        assert_eq!(config.listen.port(), 9000);
        assert_eq!(config.default_position, Position::Start);
        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.office.port, 2100);
        assert!(!config.office.launch);
        assert_eq!(config.office.connect_attempts, 20);
    }

    #[test]
    fn load_reports_the_failing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");

        let err = BridgeConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }), "{err}");

        std::fs::write(&path, "listen = 5").unwrap();
        let err = BridgeConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "{err}");

        std::fs::write(&path, "command_timeout_secs = 0").unwrap();
        let err = BridgeConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");

        std::fs::write(&path, "queue_depth = 8").unwrap();
        assert_eq!(BridgeConfig::load(&path).unwrap().queue_depth, 8);
    }
}
