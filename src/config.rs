//! Configuration module for hello-server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values, and the config
//! file takes precedence over the defaults of the selected greeting.

use crate::response::Greeting;
use clap::Parser;
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

/// Command-line arguments for the server
#[derive(Parser, Debug)]
#[command(name = "hello-server")]
#[command(author = "hello-server authors")]
#[command(version = "0.1.0")]
#[command(about = "Answers every TCP connection with a fixed HTTP greeting", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Greeting preset selecting the default port and body
    #[arg(short, long, value_enum)]
    pub greeting: Option<Greeting>,

    /// Address to bind to (defaults to all interfaces)
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Port to listen on (defaults to the greeting's port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Response body (defaults to the greeting's body)
    #[arg(short, long)]
    pub body: Option<String>,

    /// Listen backlog
    #[arg(long)]
    pub backlog: Option<i32>,

    /// Bytes read (and discarded) from each request
    #[arg(long)]
    pub read_buffer: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub response: ResponseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub greeting: Greeting,
    #[serde(default = "default_host")]
    pub host: String,
    /// Overrides the greeting's port
    pub port: Option<u16>,
    #[serde(default = "default_backlog")]
    pub backlog: i32,
    #[serde(default = "default_read_buffer")]
    pub read_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            greeting: Greeting::default(),
            host: default_host(),
            port: None,
            backlog: default_backlog(),
            read_buffer: default_read_buffer(),
        }
    }
}

/// Response-related configuration
#[derive(Debug, Deserialize, Default)]
pub struct ResponseConfig {
    /// Overrides the greeting's body
    pub body: Option<String>,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_backlog() -> i32 {
    3
}

fn default_read_buffer() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub greeting: Greeting,
    pub host: String,
    pub port: u16,
    pub body: String,
    pub backlog: i32,
    pub read_buffer: usize,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config::merge(CliArgs::empty(), TomlConfig::default())
    }
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = CliArgs::parse();

        let toml_config = match cli.config {
            Some(ref config_path) => load_toml(config_path)?,
            None => TomlConfig::default(),
        };

        Ok(Config::merge(cli, toml_config))
    }

    /// Merge CLI args over TOML values over greeting defaults.
    pub fn merge(cli: CliArgs, toml_config: TomlConfig) -> Self {
        let greeting = cli.greeting.unwrap_or(toml_config.server.greeting);

        Config {
            greeting,
            host: cli.host.unwrap_or(toml_config.server.host),
            port: cli
                .port
                .or(toml_config.server.port)
                .unwrap_or_else(|| greeting.port()),
            body: cli
                .body
                .or(toml_config.response.body)
                .unwrap_or_else(|| greeting.body().to_string()),
            backlog: cli.backlog.unwrap_or(toml_config.server.backlog),
            read_buffer: cli.read_buffer.unwrap_or(toml_config.server.read_buffer),
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        }
    }

    /// Socket address built from `host` and `port`.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(self.host.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl CliArgs {
    fn empty() -> Self {
        CliArgs {
            config: None,
            greeting: None,
            host: None,
            port: None,
            body: None,
            backlog: None,
            read_buffer: None,
            log_level: None,
        }
    }
}

fn load_toml(path: &Path) -> Result<TomlConfig, ConfigError> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead(path.to_path_buf(), e))?;
    toml::from_str(&contents).map_err(|e| ConfigError::TomlParse(path.to_path_buf(), e))
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
    InvalidAddress(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidAddress(host) => {
                write!(f, "Invalid listen address '{}'", host)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.greeting, Greeting::C);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.body, "Hello, C!");
        assert_eq!(config.backlog, 3);
        assert_eq!(config.read_buffer, 1024);
        assert_eq!(config.log_level, "info");
        assert_eq!(
            config.listen_addr().unwrap(),
            "0.0.0.0:8080".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            greeting = "cpp"
            host = "127.0.0.1"
            backlog = 16
            read_buffer = 512

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.greeting, Greeting::Cpp);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, None);
        assert_eq!(config.server.backlog, 16);
        assert_eq!(config.server.read_buffer, 512);
        assert_eq!(config.response.body, None);
        assert_eq!(config.logging.level, "debug");

        let config = Config::merge(CliArgs::empty(), config);
        assert_eq!(config.port, 8081);
        assert_eq!(config.body, "Hello, C++!");
    }

    #[test]
    fn test_toml_overrides_greeting() {
        let toml_str = r#"
            [server]
            greeting = "go"
            port = 9000

            [response]
            body = "hi"
        "#;

        let config = Config::merge(CliArgs::empty(), toml::from_str(toml_str).unwrap());
        assert_eq!(config.greeting, Greeting::Go);
        assert_eq!(config.port, 9000);
        assert_eq!(config.body, "hi");
    }

    #[test]
    fn test_cli_takes_precedence() {
        let toml_str = r#"
            [server]
            greeting = "go"
            port = 9000

            [logging]
            level = "warn"
        "#;
        let cli = CliArgs::try_parse_from([
            "hello-server",
            "--greeting",
            "rust",
            "--port",
            "9100",
            "--log-level",
            "trace",
        ])
        .unwrap();

        let config = Config::merge(cli, toml::from_str(toml_str).unwrap());
        assert_eq!(config.greeting, Greeting::Rust);
        assert_eq!(config.port, 9100);
        assert_eq!(config.body, "Hello, Rust!");
        assert_eq!(config.log_level, "trace");
    }

    #[test]
    fn test_cli_greeting_sets_defaults() {
        let cli = CliArgs::try_parse_from(["hello-server", "-g", "cpp"]).unwrap();
        let config = Config::merge(cli, TomlConfig::default());
        assert_eq!(config.port, 8081);
        assert_eq!(config.body, "Hello, C++!");
    }

    #[test]
    fn test_unknown_greeting_rejected() {
        assert!(CliArgs::try_parse_from(["hello-server", "--greeting", "java"]).is_err());
        assert!(toml::from_str::<TomlConfig>("[server]\ngreeting = \"java\"").is_err());
    }

    #[test]
    fn test_invalid_host() {
        let config = Config {
            host: "not-an-ip".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.listen_addr(),
            Err(ConfigError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_ipv6_host() {
        let config = Config {
            host: "::1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(
            config.listen_addr().unwrap(),
            "[::1]:8080".parse::<SocketAddr>().unwrap()
        );
    }
}
