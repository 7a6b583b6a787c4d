//! Configuration for the echo TCP server.
//!
//! Values are layered, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. an optional TOML file with a `[server]` table
//! 3. environment variables:
//!    - `ECHO_BIND_ADDR`      (default: "0.0.0.0")
//!    - `ECHO_PORT`           (default: "9000")
//!    - `ECHO_MAX_CLIENTS`    (default: unlimited; "0" also means unlimited)
//!    - `ECHO_QUEUE_CAPACITY` (default: "75")
//!    - `ECHO_MAX_LINE_LEN`   (default: "65536")
//!    - `ECHO_LOG_LEVEL`      (default: "info")
//! 4. command-line flags

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::Parser;
use serde::Deserialize;

use crate::error::ConfigError;

/// Command-line arguments for the echo server.
#[derive(Parser, Debug, Default)]
#[command(name = "echo-server")]
#[command(about = "Multi-client TCP server that double-echoes every line to all clients", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// IP address / interface to bind to (e.g. 127.0.0.1)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// TCP port to listen on (0 picks a free port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Maximum number of simultaneously connected clients (0 = unlimited)
    #[arg(short = 'm', long)]
    pub max_clients: Option<usize>,

    /// Outbound queue capacity per client
    #[arg(short = 'q', long)]
    pub queue_capacity: Option<usize>,

    /// Longest unterminated line buffered per client before it is disconnected
    #[arg(long)]
    pub max_line_len: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// TCP port to listen on.
    pub port: u16,

    /// Maximum number of simultaneously connected clients, `None` (or 0) for no limit.
    pub max_clients: Option<usize>,

    /// Payloads buffered per client before further ones are dropped.
    pub queue_capacity: usize,

    /// Bytes a client may send without a terminator before it is disconnected.
    pub max_line_len: usize,

    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 9000,
            max_clients: None,
            queue_capacity: echo_core::DEFAULT_QUEUE_CAPACITY,
            max_line_len: echo_protocol::DEFAULT_MAX_LINE_LEN,
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TomlFile {
    #[serde(default)]
    server: Config,
}

impl Config {
    /// Construct a `Config` from environment variables, falling back
    /// to reasonable defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_vars(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Build the full layered configuration for the binary.
    pub fn resolve(cli: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        config.apply_vars(|key| env::var(key).ok())?;
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Config::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let mut file: TomlFile = toml::from_str(contents)?;
        file.server.max_clients = file.server.client_limit();
        Ok(file.server)
    }

    /// The effective connection limit: `Some(0)` counts as no limit.
    pub fn client_limit(&self) -> Option<usize> {
        self.max_clients.and_then(non_zero)
    }

    /// Override fields from `ECHO_*` variables returned by `lookup`.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind_addr) = lookup("ECHO_BIND_ADDR") {
            self.bind_addr = bind_addr;
        }
        if let Some(port) = parse_var(&lookup, "ECHO_PORT")? {
            self.port = port;
        }
        if let Some(max_clients) = parse_var::<usize, _>(&lookup, "ECHO_MAX_CLIENTS")? {
            self.max_clients = non_zero(max_clients);
        }
        if let Some(queue_capacity) = parse_var(&lookup, "ECHO_QUEUE_CAPACITY")? {
            self.queue_capacity = queue_capacity;
        }
        if let Some(max_line_len) = parse_var(&lookup, "ECHO_MAX_LINE_LEN")? {
            self.max_line_len = max_line_len;
        }
        if let Some(log_level) = lookup("ECHO_LOG_LEVEL") {
            self.log_level = log_level;
        }
        Ok(())
    }

    pub fn apply_cli(&mut self, cli: &CliArgs) {
        if let Some(bind) = &cli.bind {
            self.bind_addr = bind.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(max_clients) = cli.max_clients {
            self.max_clients = non_zero(max_clients);
        }
        if let Some(queue_capacity) = cli.queue_capacity {
            self.queue_capacity = queue_capacity;
        }
        if let Some(max_line_len) = cli.max_line_len {
            self.max_line_len = max_line_len;
        }
        if let Some(log_level) = &cli.log_level {
            self.log_level = log_level.clone();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if self.max_line_len == 0 {
            return Err(ConfigError::ZeroMaxLineLen);
        }
        Ok(())
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn non_zero(limit: usize) -> Option<usize> {
    (limit > 0).then_some(limit)
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
                reason: e.to_string(),
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_reference_server() {
        let config = Config::default();
        assert_eq!(config.port, 9000);
        assert_eq!(config.queue_capacity, 75);
        assert_eq!(config.max_clients, None);
        assert_eq!(config.socket_addr_string(), "0.0.0.0:9000");
    }

    #[test]
    fn env_overrides_defaults() {
        let mut config = Config::default();
        config
            .apply_vars(vars(&[
                ("ECHO_BIND_ADDR", "127.0.0.1"),
                ("ECHO_PORT", "4242"),
                ("ECHO_MAX_CLIENTS", "10"),
                ("ECHO_QUEUE_CAPACITY", "5"),
            ]))
            .unwrap();

        assert_eq!(config.socket_addr_string(), "127.0.0.1:4242");
        assert_eq!(config.max_clients, Some(10));
        assert_eq!(config.queue_capacity, 5);
    }

    #[test]
    fn zero_max_clients_means_unlimited() {
        let mut config = Config {
            max_clients: Some(3),
            ..Config::default()
        };
        config.apply_vars(vars(&[("ECHO_MAX_CLIENTS", "0")])).unwrap();
        assert_eq!(config.max_clients, None);
    }

    #[test]
    fn zero_max_clients_in_toml_means_unlimited() {
        let config = Config::from_toml_str(
            r#"
            [server]
            max_clients = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.max_clients, None);
        assert_eq!(config.client_limit(), None);
    }

    #[test]
    fn client_limit_ignores_a_hand_built_zero() {
        let config = Config {
            max_clients: Some(0),
            ..Config::default()
        };
        assert_eq!(config.client_limit(), None);

        let limited = Config {
            max_clients: Some(4),
            ..Config::default()
        };
        assert_eq!(limited.client_limit(), Some(4));
    }

    #[test]
    fn max_line_len_layers_like_the_rest() {
        let mut config = Config::from_toml_str("[server]\nmax_line_len = 100\n").unwrap();
        assert_eq!(config.max_line_len, 100);

        config.apply_vars(vars(&[("ECHO_MAX_LINE_LEN", "200")])).unwrap();
        assert_eq!(config.max_line_len, 200);

        let cli = CliArgs::parse_from(["echo-server", "--max-line-len", "300"]);
        config.apply_cli(&cli);
        assert_eq!(config.max_line_len, 300);
    }

    #[test]
    fn bad_env_value_is_reported_with_its_key() {
        let mut config = Config::default();
        let err = config
            .apply_vars(vars(&[("ECHO_PORT", "not-a-port")]))
            .unwrap_err();

        match err {
            ConfigError::InvalidValue { key, value, .. } => {
                assert_eq!(key, "ECHO_PORT");
                assert_eq!(value, "not-a-port");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn toml_server_table_fills_missing_fields_with_defaults() {
        let config = Config::from_toml_str(
            r#"
            [server]
            port = 7000
            queue_capacity = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 7000);
        assert_eq!(config.queue_capacity, 10);
        assert_eq!(config.bind_addr, "0.0.0.0");
    }

    #[test]
    fn empty_toml_is_all_defaults() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn cli_wins_over_env() {
        let mut config = Config::default();
        config.apply_vars(vars(&[("ECHO_PORT", "1111")])).unwrap();

        let cli = CliArgs::parse_from(["echo-server", "--port", "2222", "--max-clients", "0"]);
        config.apply_cli(&cli);

        assert_eq!(config.port, 2222);
        assert_eq!(config.max_clients, None);
    }

    #[test]
    fn zero_queue_capacity_is_rejected() {
        let config = Config {
            queue_capacity: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroQueueCapacity)));
    }

    #[test]
    fn zero_max_line_len_is_rejected() {
        let config = Config {
            max_line_len: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroMaxLineLen)));
    }
}
