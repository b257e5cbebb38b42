//! Configuration management for kubelet-summary-exporter.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat};
use kubelet_summary_exporter::fetcher::DEFAULT_KUBELET_PORT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9091;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Exporter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Kubelet connection
    #[serde(alias = "target-address")]
    pub target_address: Option<String>,
    #[serde(alias = "kubelet-port")]
    pub kubelet_port: Option<u16>,
    #[serde(alias = "token-path")]
    pub token_path: Option<PathBuf>,
    #[serde(alias = "timeout-seconds", alias = "timeout")]
    pub timeout_seconds: Option<u64>,

    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_address: None,
            kubelet_port: Some(DEFAULT_KUBELET_PORT),
            token_path: Some(PathBuf::from(DEFAULT_TOKEN_PATH)),
            timeout_seconds: Some(DEFAULT_TIMEOUT_SECONDS),
            port: Some(DEFAULT_PORT),
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            log_level: Some("info".into()),
        }
    }
}

impl Config {
    pub fn kubelet_port(&self) -> u16 {
        self.kubelet_port.unwrap_or(DEFAULT_KUBELET_PORT)
    }

    pub fn token_path(&self) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_PATH))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    pub fn listen_port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn bind_addr(&self) -> &str {
        self.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR)
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    match cfg.target_address.as_deref().map(str::trim) {
        None | Some("") => {
            return Err("target_address is not set (use --target-address or the config file)".into());
        }
        Some(_) => {}
    }

    if cfg.kubelet_port == Some(0) {
        return Err("kubelet_port must be greater than 0".into());
    }

    if cfg.port == Some(0) {
        return Err("port must be greater than 0".into());
    }

    if cfg.timeout_seconds == Some(0) {
        return Err("timeout_seconds must be greater than 0".into());
    }

    if let Some(bind) = cfg.bind.as_deref() {
        if bind.parse::<std::net::IpAddr>().is_err() {
            return Err(format!("Invalid bind address '{}'", bind).into());
        }
    }

    if let Some(level) = cfg.log_level.as_deref() {
        if !matches!(level, "off" | "error" | "warn" | "info" | "debug" | "trace") {
            return Err(format!(
                "Invalid log_level '{}', expected off|error|warn|info|debug|trace",
                level
            )
            .into());
        }
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(address) = &args.target_address {
        config.target_address = Some(address.clone());
    }
    if let Some(port) = args.kubelet_port {
        config.kubelet_port = Some(port);
    }
    if let Some(path) = &args.token_path {
        config.token_path = Some(path.clone());
    }
    if let Some(timeout) = args.timeout {
        config.timeout_seconds = Some(timeout);
    }

    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }

    // Only override port if the user supplied it on the CLI.
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }

    Ok(config)
}

/// Loads a config file, falling back to the default locations when no path is given.
///
/// Fields missing from the file keep their built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let defaults = [
                "/etc/kubelet-summary-exporter/config.yaml",
                "/etc/kubelet-summary-exporter/config.yml",
                "/etc/kubelet-summary-exporter/config.json",
                "./kubelet-summary-exporter.yaml",
                "./kubelet-summary-exporter.yml",
                "./kubelet-summary-exporter.json",
            ];

            match defaults.iter().find(|p| Path::new(p).exists()) {
                Some(found) => PathBuf::from(found),
                None => return Ok(Config::default()),
            }
        }
    };

    if !path.exists() {
        return Err(format!("Config file not found: {}", path.display()).into());
    }

    let content = fs::read_to_string(&path)?;

    let file: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config = serde_json::from_str(&content)?;
            info!("Loaded JSON configuration from: {}", path.display());
            config
        }
        Some("toml") => {
            let config = toml::from_str(&content)?;
            info!("Loaded TOML configuration from: {}", path.display());
            config
        }
        _ => {
            // Default to YAML
            let config = serde_yaml::from_str(&content)?;
            info!("Loaded YAML configuration from: {}", path.display());
            config
        }
    };

    Ok(merge_defaults(file))
}

fn merge_defaults(file: Config) -> Config {
    let defaults = Config::default();
    Config {
        target_address: file.target_address.or(defaults.target_address),
        kubelet_port: file.kubelet_port.or(defaults.kubelet_port),
        token_path: file.token_path.or(defaults.token_path),
        timeout_seconds: file.timeout_seconds.or(defaults.timeout_seconds),
        port: file.port.or(defaults.port),
        bind: file.bind.or(defaults.bind),
        log_level: file.log_level.or(defaults.log_level),
    }
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };

    println!("{output}");
    Ok(())
}
