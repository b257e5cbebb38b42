//! CLI arguments and subcommands for kubelet-summary-exporter.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "kubelet-summary-exporter",
    about = "Prometheus exporter for the kubelet stats summary API",
    long_about = "Prometheus exporter for the kubelet stats summary API.\n\n\
                  Pulls /stats/summary from a kubelet on every scrape and re-exposes node, \
                  system container, pod, volume and container resource statistics as \
                  Prometheus gauges.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Kubelet address (IP or hostname) to scrape
    #[arg(long)]
    pub target_address: Option<String>,

    /// Kubelet HTTPS port
    #[arg(long)]
    pub kubelet_port: Option<u16>,

    /// File holding the bearer token sent to the kubelet
    #[arg(long)]
    pub token_path: Option<PathBuf>,

    /// Kubelet request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Log level (overrides log_level from the config file, default: info)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pull the summary once and print the text exposition
    Scrape,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kubelet_flags() {
        let args = Args::parse_from([
            "kubelet-summary-exporter",
            "--target-address",
            "10.0.0.5",
            "--kubelet-port",
            "4443",
            "--timeout",
            "3",
            "-p",
            "9100",
        ]);
        assert_eq!(args.target_address.as_deref(), Some("10.0.0.5"));
        assert_eq!(args.kubelet_port, Some(4443));
        assert_eq!(args.timeout, Some(3));
        assert_eq!(args.port, Some(9100));
        assert!(args.command.is_none());
    }

    #[test]
    fn test_parse_scrape_subcommand() {
        let args = Args::parse_from(["kubelet-summary-exporter", "--no-config", "scrape"]);
        assert!(args.no_config);
        assert!(matches!(args.command, Some(Commands::Scrape)));
    }
}
