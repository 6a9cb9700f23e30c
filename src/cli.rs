//! CLI argument parsing for rJMX-Bridge
//!
//! # Options
//!
//! - `--config` / `-c`: Configuration file path (default: config.yaml, env: RJMX_BRIDGE_CONFIG)
//! - `--port` / `-p`: Server port (overrides config file, env: RJMX_BRIDGE_PORT)
//! - `--bind-address`: Server bind address (env: RJMX_BRIDGE_BIND_ADDRESS)
//! - `--metrics-path`: Metrics endpoint path (env: RJMX_BRIDGE_METRICS_PATH)
//! - `--java`: Program used to launch jmxterm (env: RJMX_BRIDGE_JAVA)
//! - `--jmxterm-jar`: jmxterm uber jar (env: RJMX_BRIDGE_JMXTERM_JAR)
//! - `--connect-timeout`: Connect timeout in milliseconds (env: RJMX_BRIDGE_CONNECT_TIMEOUT)
//! - `--dump-timeout`: Dump timeout in milliseconds (env: RJMX_BRIDGE_DUMP_TIMEOUT)
//! - `--validate`: Validate configuration without starting server
//! - `--dry-run`: Show the resolved checks and instances
//! - `--once`: Run every check once, print the result and exit
//! - `--log-level` / `-l`: Log level (trace/debug/info/warn/error, env: RJMX_BRIDGE_LOG_LEVEL)
//! - `--output-format`: Output format for validate/dry-run/once (text/json/yaml)
//!
//! # Precedence
//!
//! 1. CLI arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::Config;

/// rJMX-Bridge - JMX bridge agent
///
/// Dumps every MBean of the configured JVMs through jmxterm, turns them
/// into tagged check metrics and serves them over HTTP.
#[derive(Parser, Debug)]
#[command(name = "rjmx-bridge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config.yaml",
        env = "RJMX_BRIDGE_CONFIG"
    )]
    pub config: PathBuf,

    /// Server port (overrides config file)
    #[arg(short, long, value_name = "PORT", env = "RJMX_BRIDGE_PORT")]
    pub port: Option<u16>,

    /// Server bind address (overrides config file)
    /// Supported values: IP addresses (0.0.0.0, 127.0.0.1, ::1) or "localhost"
    #[arg(long, value_name = "ADDRESS", env = "RJMX_BRIDGE_BIND_ADDRESS")]
    pub bind_address: Option<String>,

    /// Metrics endpoint path (overrides config file)
    #[arg(long, value_name = "PATH", env = "RJMX_BRIDGE_METRICS_PATH")]
    pub metrics_path: Option<String>,

    /// Program used to launch jmxterm (overrides config file)
    #[arg(long, value_name = "PROGRAM", env = "RJMX_BRIDGE_JAVA")]
    pub java: Option<String>,

    /// jmxterm uber jar; launcher args become `-jar <FILE>`
    #[arg(long, value_name = "FILE", env = "RJMX_BRIDGE_JMXTERM_JAR")]
    pub jmxterm_jar: Option<String>,

    /// Connect timeout in milliseconds (overrides config file)
    #[arg(long, value_name = "MS", env = "RJMX_BRIDGE_CONNECT_TIMEOUT")]
    pub connect_timeout: Option<u64>,

    /// Dump timeout in milliseconds (overrides config file)
    #[arg(long, value_name = "MS", env = "RJMX_BRIDGE_DUMP_TIMEOUT")]
    pub dump_timeout: Option<u64>,

    /// Validate configuration without starting server
    #[arg(long)]
    pub validate: bool,

    /// Show the resolved checks and instances without connecting
    #[arg(long)]
    pub dry_run: bool,

    /// Run every check once, print the result and exit
    #[arg(long)]
    pub once: bool,

    /// Log level
    #[arg(
        short,
        long,
        value_enum,
        default_value = "info",
        env = "RJMX_BRIDGE_LOG_LEVEL"
    )]
    pub log_level: LogLevel,

    /// Output format for --validate, --dry-run and --once
    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

impl Cli {
    /// CLI/환경 변수 값을 설정에 덮어씀
    pub fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(bind_address) = &self.bind_address {
            config.server.bind_address = bind_address.clone();
        }
        if let Some(path) = &self.metrics_path {
            config.server.path = path.clone();
        }
        if let Some(java) = &self.java {
            config.launcher.program = java.clone();
        }
        if let Some(jar) = &self.jmxterm_jar {
            config.launcher.args = vec!["-jar".to_string(), jar.clone()];
        }
        if let Some(ms) = self.connect_timeout {
            config.launcher.connect_timeout_ms = ms;
        }
        if let Some(ms) = self.dump_timeout {
            config.launcher.dump_timeout_ms = ms;
        }
    }
}

/// Log level options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Trace level - most verbose
    Trace,
    /// Debug level
    Debug,
    /// Info level - default
    Info,
    /// Warn level
    Warn,
    /// Error level - least verbose
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Output format options for validate, dry-run and once modes
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
        }
    }
}
