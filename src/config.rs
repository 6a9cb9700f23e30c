//! Configuration management for rJMX-Bridge
//!
//! Handles loading and validating configuration from YAML files.
//!
//! ```yaml
//! launcher:
//!   program: java
//!   args: ["-jar", "/opt/jmxterm/jmxterm-uber.jar"]
//!   connect_timeout_ms: 20000
//!   dump_timeout_ms: 30000
//!
//! server:
//!   port: 9090
//!   path: /metrics
//!
//! checks:
//!   - integration: tomcat
//!     instances:
//!       - host: localhost
//!         port: 9012
//!         name: tomcat_instance
//!         tags: ["env:prod"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::check::jvm::{default_collectors, GcCollector};
use crate::collector::{Credentials, Endpoint, Launcher};
use crate::integration::{self, FilterConfig, KNOWN_INTEGRATIONS};

/// 서버가 직접 쓰는 경로 (metrics path로 쓸 수 없음)
pub const RESERVED_PATHS: &[&str] = &["/", "/health", "/checks"];

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error reading the configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Error parsing the configuration file
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation error
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// jmxterm process configuration
    #[serde(default)]
    pub launcher: LauncherConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Configured checks
    #[serde(default)]
    pub checks: Vec<CheckConfig>,
}

/// jmxterm process configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// Executable to spawn
    #[serde(default = "default_program")]
    pub program: String,

    /// Fixed arguments placed before `-l host:port`
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Time to wait for the first prompt in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Time to wait for a dump in milliseconds
    #[serde(default = "default_dump_timeout")]
    pub dump_timeout_ms: u64,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Metrics endpoint path
    #[serde(default = "default_metrics_path")]
    pub path: String,

    /// Server bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

/// One integration and its instances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Integration name (activemq, cassandra, jmx, solr, tomcat)
    pub integration: String,

    /// JVMs to collect from
    #[serde(default)]
    pub instances: Vec<InstanceConfig>,
}

/// One JVM endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceConfig {
    pub host: String,

    pub port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Never written back out (`--dry-run` prints the config)
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Instance name (default: `<integration>-<host>-<port>`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Extra `key:value` tags added to every emission
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Extra domains to read on top of the integration's own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<String>>,

    /// Attributes never sent, whatever the integration decides
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_attributes: Vec<String>,

    /// GC collectors reported as `jvm.gc.<alias>.*`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jvm_collectors: Option<Vec<GcCollector>>,

    /// Filters for the `jmx` integration
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conf: Vec<FilterConfig>,
}

// Default value functions
fn default_program() -> String {
    "java".to_string()
}

fn default_args() -> Vec<String> {
    Launcher::default().args
}

fn default_connect_timeout() -> u64 {
    20_000
}

fn default_dump_timeout() -> u64 {
    30_000
}

fn default_port() -> u16 {
    9090
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            connect_timeout_ms: default_connect_timeout(),
            dump_timeout_ms: default_dump_timeout(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            path: default_metrics_path(),
            bind_address: default_bind_address(),
        }
    }
}

impl LauncherConfig {
    /// 프로세스 실행 방법
    pub fn launcher(&self) -> Launcher {
        Launcher {
            program: self.program.clone(),
            args: self.args.clone(),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn dump_timeout(&self) -> Duration {
        Duration::from_millis(self.dump_timeout_ms)
    }
}

impl InstanceConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    /// user와 password가 모두 있을 때만 인증 정보 반환
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.user, &self.password) {
            (Some(user), Some(password)) => Some(Credentials {
                user: user.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }

    /// 인스턴스 이름 (없으면 `<integration>-<host>-<port>`)
    pub fn instance_name(&self, integration: &str) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}-{}-{}", integration, self.host, self.port))
    }

    /// 설정된 GC collector, 없으면 기본값
    pub fn collectors(&self) -> Vec<GcCollector> {
        self.jvm_collectors.clone().unwrap_or_else(default_collectors)
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file, falling back to defaults if not found
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        Self::load(path)
    }

    /// Total number of configured instances
    pub fn instance_count(&self) -> usize {
        self.checks.iter().map(|c| c.instances.len()).sum()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if !self.server.path.starts_with('/') {
            return Err(ConfigError::ValidationError(
                "Metrics path must start with '/'".to_string(),
            ));
        }

        if RESERVED_PATHS.contains(&self.server.path.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Metrics path '{}' conflicts with a built-in route",
                self.server.path
            )));
        }

        if self.launcher.program.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Launcher program must not be empty".to_string(),
            ));
        }

        if self.launcher.connect_timeout_ms == 0 || self.launcher.dump_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "Launcher timeouts must be greater than 0".to_string(),
            ));
        }

        for check in &self.checks {
            if !KNOWN_INTEGRATIONS.contains(&check.integration.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Unknown integration '{}' (expected one of: {})",
                    check.integration,
                    KNOWN_INTEGRATIONS.join(", ")
                )));
            }

            for instance in &check.instances {
                let at = format!("{} instance {}:{}", check.integration, instance.host, instance.port);

                if instance.host.trim().is_empty() {
                    return Err(ConfigError::ValidationError(format!(
                        "{}: host must not be empty",
                        at
                    )));
                }

                if instance.port == 0 {
                    return Err(ConfigError::ValidationError(format!(
                        "{}: port must be greater than 0",
                        at
                    )));
                }

                if instance.user.is_some() != instance.password.is_some() {
                    return Err(ConfigError::ValidationError(format!(
                        "{}: user and password must be given together",
                        at
                    )));
                }

                if !instance.conf.is_empty() && check.integration != "jmx" {
                    tracing::warn!(
                        integration = %check.integration,
                        host = %instance.host,
                        port = instance.port,
                        "conf filters are only read by the jmx integration"
                    );
                }

                integration::build(&check.integration, &instance.conf)
                    .map_err(|e| ConfigError::ValidationError(format!("{}: {}", at, e)))?;
            }
        }

        Ok(())
    }
}
