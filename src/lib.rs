//! rJMX-Bridge library
//!
//! Connects to JVMs through an external jmxterm process, dumps every MBean,
//! turns numeric attributes into tagged metrics shaped by an integration
//! profile (ActiveMQ, Cassandra, Solr, Tomcat or user filters) and emits
//! them together with the standard JVM metrics and a connectivity status.

pub mod catalog;
pub mod check;
pub mod cli;
pub mod collector;
pub mod config;
pub mod error;
pub mod exposition;
pub mod integration;
pub mod metrics;
pub mod server;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging subsystem
///
/// `RUST_LOG` wins over `level` when set.
///
/// # Errors
/// Returns an error if the logging system fails to initialize
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
