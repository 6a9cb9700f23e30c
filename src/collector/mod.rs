//! jmxterm 기반 JMX 수집 모듈
//!
//! 외부 jmxterm 프로세스를 통해 JVM의 모든 MBean을 dump합니다.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use rjmx_bridge::collector::{ConnectOptions, Endpoint, JmxConnector, Launcher};
//!
//! let mut connector = JmxConnector::new(Launcher::default(), Duration::from_secs(30));
//! connector
//!     .connect(&ConnectOptions {
//!         endpoint: Endpoint::new("localhost", 7199),
//!         credentials: None,
//!         timeout: Duration::from_secs(20),
//!     })
//!     .await?;
//! let dump = connector.dump().await?;
//! ```

mod connector;
mod dump;
mod pool;

pub use connector::{
    ConnectOptions, ConnectorState, Credentials, Endpoint, JmxConnector, Launcher, PROMPT,
};
pub use dump::{AttributeValue, BeanAttributes, Dump};
pub use pool::{ConnectorHandle, ConnectorPool};
