//! Cassandra column family, thread pool and messaging metrics
//!
//! Everything under the three domains is sent except a fixed set of
//! configuration-like attributes and anything in the `system` keyspace.

use super::{
    joined_tags, DenyList, DeviceStrategy, InclusionPolicy, Integration, MetricName, NameStrategy,
};
use crate::catalog::{normalize_metric_name, JmxMetric, MetricType};

const DOMAIN_PREFIX: &str = "org.apache.cassandra.";

const DENY_LIST: DenyList = DenyList {
    attributes: &[
        "MinimumCompactionThreshold",
        "MaximumCompactionThreshold",
        "RowCacheKeysToSave",
        "KeyCacheSavePeriodInSeconds",
        "RowCacheSavePeriodInSeconds",
        "PendingTasks",
        "Scores",
        "RpcTimeout",
        "Token",
    ],
    namespace: Some(("keyspace", "system")),
};

/// `cassandra` integration
#[derive(Debug, Clone, Copy, Default)]
pub struct Cassandra;

impl Cassandra {
    pub const NAME: &'static str = "cassandra";
    pub const DOMAINS: &'static [&'static str] = &[
        "org.apache.cassandra.db",
        "org.apache.cassandra.internal",
        "org.apache.cassandra.net",
    ];
    pub const DENY_LIST: DenyList = DENY_LIST;
}

impl NameStrategy for Cassandra {
    /// `cassandra.<db|internal|net>.<attribute>`
    fn metric_name(&self, metric: &JmxMetric) -> Option<MetricName> {
        let sub_domain = metric
            .domain()
            .strip_prefix(DOMAIN_PREFIX)
            .unwrap_or(metric.domain());
        let name = normalize_metric_name(&format!(
            "{}.{}.{}",
            Self::NAME,
            sub_domain,
            metric.attribute_name()
        ));
        Some(MetricName::new(name, MetricType::Gauge))
    }
}

impl DeviceStrategy for Cassandra {
    fn device(&self, metric: &JmxMetric) -> Option<String> {
        joined_tags(metric, &["keyspace", "columnfamily"])
            .or_else(|| metric.tag("keyspace").map(str::to_string))
    }
}

impl InclusionPolicy for Cassandra {
    fn include(&self, metric: &JmxMetric) -> bool {
        !Self::DENY_LIST.denies(metric)
    }
}

impl Integration for Cassandra {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn domains(&self) -> Option<Vec<String>> {
        Some(Self::DOMAINS.iter().map(|d| d.to_string()).collect())
    }

    /// bean의 `instance` 태그는 JVM 객체 해시라 cycle마다 바뀜
    fn prepare(&self, metric: &mut JmxMetric) {
        metric.filter_tags(&["instance"], &[]);
    }
}
