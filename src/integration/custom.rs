//! Generic `jmx` integration driven by user filters
//!
//! ```yaml
//! conf:
//!   - include:
//!       domain: org.apache.kafka.*
//!       type: [BrokerTopicMetrics, ReplicaManager]
//!       attribute:
//!         Count:
//!           alias: kafka.messages_in
//!           metric_type: counter
//!     exclude:
//!       name: "*PerSec"
//! ```
//!
//! A metric is sent when any filter accepts it. A filter accepts when every
//! `include` field matches and no `exclude` field does. Field keys are
//! `domain`, `bean` (or `bean_name`), `attribute`, or any bean tag key;
//! values are a string or a list, and `*` matches any run of characters.
//! Without filters every metric is sent.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{DeviceStrategy, InclusionPolicy, Integration, MetricName, NameStrategy};
use crate::catalog::{JmxMetric, MetricType};
use crate::error::CheckError;

/// conf 필터 하나
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub include: BTreeMap<String, FilterValue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub exclude: BTreeMap<String, FilterValue>,
}

/// 필터 필드 값
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    One(String),
    Many(Vec<String>),
    /// `attribute` 전용: 속성 이름 -> alias
    Aliased(BTreeMap<String, Option<AttributeAlias>>),
}

impl FilterValue {
    fn patterns(&self) -> Vec<&str> {
        match self {
            FilterValue::One(s) => vec![s.as_str()],
            FilterValue::Many(v) => v.iter().map(String::as_str).collect(),
            FilterValue::Aliased(map) => map.keys().map(String::as_str).collect(),
        }
    }
}

/// 속성 이름 변경
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AttributeAlias {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_type: Option<MetricType>,
}

#[derive(Debug, Clone)]
enum Field {
    Domain,
    Bean,
    Attribute,
    Tag(String),
}

impl Field {
    fn parse(key: &str) -> Self {
        match key {
            "domain" => Field::Domain,
            "bean" | "bean_name" => Field::Bean,
            "attribute" | "attribute_name" => Field::Attribute,
            other => Field::Tag(other.to_string()),
        }
    }

    fn value<'m>(&self, metric: &'m JmxMetric) -> Option<&'m str> {
        match self {
            Field::Domain => Some(metric.domain()),
            Field::Bean => Some(metric.bean_name()),
            Field::Attribute => Some(metric.attribute_name()),
            Field::Tag(key) => metric.tag(key),
        }
    }
}

#[derive(Debug, Clone)]
struct Matcher {
    field: Field,
    patterns: Vec<Regex>,
}

impl Matcher {
    fn compile(key: &str, value: &FilterValue) -> Result<Self, CheckError> {
        let patterns = value
            .patterns()
            .into_iter()
            .map(glob_to_regex)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            field: Field::parse(key),
            patterns,
        })
    }

    /// 필드가 없으면 불일치
    fn matches(&self, metric: &JmxMetric) -> bool {
        self.field
            .value(metric)
            .is_some_and(|v| self.patterns.iter().any(|re| re.is_match(v)))
    }
}

#[derive(Debug, Clone)]
struct CompiledFilter {
    include: Vec<Matcher>,
    exclude: Vec<Matcher>,
    aliases: BTreeMap<String, AttributeAlias>,
}

impl CompiledFilter {
    fn compile(config: &FilterConfig) -> Result<Self, CheckError> {
        let compile_all = |fields: &BTreeMap<String, FilterValue>| {
            fields
                .iter()
                .map(|(k, v)| Matcher::compile(k, v))
                .collect::<Result<Vec<_>, _>>()
        };

        let aliases = match config.include.get("attribute") {
            Some(FilterValue::Aliased(map)) => map
                .iter()
                .filter_map(|(attr, alias)| alias.clone().map(|a| (attr.clone(), a)))
                .collect(),
            _ => BTreeMap::new(),
        };

        Ok(Self {
            include: compile_all(&config.include)?,
            exclude: compile_all(&config.exclude)?,
            aliases,
        })
    }

    fn accepts(&self, metric: &JmxMetric) -> bool {
        self.include.iter().all(|m| m.matches(metric))
            && !self.exclude.iter().any(|m| m.matches(metric))
    }
}

fn glob_to_regex(pattern: &str) -> Result<Regex, CheckError> {
    let body: Vec<String> = pattern.split('*').map(regex::escape).collect();
    Regex::new(&format!("^{}$", body.join(".*")))
        .map_err(|e| CheckError::InvalidFilter(format!("'{}': {}", pattern, e)))
}

/// `jmx` integration
#[derive(Debug, Clone, Default)]
pub struct CustomJmx {
    filters: Vec<CompiledFilter>,
}

impl CustomJmx {
    pub const NAME: &'static str = "jmx";

    pub fn new(conf: &[FilterConfig]) -> Result<Self, CheckError> {
        let filters = conf
            .iter()
            .map(CompiledFilter::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { filters })
    }
}

impl NameStrategy for CustomJmx {
    fn metric_name(&self, metric: &JmxMetric) -> Option<MetricName> {
        let alias = self
            .filters
            .iter()
            .filter(|f| f.accepts(metric))
            .find_map(|f| f.aliases.get(metric.attribute_name()))?;

        Some(MetricName::new(
            alias
                .alias
                .clone()
                .unwrap_or_else(|| metric.default_metric_name()),
            alias.metric_type.unwrap_or_default(),
        ))
    }
}

impl DeviceStrategy for CustomJmx {}

impl InclusionPolicy for CustomJmx {
    fn include(&self, metric: &JmxMetric) -> bool {
        self.filters.is_empty() || self.filters.iter().any(|f| f.accepts(metric))
    }
}

impl Integration for CustomJmx {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn domains(&self) -> Option<Vec<String>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MetricFactory;
    use crate::integration::Profile;

    fn conf(yaml: &str) -> CustomJmx {
        let filters: Vec<FilterConfig> = serde_yaml::from_str(yaml).unwrap();
        CustomJmx::new(&filters).unwrap()
    }

    fn wrap(integration: &CustomJmx, bean: &str, attribute: &str) -> JmxMetric {
        Profile::new(integration, &[])
            .wrap(bean, attribute, 1.0)
            .unwrap()
    }

    #[test]
    fn test_no_conf_sends_everything() {
        let jmx = CustomJmx::new(&[]).unwrap();
        let metric = wrap(&jmx, "a.b:type=Foo", "Count");
        assert!(metric.send_metric());
        assert_eq!(metric.metric_name(), "jmx.a.b.count");
    }

    #[test]
    fn test_include_all_fields_must_match() {
        let jmx = conf(
            r#"
- include:
    domain: org.apache.kafka.*
    type: [BrokerTopicMetrics, ReplicaManager]
"#,
        );
        assert!(wrap(&jmx, "org.apache.kafka.server:type=ReplicaManager", "LeaderCount").send_metric());
        assert!(!wrap(&jmx, "org.apache.kafka.server:type=Log", "Size").send_metric());
        assert!(!wrap(&jmx, "kafka.server:type=ReplicaManager", "LeaderCount").send_metric());
        // missing tag key does not match
        assert!(!wrap(&jmx, "org.apache.kafka.server:name=x", "LeaderCount").send_metric());
    }

    #[test]
    fn test_exclude_any_field_rejects() {
        let jmx = conf(
            r#"
- include:
    domain: org.apache.cassandra.db
  exclude:
    attribute: [PendingTasks, Scores]
    keyspace: system
"#,
        );
        let bean = "org.apache.cassandra.db:columnfamily=users,keyspace=app,type=ColumnFamilies";
        assert!(wrap(&jmx, bean, "WriteCount").send_metric());
        assert!(!wrap(&jmx, bean, "PendingTasks").send_metric());

        let system = "org.apache.cassandra.db:columnfamily=peers,keyspace=system,type=ColumnFamilies";
        assert!(!wrap(&jmx, system, "WriteCount").send_metric());
    }

    #[test]
    fn test_attribute_alias_and_type() {
        let jmx = conf(
            r#"
- include:
    domain: org.apache.activemq
    Type: Queue
    attribute:
      EnqueueCount:
        alias: activemq.queue.enqueue_count
        metric_type: counter
      QueueSize:
"#,
        );
        let bean = "org.apache.activemq:BrokerName=b1,Destination=q,Type=Queue";

        let enqueue = wrap(&jmx, bean, "EnqueueCount");
        assert!(enqueue.send_metric());
        assert_eq!(enqueue.metric_name(), "activemq.queue.enqueue_count");
        assert_eq!(enqueue.metric_type(), MetricType::Counter);

        let size = wrap(&jmx, bean, "QueueSize");
        assert!(size.send_metric());
        assert_eq!(size.metric_name(), "jmx.org.apache.activemq.queue_size");
        assert_eq!(size.metric_type(), MetricType::Gauge);

        assert!(!wrap(&jmx, bean, "DequeueCount").send_metric());
    }

    #[test]
    fn test_any_filter_accepts() {
        let jmx = conf(
            r#"
- include:
    domain: a
- include:
    bean: "b:type=*"
"#,
        );
        assert!(wrap(&jmx, "a:type=X", "v").send_metric());
        assert!(wrap(&jmx, "b:type=Y", "v").send_metric());
        assert!(!wrap(&jmx, "c:type=Z", "v").send_metric());
    }

    #[test]
    fn test_wildcard_is_anchored_and_literal() {
        let re = glob_to_regex("solr.*").unwrap();
        assert!(re.is_match("solr.core"));
        assert!(!re.is_match("solrXcore"));
        assert!(!re.is_match("my.solr.core"));
    }
}
