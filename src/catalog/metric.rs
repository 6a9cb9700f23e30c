//! JMX metric value object
//!
//! One `(bean, attribute, value)` triple from a dump, plus everything an
//! integration decides about it: final name, type, device and whether it is
//! sent at all.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::bean::{camel_to_snake, normalize_metric_name, BeanName, Tags};
use crate::error::BeanError;

/// Metric name prefix used when no integration sets one
pub const DEFAULT_PREFIX: &str = "jmx";

/// 메트릭 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// 현재 값
    #[default]
    Gauge,
    /// 단조 증가 값 (sink가 rate로 처리)
    Counter,
}

impl MetricType {
    /// 문자열 표현
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Gauge => "gauge",
            MetricType::Counter => "counter",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// dump에서 읽은 숫자 속성 하나
#[derive(Debug, Clone, PartialEq)]
pub struct JmxMetric {
    domain: String,
    bean_name: String,
    attribute_name: String,
    value: f64,
    tags: Tags,
    prefix: String,
    name_override: Option<String>,
    metric_type: MetricType,
    device: Option<String>,
    send: bool,
}

impl JmxMetric {
    /// `(bean, attribute, value)`에서 메트릭 생성
    ///
    /// Fails when the bean identifier is not `domain:key=value,...`.
    pub fn new(bean_name: &str, attribute_name: &str, value: f64) -> Result<Self, BeanError> {
        let BeanName { domain, tags } = BeanName::parse(bean_name)?;
        Ok(Self {
            domain,
            bean_name: bean_name.to_string(),
            attribute_name: attribute_name.to_string(),
            value,
            tags,
            prefix: DEFAULT_PREFIX.to_string(),
            name_override: None,
            metric_type: MetricType::Gauge,
            device: None,
            send: true,
        })
    }

    /// 기본 메트릭 이름의 prefix 설정
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn bean_name(&self) -> &str {
        &self.bean_name
    }

    pub fn attribute_name(&self) -> &str {
        &self.attribute_name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// 태그 값 조회
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn metric_type(&self) -> MetricType {
        self.metric_type
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// 최종 메트릭 이름
    ///
    /// The explicit override wins; otherwise `<prefix>.<domain>.<attribute>`
    /// normalized to snake case.
    pub fn metric_name(&self) -> String {
        match &self.name_override {
            Some(name) => name.clone(),
            None => self.default_metric_name(),
        }
    }

    /// override를 무시한 기본 이름
    pub fn default_metric_name(&self) -> String {
        normalize_metric_name(&format!(
            "{}.{}.{}",
            self.prefix, self.domain, self.attribute_name
        ))
    }

    pub fn name_override(&self) -> Option<&str> {
        self.name_override.as_deref()
    }

    pub fn set_name_override(&mut self, name: Option<String>) {
        self.name_override = name;
    }

    pub fn set_metric_type(&mut self, metric_type: MetricType) {
        self.metric_type = metric_type;
    }

    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    pub fn set_device(&mut self, device: Option<String>) {
        self.device = device;
    }

    /// sink로 보낼지 여부
    pub fn send_metric(&self) -> bool {
        self.send
    }

    pub fn set_send(&mut self, send: bool) {
        self.send = send;
    }

    /// `"key:value"` 태그 목록 (키 순)
    pub fn tagslist(&self) -> Vec<String> {
        self.tags
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v))
            .collect()
    }

    /// 키 또는 값이 일치하는 태그 제거
    pub fn filter_tags(&mut self, keys_to_remove: &[&str], values_to_remove: &[&str]) {
        self.tags.retain(|key, value| {
            !keys_to_remove.contains(&key.as_str()) && !values_to_remove.contains(&value.as_str())
        });
    }

    /// 속성 이름을 snake_case로 변환
    pub fn convert_name(&mut self) {
        self.attribute_name = camel_to_snake(&self.attribute_name);
    }
}

impl fmt::Display for JmxMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "domain:{}, bean_name:{}, {}={} tags={:?}",
            self.domain, self.bean_name, self.attribute_name, self.value, self.tags
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broker_metric() -> JmxMetric {
        JmxMetric::new(
            "org.apache.activemq:BrokerName=b1,Destination=orders,Type=Queue",
            "QueueSize",
            12.0,
        )
        .unwrap()
    }

    #[test]
    fn test_new_parses_bean() {
        let metric = broker_metric();
        assert_eq!(metric.domain(), "org.apache.activemq");
        assert_eq!(metric.tag("BrokerName"), Some("b1"));
        assert_eq!(metric.tag("Type"), Some("Queue"));
        assert_eq!(metric.value(), 12.0);
        assert!(metric.send_metric());
        assert_eq!(metric.device(), None);
        assert_eq!(metric.metric_type(), MetricType::Gauge);
    }

    #[test]
    fn test_new_rejects_invalid_bean() {
        assert!(JmxMetric::new("no-colon-here", "Count", 1.0).is_err());
    }

    #[test]
    fn test_default_metric_name() {
        let metric = JmxMetric::new("org.x:type=Broker,name=B1", "Size", 3.0)
            .unwrap()
            .with_prefix("mq");
        assert_eq!(metric.metric_name(), "mq.org.x.size");

        let metric = JmxMetric::new("java.lang:type=Memory", "HeapMemoryUsage.used", 1.0).unwrap();
        assert_eq!(metric.metric_name(), "jmx.java.lang.heap_memory_usage.used");
    }

    #[test]
    fn test_name_override_wins() {
        let mut metric = broker_metric();
        metric.set_name_override(Some("activemq.queue.size".to_string()));
        assert_eq!(metric.metric_name(), "activemq.queue.size");
        assert_eq!(metric.default_metric_name(), "jmx.org.apache.activemq.queue_size");
    }

    #[test]
    fn test_tagslist() {
        let metric = broker_metric();
        assert_eq!(
            metric.tagslist(),
            vec!["BrokerName:b1", "Destination:orders", "Type:Queue"]
        );
    }

    #[test]
    fn test_filter_tags_by_key_and_value() {
        let mut metric = broker_metric();
        metric.filter_tags(&["Type"], &["orders"]);
        assert_eq!(metric.tagslist(), vec!["BrokerName:b1"]);
        // bean name is untouched
        assert!(metric.bean_name().contains("Destination=orders"));
    }

    #[test]
    fn test_filter_tags_with_empty_lists_is_noop() {
        let mut metric = broker_metric();
        metric.filter_tags(&[], &[]);
        assert_eq!(metric.tags().len(), 3);
    }

    #[test]
    fn test_convert_name() {
        let mut metric = broker_metric();
        metric.convert_name();
        assert_eq!(metric.attribute_name(), "queue_size");
    }

    #[test]
    fn test_metric_type_serde() {
        let t: MetricType = serde_json::from_str("\"counter\"").unwrap();
        assert_eq!(t, MetricType::Counter);
        assert_eq!(serde_json::to_string(&MetricType::Gauge).unwrap(), "\"gauge\"");
    }
}
