//! ActiveMQ broker and queue metrics

use super::{
    joined_tags, AllowList, AllowRule, DeviceStrategy, InclusionPolicy, Integration, MetricName,
    NameStrategy,
};
use crate::catalog::{JmxMetric, MetricType};

const QUEUE: (&str, &str) = ("Type", "Queue");
const BROKER: (&str, &str) = ("Type", "Broker");

const RULES: &[AllowRule] = &[
    AllowRule::new("AverageEnqueueTime", QUEUE, "activemq.queue.avg_enqueue_time", MetricType::Gauge),
    AllowRule::new("ConsumerCount", QUEUE, "activemq.queue.consumer_count", MetricType::Gauge),
    AllowRule::new("ProducerCount", QUEUE, "activemq.queue.producer_count", MetricType::Gauge),
    AllowRule::new("MaxEnqueueTime", QUEUE, "activemq.queue.max_enqueue_time", MetricType::Gauge),
    AllowRule::new("MinEnqueueTime", QUEUE, "activemq.queue.min_enqueue_time", MetricType::Gauge),
    AllowRule::new("MemoryPercentUsage", QUEUE, "activemq.queue.memory_pct", MetricType::Gauge),
    AllowRule::new("QueueSize", QUEUE, "activemq.queue.size", MetricType::Gauge),
    AllowRule::new("DequeueCount", QUEUE, "activemq.queue.dequeue_count", MetricType::Counter),
    AllowRule::new("DispatchCount", QUEUE, "activemq.queue.dispatch_count", MetricType::Counter),
    AllowRule::new("EnqueueCount", QUEUE, "activemq.queue.enqueue_count", MetricType::Counter),
    AllowRule::new("ExpiredCount", QUEUE, "activemq.queue.expired_count", MetricType::Counter),
    AllowRule::new("InFlightCount", QUEUE, "activemq.queue.in_flight_count", MetricType::Counter),
    AllowRule::new("MemoryPercentUsage", BROKER, "activemq.broker.memory_pct", MetricType::Gauge),
    AllowRule::new("StorePercentUsage", BROKER, "activemq.broker.store_pct", MetricType::Gauge),
    AllowRule::new("TempPercentUsage", BROKER, "activemq.broker.temp_pct", MetricType::Gauge),
];

/// `activemq` integration
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveMq;

impl ActiveMq {
    pub const NAME: &'static str = "activemq";
    pub const DOMAIN: &'static str = "org.apache.activemq";
    pub const ALLOW_LIST: AllowList = AllowList::new(RULES);
}

impl NameStrategy for ActiveMq {
    fn metric_name(&self, metric: &JmxMetric) -> Option<MetricName> {
        Self::ALLOW_LIST
            .lookup(metric)
            .map(|r| MetricName::new(r.name, r.metric_type))
    }
}

impl DeviceStrategy for ActiveMq {
    /// 큐는 `broker:destination`, 브로커는 broker 이름
    fn device(&self, metric: &JmxMetric) -> Option<String> {
        joined_tags(metric, &["BrokerName", "Destination"])
            .or_else(|| metric.tag("BrokerName").map(str::to_string))
    }
}

impl InclusionPolicy for ActiveMq {
    fn include(&self, metric: &JmxMetric) -> bool {
        Self::ALLOW_LIST.lookup(metric).is_some()
    }
}

impl Integration for ActiveMq {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn domains(&self) -> Option<Vec<String>> {
        Some(vec![Self::DOMAIN.to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MetricFactory;
    use crate::integration::Profile;

    fn wrap(bean: &str, attribute: &str) -> JmxMetric {
        Profile::new(&ActiveMq, &[]).wrap(bean, attribute, 5.0).unwrap()
    }

    #[test]
    fn test_queue_metric() {
        let metric = wrap(
            "org.apache.activemq:BrokerName=b1,Destination=orders,Type=Queue",
            "QueueSize",
        );
        assert!(metric.send_metric());
        assert_eq!(metric.metric_name(), "activemq.queue.size");
        assert_eq!(metric.metric_type(), MetricType::Gauge);
        assert_eq!(metric.device(), Some("b1:orders"));
    }

    #[test]
    fn test_counter_type() {
        let metric = wrap(
            "org.apache.activemq:BrokerName=b1,Destination=orders,Type=Queue",
            "EnqueueCount",
        );
        assert_eq!(metric.metric_type(), MetricType::Counter);
    }

    #[test]
    fn test_same_attribute_keyed_by_type() {
        let queue = wrap(
            "org.apache.activemq:BrokerName=b1,Destination=orders,Type=Queue",
            "MemoryPercentUsage",
        );
        let broker = wrap("org.apache.activemq:BrokerName=b1,Type=Broker", "MemoryPercentUsage");

        assert_eq!(queue.metric_name(), "activemq.queue.memory_pct");
        assert_eq!(broker.metric_name(), "activemq.broker.memory_pct");
        assert_eq!(broker.device(), Some("b1"));
    }

    #[test]
    fn test_unlisted_attribute_is_not_sent() {
        let metric = wrap("org.apache.activemq:BrokerName=b1,Type=Broker", "QueueSize");
        assert!(!metric.send_metric());

        let metric = wrap("org.apache.activemq:BrokerName=b1,Type=Broker", "Uptime");
        assert!(!metric.send_metric());
    }
}
