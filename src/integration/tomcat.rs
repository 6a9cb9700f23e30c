//! Tomcat thread pool, request processor, cache, JSP and servlet metrics

use super::{
    joined_tags, AllowList, AllowRule, DeviceStrategy, InclusionPolicy, Integration, MetricName,
    NameStrategy,
};
use crate::catalog::{JmxMetric, MetricType};

const THREAD_POOL: (&str, &str) = ("type", "ThreadPool");
const PROCESSOR: (&str, &str) = ("type", "GlobalRequestProcessor");
const CACHE: (&str, &str) = ("type", "Cache");
const JSP: (&str, &str) = ("type", "JspMonitor");
const SERVLET: (&str, &str) = ("j2eeType", "Servlet");

const RULES: &[AllowRule] = &[
    AllowRule::new("maxThreads", THREAD_POOL, "tomcat.threads.max", MetricType::Gauge),
    AllowRule::new("currentThreadCount", THREAD_POOL, "tomcat.threads.count", MetricType::Gauge),
    AllowRule::new("currentThreadsBusy", THREAD_POOL, "tomcat.threads.busy", MetricType::Gauge),
    AllowRule::new("bytesSent", PROCESSOR, "tomcat.bytes_sent", MetricType::Counter),
    AllowRule::new("bytesReceived", PROCESSOR, "tomcat.bytes_rcvd", MetricType::Counter),
    AllowRule::new("processingTime", PROCESSOR, "tomcat.processing_time", MetricType::Counter),
    AllowRule::new("errorCount", PROCESSOR, "tomcat.error_count", MetricType::Counter),
    AllowRule::new("requestCount", PROCESSOR, "tomcat.request_count", MetricType::Counter),
    AllowRule::new("maxTime", PROCESSOR, "tomcat.max_time", MetricType::Gauge),
    AllowRule::new("accessCount", CACHE, "tomcat.cache.access_count", MetricType::Counter),
    AllowRule::new("hitsCount", CACHE, "tomcat.cache.hits_count", MetricType::Counter),
    AllowRule::new("jspCount", JSP, "tomcat.jsp.count", MetricType::Counter),
    AllowRule::new("jspReloadCount", JSP, "tomcat.jsp.reload_count", MetricType::Counter),
    AllowRule::new("errorCount", SERVLET, "tomcat.servlet.error_count", MetricType::Counter),
    AllowRule::new(
        "processingTime",
        SERVLET,
        "tomcat.servlet.processing_time",
        MetricType::Counter,
    ),
    AllowRule::new("requestCount", SERVLET, "tomcat.servlet.request_count", MetricType::Counter),
];

/// `tomcat` integration
#[derive(Debug, Clone, Copy, Default)]
pub struct Tomcat;

impl Tomcat {
    pub const NAME: &'static str = "tomcat";
    pub const DOMAIN: &'static str = "Catalina";
    pub const ALLOW_LIST: AllowList = AllowList::new(RULES);
}

impl NameStrategy for Tomcat {
    fn metric_name(&self, metric: &JmxMetric) -> Option<MetricName> {
        Self::ALLOW_LIST
            .lookup(metric)
            .map(|r| MetricName::new(r.name, r.metric_type))
    }
}

impl DeviceStrategy for Tomcat {
    fn device(&self, metric: &JmxMetric) -> Option<String> {
        if metric.tag("j2eeType") == Some("Servlet") {
            return joined_tags(
                metric,
                &["J2EEApplication", "J2EEServer", "WebModule", "name"],
            );
        }
        match metric.tag("type")? {
            "ThreadPool" | "GlobalRequestProcessor" => metric.tag("name").map(str::to_string),
            "Cache" => joined_tags(metric, &["host", "path"]),
            "JspMonitor" => joined_tags(metric, &["J2EEApplication", "J2EEServer", "WebModule"]),
            _ => None,
        }
    }
}

impl InclusionPolicy for Tomcat {
    fn include(&self, metric: &JmxMetric) -> bool {
        Self::ALLOW_LIST.lookup(metric).is_some()
    }
}

impl Integration for Tomcat {
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
        Profile::new(&Tomcat, &[]).wrap(bean, attribute, 2.0).unwrap()
    }

    #[test]
    fn test_thread_pool() {
        let metric = wrap("Catalina:type=ThreadPool,name=\"http-bio-8080\"", "currentThreadsBusy");
        assert_eq!(metric.metric_name(), "tomcat.threads.busy");
        assert_eq!(metric.device(), Some("\"http-bio-8080\""));
    }

    #[test]
    fn test_processor_and_servlet_share_attributes() {
        let processor = wrap(
            "Catalina:type=GlobalRequestProcessor,name=\"http-bio-8080\"",
            "requestCount",
        );
        let servlet = wrap(
            "Catalina:j2eeType=Servlet,name=default,WebModule=//localhost/,J2EEApplication=none,J2EEServer=none",
            "requestCount",
        );

        assert_eq!(processor.metric_name(), "tomcat.request_count");
        assert_eq!(servlet.metric_name(), "tomcat.servlet.request_count");
        assert_eq!(servlet.device(), Some("none:none://localhost/:default"));
        assert!(processor.send_metric() && servlet.send_metric());
    }

    #[test]
    fn test_cache_device() {
        let metric = wrap("Catalina:type=Cache,host=localhost,path=/manager", "hitsCount");
        assert_eq!(metric.metric_name(), "tomcat.cache.hits_count");
        assert_eq!(metric.device(), Some("localhost:/manager"));
    }

    #[test]
    fn test_jsp_device() {
        let metric = wrap(
            "Catalina:type=JspMonitor,name=jsp,WebModule=//localhost/docs,J2EEApplication=none,J2EEServer=none",
            "jspCount",
        );
        assert_eq!(metric.device(), Some("none:none://localhost/docs"));
    }

    #[test]
    fn test_unlisted_is_not_sent() {
        let metric = wrap("Catalina:type=Manager,host=localhost,context=/", "activeSessions");
        assert!(!metric.send_metric());
        assert_eq!(metric.device(), None);
    }
}
