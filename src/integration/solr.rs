//! Solr searcher, cache and search handler metrics
//!
//! The JMX domain depends on the Solr version (`solr`, `solr/`,
//! `solr/<core>`), so domains are matched by containment. Solr also reports
//! every attribute as a string.

use super::{
    AllowList, AllowRule, DeviceStrategy, DomainMatch, InclusionPolicy, Integration, MetricName,
    NameStrategy,
};
use crate::catalog::{JmxMetric, MetricType};

const SEARCHER: (&str, &str) = ("type", "searcher");
const FAST_LRU: (&str, &str) = ("id", "org.apache.solr.search.FastLRUCache");
const LRU: (&str, &str) = ("id", "org.apache.solr.search.LRUCache");
const SEARCH_HANDLER: (&str, &str) = ("id", "org.apache.solr.handler.component.SearchHandler");

const RULES: &[AllowRule] = &[
    AllowRule::new("maxDoc", SEARCHER, "solr.searcher.maxdoc", MetricType::Gauge),
    AllowRule::new("numDocs", SEARCHER, "solr.searcher.numdocs", MetricType::Gauge),
    AllowRule::new("warmupTime", SEARCHER, "solr.searcher.warmup", MetricType::Gauge),
    AllowRule::new("cumulative_lookups", FAST_LRU, "solr.cache.lookups", MetricType::Counter),
    AllowRule::new("cumulative_lookups", LRU, "solr.cache.lookups", MetricType::Counter),
    AllowRule::new("cumulative_hits", FAST_LRU, "solr.cache.hits", MetricType::Counter),
    AllowRule::new("cumulative_hits", LRU, "solr.cache.hits", MetricType::Counter),
    AllowRule::new("cumulative_inserts", FAST_LRU, "solr.cache.inserts", MetricType::Counter),
    AllowRule::new("cumulative_inserts", LRU, "solr.cache.inserts", MetricType::Counter),
    AllowRule::new("cumulative_evictions", FAST_LRU, "solr.cache.evictions", MetricType::Counter),
    AllowRule::new("cumulative_evictions", LRU, "solr.cache.evictions", MetricType::Counter),
    AllowRule::new("errors", SEARCH_HANDLER, "solr.search_handler.errors", MetricType::Counter),
    AllowRule::new("requests", SEARCH_HANDLER, "solr.search_handler.requests", MetricType::Counter),
    AllowRule::new("timeouts", SEARCH_HANDLER, "solr.search_handler.timeouts", MetricType::Counter),
    AllowRule::new("totalTime", SEARCH_HANDLER, "solr.search_handler.time", MetricType::Counter),
    AllowRule::new(
        "avgTimePerRequest",
        SEARCH_HANDLER,
        "solr.search_handler.avg_time_per_req",
        MetricType::Gauge,
    ),
    AllowRule::new(
        "avgRequestsPerSecond",
        SEARCH_HANDLER,
        "solr.search_handler.avg_requests_per_sec",
        MetricType::Gauge,
    ),
];

/// `solr` integration
#[derive(Debug, Clone, Copy, Default)]
pub struct Solr;

impl Solr {
    pub const NAME: &'static str = "solr";
    pub const DOMAIN: &'static str = "solr";
    pub const ALLOW_LIST: AllowList = AllowList::new(RULES);
}

impl NameStrategy for Solr {
    fn metric_name(&self, metric: &JmxMetric) -> Option<MetricName> {
        Self::ALLOW_LIST
            .lookup(metric)
            .map(|r| MetricName::new(r.name, r.metric_type))
    }
}

impl DeviceStrategy for Solr {
    fn device(&self, metric: &JmxMetric) -> Option<String> {
        metric
            .tag("type")
            .filter(|t| *t != "searcher")
            .map(str::to_string)
    }
}

impl InclusionPolicy for Solr {
    fn include(&self, metric: &JmxMetric) -> bool {
        Self::ALLOW_LIST.lookup(metric).is_some()
    }
}

impl Integration for Solr {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn domains(&self) -> Option<Vec<String>> {
        Some(vec![Self::DOMAIN.to_string()])
    }

    fn domain_match(&self) -> DomainMatch {
        DomainMatch::Contains
    }

    fn coerce_numeric_strings(&self) -> bool {
        true
    }
}
