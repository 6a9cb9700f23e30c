//! Metric catalog
//!
//! Turns a dump into an ordered, queryable list of [`JmxMetric`]s.
//!
//! Only numeric leaves become metrics: a number directly under a bean
//! attribute, or a number one level down inside a composite attribute
//! (named `<attribute>.<key>`). Anything else is skipped silently.
//!
//! # Example
//!
//! ```ignore
//! use rjmx_bridge::catalog::{Catalog, DefaultFactory, MetricQuery};
//!
//! let catalog = Catalog::build(&dump, &DefaultFactory::default());
//! let threads = catalog.get(&MetricQuery::new().attribute("ThreadCount").tag("type", "Threading"));
//! ```

mod bean;
mod metric;

pub use bean::{bean_domain, camel_to_snake, normalize_metric_name, BeanName, Tags};
pub use metric::{JmxMetric, MetricType, DEFAULT_PREFIX};

use crate::collector::Dump;
use crate::error::BeanError;

/// dump leaf를 메트릭으로 감싸는 생성자
///
/// Integrations implement this to stamp their naming, device and inclusion
/// decisions onto every metric as it is created.
pub trait MetricFactory {
    /// `(bean, attribute, value)`에서 메트릭 생성
    fn wrap(&self, bean_name: &str, attribute_name: &str, value: f64)
        -> Result<JmxMetric, BeanError>;

    /// 숫자 문자열도 숫자로 취급할지 여부
    fn coerce_numeric_strings(&self) -> bool {
        false
    }
}

/// prefix만 적용하는 기본 생성자
#[derive(Debug, Clone)]
pub struct DefaultFactory {
    prefix: String,
}

impl DefaultFactory {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for DefaultFactory {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl MetricFactory for DefaultFactory {
    fn wrap(
        &self,
        bean_name: &str,
        attribute_name: &str,
        value: f64,
    ) -> Result<JmxMetric, BeanError> {
        Ok(JmxMetric::new(bean_name, attribute_name, value)?.with_prefix(self.prefix.as_str()))
    }
}

/// 카탈로그 조회 조건
///
/// Every filter that is set must match (logical AND). Tag filters require
/// the key to be present with exactly that value.
#[derive(Debug, Clone, Default)]
pub struct MetricQuery<'a> {
    domain: Option<&'a str>,
    attribute_name: Option<&'a str>,
    bean_name: Option<&'a str>,
    tags: Vec<(&'a str, &'a str)>,
}

impl<'a> MetricQuery<'a> {
    /// 조건 없는 조회 (전체)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn domain(mut self, domain: &'a str) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn attribute(mut self, attribute_name: &'a str) -> Self {
        self.attribute_name = Some(attribute_name);
        self
    }

    pub fn bean(mut self, bean_name: &'a str) -> Self {
        self.bean_name = Some(bean_name);
        self
    }

    pub fn tag(mut self, key: &'a str, value: &'a str) -> Self {
        self.tags.push((key, value));
        self
    }

    /// 메트릭이 모든 조건을 만족하는지 확인
    pub fn matches(&self, metric: &JmxMetric) -> bool {
        self.domain.map_or(true, |d| metric.domain() == d)
            && self
                .attribute_name
                .map_or(true, |a| metric.attribute_name() == a)
            && self.bean_name.map_or(true, |b| metric.bean_name() == b)
            && self.tags.iter().all(|(k, v)| metric.tag(k) == Some(*v))
    }
}

/// dump 하나에서 만든 메트릭 목록
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    metrics: Vec<JmxMetric>,
    rejected: Vec<BeanError>,
}

impl Catalog {
    /// dump에서 카탈로그 생성
    ///
    /// A bean whose identifier cannot be parsed is dropped as a whole and its
    /// error kept in [`Catalog::rejected`]; the rest of the dump is still
    /// processed.
    pub fn build<F>(dump: &Dump, factory: &F) -> Self
    where
        F: MetricFactory + ?Sized,
    {
        let coerce = factory.coerce_numeric_strings();
        let mut metrics = Vec::new();
        let mut rejected = Vec::new();

        'beans: for (bean_name, attributes) in dump.beans() {
            for (attribute, value) in attributes {
                let leaves: Vec<(String, f64)> = match value.as_number(coerce) {
                    Some(n) => vec![(attribute.clone(), n)],
                    None => value
                        .as_object()
                        .map(|nested| {
                            nested
                                .iter()
                                .filter_map(|(key, v)| {
                                    v.as_number(coerce)
                                        .map(|n| (format!("{}.{}", attribute, key), n))
                                })
                                .collect()
                        })
                        .unwrap_or_default(),
                };

                for (name, n) in leaves {
                    match factory.wrap(bean_name, &name, n) {
                        Ok(metric) => metrics.push(metric),
                        Err(e) => {
                            rejected.push(e);
                            continue 'beans;
                        }
                    }
                }
            }
        }

        Self { metrics, rejected }
    }

    /// 이미 만든 메트릭으로 카탈로그 구성
    pub fn from_metrics(metrics: Vec<JmxMetric>) -> Self {
        Self {
            metrics,
            rejected: Vec::new(),
        }
    }

    /// 조건에 맞는 메트릭 (순서 유지)
    pub fn get(&self, query: &MetricQuery<'_>) -> Vec<&JmxMetric> {
        self.metrics.iter().filter(|m| query.matches(m)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JmxMetric> {
        self.metrics.iter()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// 파싱에 실패해 버려진 bean
    pub fn rejected(&self) -> &[BeanError] {
        &self.rejected
    }

    pub fn into_metrics(self) -> Vec<JmxMetric> {
        self.metrics
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a JmxMetric;
    type IntoIter = std::slice::Iter<'a, JmxMetric>;

    fn into_iter(self) -> Self::IntoIter {
        self.metrics.iter()
    }
}
