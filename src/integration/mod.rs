//! Integration profiles
//!
//! An integration decides, for every metric the catalog builds, what it is
//! called, which device it belongs to and whether it is sent at all. Each
//! decision is its own capability trait; an [`Integration`] bundles the three
//! with the domains it reads.
//!
//! | name | domains | style |
//! |------|---------|-------|
//! | `activemq` | `org.apache.activemq` | allow-list |
//! | `solr` | anything containing `solr` | allow-list, numeric strings |
//! | `cassandra` | `org.apache.cassandra.{db,internal,net}` | deny-list |
//! | `tomcat` | `Catalina` | allow-list |
//! | `jmx` | every domain | user `conf` filters |

pub mod activemq;
pub mod cassandra;
pub mod custom;
pub mod solr;
pub mod tomcat;

use std::fmt;

use crate::catalog::{JmxMetric, MetricFactory, MetricType};
use crate::error::{BeanError, CheckError};

pub use activemq::ActiveMq;
pub use cassandra::Cassandra;
pub use custom::{CustomJmx, FilterConfig};
pub use solr::Solr;
pub use tomcat::Tomcat;

/// 설정에서 사용할 수 있는 integration 이름
pub const KNOWN_INTEGRATIONS: &[&str] = &["activemq", "cassandra", "jmx", "solr", "tomcat"];

/// 최종 메트릭 이름과 타입
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricName {
    pub name: String,
    pub metric_type: MetricType,
}

impl MetricName {
    pub fn new(name: impl Into<String>, metric_type: MetricType) -> Self {
        Self {
            name: name.into(),
            metric_type,
        }
    }
}

/// 메트릭 이름 결정
pub trait NameStrategy {
    /// `None`이면 기본 이름 (`<prefix>.<domain>.<attribute>`, gauge)
    fn metric_name(&self, metric: &JmxMetric) -> Option<MetricName>;
}

/// device 결정
pub trait DeviceStrategy {
    fn device(&self, _metric: &JmxMetric) -> Option<String> {
        None
    }
}

/// 전송 여부 결정
pub trait InclusionPolicy {
    fn include(&self, metric: &JmxMetric) -> bool;
}

/// 도메인 매칭 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DomainMatch {
    /// 도메인 문자열이 정확히 일치
    #[default]
    Exact,
    /// 도메인 문자열이 목록 항목을 포함
    Contains,
}

impl DomainMatch {
    pub fn matches(&self, domain: &str, wanted: &str) -> bool {
        match self {
            DomainMatch::Exact => domain == wanted,
            DomainMatch::Contains => domain.contains(wanted),
        }
    }
}

/// integration 하나
pub trait Integration: NameStrategy + DeviceStrategy + InclusionPolicy + Send + Sync + fmt::Debug {
    /// integration 이름 (메트릭 prefix, service check 이름)
    fn name(&self) -> &str;

    /// 읽을 도메인 (`None`이면 전체)
    fn domains(&self) -> Option<Vec<String>>;

    fn domain_match(&self) -> DomainMatch {
        DomainMatch::Exact
    }

    fn coerce_numeric_strings(&self) -> bool {
        false
    }

    /// 이름/device/포함 결정 전에 메트릭 손질
    fn prepare(&self, _metric: &mut JmxMetric) {}
}

/// allow-list 항목: 속성 + 필수 태그 -> (이름, 타입)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowRule {
    pub attribute: &'static str,
    pub tag: (&'static str, &'static str),
    pub name: &'static str,
    pub metric_type: MetricType,
}

impl AllowRule {
    pub const fn new(
        attribute: &'static str,
        tag: (&'static str, &'static str),
        name: &'static str,
        metric_type: MetricType,
    ) -> Self {
        Self {
            attribute,
            tag,
            name,
            metric_type,
        }
    }
}

/// 속성별 allow-list
#[derive(Debug, Clone, Copy)]
pub struct AllowList {
    rules: &'static [AllowRule],
}

impl AllowList {
    pub const fn new(rules: &'static [AllowRule]) -> Self {
        Self { rules }
    }

    /// 메트릭에 맞는 첫 항목
    pub fn lookup(&self, metric: &JmxMetric) -> Option<&'static AllowRule> {
        self.rules.iter().find(|rule| {
            rule.attribute == metric.attribute_name() && metric.tag(rule.tag.0) == Some(rule.tag.1)
        })
    }

    pub fn rules(&self) -> &'static [AllowRule] {
        self.rules
    }
}

/// 속성 deny-list와 namespace 규칙
#[derive(Debug, Clone, Copy)]
pub struct DenyList {
    pub attributes: &'static [&'static str],
    /// 이 태그 값을 가진 메트릭은 모두 제외
    pub namespace: Option<(&'static str, &'static str)>,
}

impl DenyList {
    pub fn denies(&self, metric: &JmxMetric) -> bool {
        self.attributes.contains(&metric.attribute_name())
            || self
                .namespace
                .is_some_and(|(key, value)| metric.tag(key) == Some(value))
    }
}

/// 이름으로 integration 생성
///
/// `conf` is only read by the generic `jmx` integration.
pub fn build(name: &str, conf: &[FilterConfig]) -> Result<Box<dyn Integration>, CheckError> {
    let integration: Box<dyn Integration> = match name {
        "activemq" => Box::new(ActiveMq),
        "cassandra" => Box::new(Cassandra),
        "jmx" => Box::new(CustomJmx::new(conf)?),
        "solr" => Box::new(Solr),
        "tomcat" => Box::new(Tomcat),
        other => return Err(CheckError::UnknownIntegration(other.to_string())),
    };
    Ok(integration)
}

/// integration + 인스턴스 제외 목록을 묶은 메트릭 생성자
pub struct Profile<'a> {
    integration: &'a dyn Integration,
    exclude_attributes: &'a [String],
}

impl<'a> Profile<'a> {
    pub fn new(integration: &'a dyn Integration, exclude_attributes: &'a [String]) -> Self {
        Self {
            integration,
            exclude_attributes,
        }
    }
}

impl MetricFactory for Profile<'_> {
    fn wrap(
        &self,
        bean_name: &str,
        attribute_name: &str,
        value: f64,
    ) -> Result<JmxMetric, BeanError> {
        let mut metric =
            JmxMetric::new(bean_name, attribute_name, value)?.with_prefix(self.integration.name());
        self.integration.prepare(&mut metric);

        if let Some(MetricName { name, metric_type }) = self.integration.metric_name(&metric) {
            metric.set_name_override(Some(name));
            metric.set_metric_type(metric_type);
        }
        metric.set_device(self.integration.device(&metric));

        let excluded = self
            .exclude_attributes
            .iter()
            .any(|a| a == metric.attribute_name());
        metric.set_send(!excluded && self.integration.include(&metric));
        Ok(metric)
    }

    fn coerce_numeric_strings(&self) -> bool {
        self.integration.coerce_numeric_strings()
    }
}

/// 필요한 태그를 모두 `:`로 이은 값 (하나라도 없으면 `None`)
pub(crate) fn joined_tags(metric: &JmxMetric, keys: &[&str]) -> Option<String> {
    let parts: Option<Vec<&str>> = keys.iter().map(|k| metric.tag(k)).collect();
    parts.map(|p| p.join(":"))
}
