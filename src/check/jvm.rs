//! Standard JVM metrics
//!
//! Every check reports the same handful of `java.lang` beans under fixed
//! `jvm.*` names, regardless of which integration runs it.

use serde::{Deserialize, Serialize};

use super::sink::{MetricSink, Sample};
use crate::catalog::{bean_domain, Catalog, DefaultFactory, MetricQuery};
use crate::collector::Dump;
use crate::error::{BeanError, CheckError};

/// JVM 표준 bean 도메인
pub const JVM_DOMAIN: &str = "java.lang";

/// GC collector bean 이름과 메트릭 alias
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcCollector {
    /// `java.lang:type=GarbageCollector,name=<name>`
    pub name: String,
    /// `jvm.gc.<alias>.count` / `jvm.gc.<alias>.time`
    pub alias: String,
}

impl GcCollector {
    pub fn new(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: alias.into(),
        }
    }
}

/// 기본 collector (ParNew, ConcurrentMarkSweep)
pub fn default_collectors() -> Vec<GcCollector> {
    vec![
        GcCollector::new("ParNew", "parnew"),
        GcCollector::new("ConcurrentMarkSweep", "cms"),
    ]
}

struct Lookup<'a> {
    metric: String,
    attribute: &'a str,
    tags: Vec<(&'a str, &'a str)>,
}

/// JVM 표준 메트릭 추출
///
/// Each lookup must match exactly one `java.lang` metric. All lookups are
/// resolved before anything reaches the sink, so a missing bean means nothing
/// from this function is emitted. Returns the `java.lang` beans whose
/// identifiers could not be parsed.
pub fn extract_jvm_metrics<S>(
    dump: &Dump,
    tags: &[String],
    collectors: &[GcCollector],
    sink: &mut S,
) -> Result<Vec<BeanError>, CheckError>
where
    S: MetricSink + ?Sized,
{
    let jvm_dump = dump.filtered(|bean| bean_domain(bean) == JVM_DOMAIN);
    let catalog = Catalog::build(&jvm_dump, &DefaultFactory::default());

    let mut lookups = vec![
        Lookup {
            metric: "jvm.thread_count".to_string(),
            attribute: "ThreadCount",
            tags: vec![("type", "Threading")],
        },
        Lookup {
            metric: "jvm.heap_memory".to_string(),
            attribute: "HeapMemoryUsage.used",
            tags: vec![("type", "Memory")],
        },
        Lookup {
            metric: "jvm.non_heap_memory".to_string(),
            attribute: "NonHeapMemoryUsage.used",
            tags: vec![("type", "Memory")],
        },
    ];
    for collector in collectors {
        for (suffix, attribute) in [("count", "CollectionCount"), ("time", "CollectionTime")] {
            lookups.push(Lookup {
                metric: format!("jvm.gc.{}.{}", collector.alias, suffix),
                attribute,
                tags: vec![("type", "GarbageCollector"), ("name", collector.name.as_str())],
            });
        }
    }

    let mut samples = Vec::with_capacity(lookups.len());
    for lookup in &lookups {
        let query = lookup
            .tags
            .iter()
            .fold(MetricQuery::new().attribute(lookup.attribute), |q, (k, v)| {
                q.tag(k, v)
            });
        let found = catalog.get(&query);

        let metric = match found.as_slice() {
            [one] => *one,
            [] => {
                return Err(CheckError::MissingWellKnownBean {
                    bean: describe(&lookup.tags),
                    attribute: lookup.attribute.to_string(),
                })
            }
            many => {
                return Err(CheckError::AmbiguousWellKnownBean {
                    bean: describe(&lookup.tags),
                    attribute: lookup.attribute.to_string(),
                    count: many.len(),
                })
            }
        };

        let mut sample_tags = tags.to_vec();
        sample_tags.extend(metric.tagslist());
        samples.push(Sample::gauge(lookup.metric.clone(), metric.value(), sample_tags));
    }

    for sample in samples {
        sink.submit(sample);
    }
    Ok(catalog.rejected().to_vec())
}

fn describe(tags: &[(&str, &str)]) -> String {
    let tags: Vec<String> = tags.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!("{}:{}", JVM_DOMAIN, tags.join(","))
}
