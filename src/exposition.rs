//! Text exposition output
//!
//! Renders check samples, service checks and the bridge's own metrics in the
//! Prometheus text format (version 0.0.4).
//!
//! ```text
//! # TYPE tomcat_threads_busy gauge
//! tomcat_threads_busy{device="http-8080",instance="tomcat-localhost-9012",name="http-8080",type="ThreadPool"} 3
//! ```
//!
//! Dotted metric names become underscored, `key:value` tags become labels
//! and a sample's device becomes the `device` label. A bare tag without a
//! `:` becomes a label with the value `true`.

use std::collections::{BTreeMap, HashMap};

use crate::catalog::MetricType;
use crate::check::{Sample, ServiceCheck, Status};

/// 출력할 메트릭 한 줄
#[derive(Debug, Clone, PartialEq)]
pub struct ExpositionMetric {
    pub name: String,
    pub metric_type: MetricType,
    pub help: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub value: f64,
}

impl ExpositionMetric {
    /// Create a new metric (name is sanitized)
    pub fn new(name: impl AsRef<str>, value: f64) -> Self {
        Self {
            name: sanitize_name(name.as_ref()),
            metric_type: MetricType::Gauge,
            help: None,
            labels: BTreeMap::new(),
            value,
        }
    }

    pub fn with_type(mut self, metric_type: MetricType) -> Self {
        self.metric_type = metric_type;
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Add a label (key is sanitized)
    pub fn with_label(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.labels.insert(sanitize_label(key.as_ref()), value.into());
        self
    }

    /// `key:value` 태그 목록을 label로 추가 (뒤에 온 값이 우선)
    pub fn with_tags(mut self, tags: &[String]) -> Self {
        for tag in tags {
            let (key, value) = tag.split_once(':').unwrap_or((tag.as_str(), "true"));
            self = self.with_label(key, value);
        }
        self
    }

    /// 샘플 변환
    pub fn from_sample(sample: &Sample) -> Self {
        let metric = Self::new(&sample.name, sample.value)
            .with_type(sample.metric_type)
            .with_tags(&sample.tags);
        match &sample.device {
            Some(device) => metric.with_label("device", device.clone()),
            None => metric,
        }
    }

    /// service check 변환 (OK면 1, 아니면 0)
    pub fn from_service_check(check: &ServiceCheck) -> Self {
        let value = if check.status == Status::Ok { 1.0 } else { 0.0 };
        Self::new(&check.name, value)
            .with_help("Service check status (1 = OK)")
            .with_tags(&check.tags)
            .with_label("status", check.status.to_string())
    }
}

/// 메트릭 이름 정리: `[a-zA-Z_:][a-zA-Z0-9_:]*`
pub fn sanitize_name(name: &str) -> String {
    sanitize(name, true)
}

/// label 이름 정리: `[a-zA-Z_][a-zA-Z0-9_]*`
pub fn sanitize_label(key: &str) -> String {
    sanitize(key, false)
}

fn sanitize(raw: &str, allow_colon: bool) -> String {
    let mut out = String::with_capacity(raw.len() + 1);
    for (i, c) in raw.chars().enumerate() {
        if i == 0 && c.is_ascii_digit() {
            out.push('_');
        }
        let keep = c.is_ascii_alphanumeric() || c == '_' || (allow_colon && c == ':');
        out.push(if keep { c } else { '_' });
    }
    if out.is_empty() {
        out.push('_');
    }
    out
}

/// Text format formatter
///
/// HELP and TYPE lines are emitted once per metric name, metrics with the
/// same name are grouped at the position of the first occurrence, and labels
/// are sorted.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFormatter;

impl TextFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Format metrics into the text exposition format
    pub fn format(&self, metrics: &[ExpositionMetric]) -> String {
        if metrics.is_empty() {
            return String::new();
        }

        let mut output = String::with_capacity(metrics.len() * 100);

        for (name, group) in Self::group_by_name(metrics) {
            if let Some(help) = &group[0].help {
                output.push_str(&format!("# HELP {} {}\n", name, Self::escape_help(help)));
            }
            output.push_str(&format!("# TYPE {} {}\n", name, group[0].metric_type.as_str()));

            for metric in group {
                output.push_str(&Self::format_metric_line(metric));
                output.push('\n');
            }
        }

        output
    }

    /// 샘플과 service check를 함께 출력
    pub fn render(&self, samples: &[Sample], service_checks: &[ServiceCheck]) -> String {
        let metrics: Vec<ExpositionMetric> = samples
            .iter()
            .map(ExpositionMetric::from_sample)
            .chain(service_checks.iter().map(ExpositionMetric::from_service_check))
            .collect();
        self.format(&metrics)
    }

    /// Group metrics by name, preserving order of first occurrence
    fn group_by_name(metrics: &[ExpositionMetric]) -> Vec<(&str, Vec<&ExpositionMetric>)> {
        let mut groups: HashMap<&str, Vec<&ExpositionMetric>> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();

        for metric in metrics {
            let name = metric.name.as_str();
            if !groups.contains_key(name) {
                order.push(name);
            }
            groups.entry(name).or_default().push(metric);
        }

        order
            .into_iter()
            .filter_map(|name| groups.remove(name).map(|g| (name, g)))
            .collect()
    }

    fn format_metric_line(metric: &ExpositionMetric) -> String {
        let mut line = metric.name.clone();

        if !metric.labels.is_empty() {
            let pairs: Vec<String> = metric
                .labels
                .iter()
                .map(|(k, v)| format!("{}=\"{}\"", k, Self::escape_label_value(v)))
                .collect();
            line.push('{');
            line.push_str(&pairs.join(","));
            line.push('}');
        }

        line.push(' ');
        line.push_str(&Self::format_value(metric.value));
        line
    }

    /// Format a numeric value
    ///
    /// - NaN → "NaN", ±Inf → "+Inf" / "-Inf"
    /// - Integers are formatted without decimal point
    /// - Large/small floats use scientific notation
    fn format_value(value: f64) -> String {
        if value.is_nan() {
            "NaN".to_string()
        } else if value.is_infinite() {
            if value.is_sign_positive() {
                "+Inf".to_string()
            } else {
                "-Inf".to_string()
            }
        } else if value.fract() == 0.0 && value.abs() < 1e15 {
            format!("{}", value as i64)
        } else if value.abs() >= 1e6 || (value.abs() < 1e-3 && value != 0.0) {
            format!("{:e}", value)
        } else {
            format!("{}", value)
        }
    }

    fn escape_help(help: &str) -> String {
        help.replace('\\', "\\\\").replace('\n', "\\n")
    }

    fn escape_label_value(value: &str) -> String {
        let mut escaped = String::with_capacity(value.len());
        for c in value.chars() {
            match c {
                '\\' => escaped.push_str("\\\\"),
                '"' => escaped.push_str("\\\""),
                '\n' => escaped.push_str("\\n"),
                _ => escaped.push(c),
            }
        }
        escaped
    }
}
