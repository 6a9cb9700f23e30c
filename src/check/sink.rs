//! Emission sink
//!
//! Where a check cycle sends its samples and service-health statuses.

use std::fmt;

use serde::Serialize;

use crate::catalog::MetricType;

/// 메트릭 샘플 하나
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub name: String,
    pub value: f64,
    /// `"key:value"` 태그
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    pub metric_type: MetricType,
}

impl Sample {
    /// gauge 샘플 생성
    pub fn gauge(name: impl Into<String>, value: f64, tags: Vec<String>) -> Self {
        Self {
            name: name.into(),
            value,
            tags,
            device: None,
            metric_type: MetricType::Gauge,
        }
    }
}

/// Service check 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Status {
    /// 상태 코드 (OK=0, WARNING=1, CRITICAL=2, UNKNOWN=3)
    pub fn code(&self) -> u8 {
        match self {
            Status::Ok => 0,
            Status::Warning => 1,
            Status::Critical => 2,
            Status::Unknown => 3,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Ok => "OK",
            Status::Warning => "WARNING",
            Status::Critical => "CRITICAL",
            Status::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Service check 결과
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceCheck {
    pub name: String,
    pub status: Status,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// check cycle 출력 대상
pub trait MetricSink {
    fn submit(&mut self, sample: Sample);

    fn service_check(&mut self, check: ServiceCheck);
}

/// 메모리에 모으는 sink
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectingSink {
    pub samples: Vec<Sample>,
    pub service_checks: Vec<ServiceCheck>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 이름으로 샘플 조회
    pub fn find(&self, name: &str) -> Vec<&Sample> {
        self.samples.iter().filter(|s| s.name == name).collect()
    }

    /// 다른 sink의 내용을 이어 붙임
    pub fn extend(&mut self, other: CollectingSink) {
        self.samples.extend(other.samples);
        self.service_checks.extend(other.service_checks);
    }
}

impl MetricSink for CollectingSink {
    fn submit(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    fn service_check(&mut self, check: ServiceCheck) {
        self.service_checks.push(check);
    }
}
