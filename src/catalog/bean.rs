//! MBean ObjectName codec
//!
//! Splits `domain:k1=v1,k2=v2` identifiers and normalizes attribute names
//! into metric-name form.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::error::BeanError;

/// Bean 태그 맵 (키 -> 값)
pub type Tags = BTreeMap<String, String>;

// 대문자로 시작하는 단어 앞 (예: "HeapMemory" -> "Heap_Memory")
static FIRST_CAP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.)([A-Z][a-z]+)").expect("static regex"));
// 소문자/숫자 뒤의 대문자 (예: "jvmGC" -> "jvm_GC")
static ALL_CAP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("static regex"));
static ILLEGAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^a-zA-Z0-9_.]+)|(^[^a-zA-Z]+)").expect("static regex"));
static DOT_UNDERSCORE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_*\._*").expect("static regex"));

/// 파싱된 ObjectName
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeanName {
    /// 도메인 (예: "java.lang")
    pub domain: String,
    /// 속성 태그 (예: {"type": "Memory"})
    pub tags: Tags,
}

impl BeanName {
    /// ObjectName 문자열 파싱
    ///
    /// # Limitations
    /// - Quoted keys/values are NOT supported; a `,` inside a quoted value
    ///   splits the segment
    pub fn parse(identifier: &str) -> Result<Self, BeanError> {
        let (domain, rest) =
            identifier
                .split_once(':')
                .ok_or_else(|| BeanError::MalformedIdentifier {
                    identifier: identifier.to_string(),
                    reason: "missing ':' between domain and tags".to_string(),
                })?;

        let mut tags = Tags::new();
        for segment in rest.split(',') {
            let (key, value) =
                segment
                    .split_once('=')
                    .ok_or_else(|| BeanError::MalformedIdentifier {
                        identifier: identifier.to_string(),
                        reason: format!("tag segment '{}' has no '='", segment),
                    })?;
            tags.insert(key.trim().to_string(), value.trim().to_string());
        }

        Ok(Self {
            domain: domain.to_string(),
            tags,
        })
    }

    /// 정규화된 ObjectName 문자열 (태그는 키 순으로 정렬)
    pub fn canonical(&self) -> String {
        let tags: Vec<String> = self
            .tags
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("{}:{}", self.domain, tags.join(","))
    }
}

/// Bean 식별자의 도메인 부분
///
/// Identifiers without a `:` are treated as all-domain; they will be rejected
/// later when a metric is built from them.
pub fn bean_domain(identifier: &str) -> &str {
    identifier
        .split_once(':')
        .map_or(identifier, |(domain, _)| domain)
}

/// CamelCase -> snake_case
pub fn camel_to_snake(name: &str) -> String {
    let name = FIRST_CAP_RE.replace_all(name, "${1}_${2}");
    ALL_CAP_RE.replace_all(&name, "${1}_${2}").to_lowercase()
}

/// 메트릭 이름 정규화
///
/// Snake-cases the name, replaces characters outside `[a-zA-Z0-9_.]` (and a
/// leading non-letter run) with `_`, folds underscores hugging a dot into
/// the dot, and strips leading/trailing underscores.
pub fn normalize_metric_name(name: &str) -> String {
    let snake = camel_to_snake(name);
    let replaced = ILLEGAL_RE.replace_all(&snake, "_");
    DOT_UNDERSCORE_RE
        .replace_all(&replaced, ".")
        .trim_matches('_')
        .to_string()
}
