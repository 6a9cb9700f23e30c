//! jmxterm dump payload 파서
//!
//! `dump` 명령의 JSON 응답을 bean -> 속성 맵 구조로 변환합니다.
//!
//! ```text
//! {"org.apache.cassandra.db:instance=1826959904,type=DynamicEndpointSnitch":
//!     {"UpdateInterval": 100, "Scores": {}, "BadnessThreshold": 0.1},
//!  "java.lang:type=Memory":
//!     {"HeapMemoryUsage": {"used": 52428800, "max": 4294967296}}}
//! ```

use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::DumpError;

/// Bean 하나의 속성 맵 (속성 이름 -> 값)
pub type BeanAttributes = BTreeMap<String, AttributeValue>;

/// 개별 속성 값
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// 정수
    Integer(i64),
    /// 실수
    Float(f64),
    /// 문자열
    String(String),
    /// 불리언
    Boolean(bool),
    /// Null
    Null,
    /// 중첩 객체 (CompositeData)
    Object(BTreeMap<String, AttributeValue>),
    /// 배열
    Array(Vec<AttributeValue>),
}

impl AttributeValue {
    /// 숫자 leaf면 f64로 반환
    ///
    /// With `coerce_strings`, numeric-looking strings are parsed too. Strings
    /// that parse to NaN or infinity never count as numbers.
    pub fn as_number(&self, coerce_strings: bool) -> Option<f64> {
        match self {
            AttributeValue::Integer(i) => Some(*i as f64),
            AttributeValue::Float(f) => Some(*f),
            AttributeValue::String(s) if coerce_strings => {
                s.trim().parse::<f64>().ok().filter(|f| f.is_finite())
            }
            _ => None,
        }
    }

    /// 중첩 객체면 맵 반환
    pub fn as_object(&self) -> Option<&BTreeMap<String, AttributeValue>> {
        match self {
            AttributeValue::Object(map) => Some(map),
            _ => None,
        }
    }
}

impl From<Value> for AttributeValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => AttributeValue::Null,
            Value::Bool(b) => AttributeValue::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => AttributeValue::Integer(i),
                // u64 beyond i64::MAX and real numbers both land here
                None => n
                    .as_f64()
                    .map(AttributeValue::Float)
                    .unwrap_or(AttributeValue::Null),
            },
            Value::String(s) => AttributeValue::String(s),
            Value::Array(arr) => {
                AttributeValue::Array(arr.into_iter().map(AttributeValue::from).collect())
            }
            Value::Object(map) => AttributeValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, AttributeValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// 전체 bean 스냅샷
///
/// Beans are kept sorted by identifier so iteration, and therefore emission
/// order, is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dump {
    beans: BTreeMap<String, BeanAttributes>,
}

impl Dump {
    /// 빈 dump 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// jmxterm 출력 텍스트 파싱
    pub fn parse(text: &str) -> Result<Self, DumpError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json(value)
    }

    /// 이미 디코딩된 JSON 값에서 생성
    pub fn from_json(value: Value) -> Result<Self, DumpError> {
        let map = match value {
            Value::Object(map) => map,
            other => return Err(DumpError::NotAnObject(json_kind(&other))),
        };

        let mut beans = BTreeMap::new();
        for (bean, attrs) in map {
            let attrs = match attrs {
                Value::Object(attrs) => attrs,
                other => {
                    return Err(DumpError::BeanNotAnObject {
                        bean,
                        kind: json_kind(&other),
                    })
                }
            };
            let parsed: BeanAttributes = attrs
                .into_iter()
                .map(|(k, v)| (k, AttributeValue::from(v)))
                .collect();
            beans.insert(bean, parsed);
        }

        Ok(Self { beans })
    }

    /// Bean 추가 (기존 값 대체)
    pub fn insert(&mut self, bean: impl Into<String>, attributes: BeanAttributes) {
        self.beans.insert(bean.into(), attributes);
    }

    /// Bean 속성 조회
    pub fn get(&self, bean: &str) -> Option<&BeanAttributes> {
        self.beans.get(bean)
    }

    /// Bean 순회
    pub fn beans(&self) -> impl Iterator<Item = (&String, &BeanAttributes)> {
        self.beans.iter()
    }

    /// Bean 이름 순회
    pub fn bean_names(&self) -> impl Iterator<Item = &str> {
        self.beans.keys().map(String::as_str)
    }

    /// Bean 개수
    pub fn len(&self) -> usize {
        self.beans.len()
    }

    /// 비어 있는지 확인
    pub fn is_empty(&self) -> bool {
        self.beans.is_empty()
    }

    /// 조건을 만족하는 bean만 담은 새 dump
    ///
    /// The predicate receives the bean identifier; the source dump is left
    /// untouched.
    pub fn filtered<F>(&self, mut keep: F) -> Dump
    where
        F: FnMut(&str) -> bool,
    {
        let beans = self
            .beans
            .iter()
            .filter(|(name, _)| keep(name))
            .map(|(name, attrs)| (name.clone(), attrs.clone()))
            .collect();
        Dump { beans }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_dump() {
        let text = r#"{
            "java.lang:type=Memory": {
                "HeapMemoryUsage": {"init": 268435456, "used": 52428800},
                "Verbose": false
            },
            "java.lang:type=Threading": {"ThreadCount": 42}
        }"#;

        let dump = Dump::parse(text).unwrap();
        assert_eq!(dump.len(), 2);

        let threading = dump.get("java.lang:type=Threading").unwrap();
        assert_eq!(threading.get("ThreadCount"), Some(&AttributeValue::Integer(42)));

        let memory = dump.get("java.lang:type=Memory").unwrap();
        let heap = memory.get("HeapMemoryUsage").and_then(|v| v.as_object()).unwrap();
        assert_eq!(heap.get("used").and_then(|v| v.as_number(false)), Some(52428800.0));
    }

    #[test]
    fn test_parse_rejects_non_object_payload() {
        let err = Dump::parse("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, DumpError::NotAnObject("array")));
    }

    #[test]
    fn test_parse_rejects_non_object_bean() {
        let err = Dump::from_json(json!({"a.b:type=Foo": 3})).unwrap_err();
        assert!(matches!(err, DumpError::BeanNotAnObject { kind: "number", .. }));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            Dump::parse("Welcome to JMX terminal"),
            Err(DumpError::Json(_))
        ));
    }

    #[test]
    fn test_as_number_string_coercion() {
        let value = AttributeValue::String("12.5".to_string());
        assert_eq!(value.as_number(false), None);
        assert_eq!(value.as_number(true), Some(12.5));

        assert_eq!(AttributeValue::String("NaN".to_string()).as_number(true), None);
        assert_eq!(AttributeValue::String("inf".to_string()).as_number(true), None);
        assert_eq!(AttributeValue::String("n/a".to_string()).as_number(true), None);
        assert_eq!(AttributeValue::Boolean(true).as_number(true), None);
    }

    #[test]
    fn test_large_unsigned_becomes_float() {
        let value = AttributeValue::from(json!(u64::MAX));
        assert!(matches!(value, AttributeValue::Float(_)));
    }

    #[test]
    fn test_filtered_leaves_source_untouched() {
        let dump = Dump::from_json(json!({
            "org.x:type=Broker": {"Size": 3},
            "java.lang:type=Threading": {"ThreadCount": 7}
        }))
        .unwrap();

        let only_x = dump.filtered(|bean| bean.starts_with("org.x:"));
        assert_eq!(only_x.len(), 1);
        assert_eq!(dump.len(), 2);
    }
}
