//! Error types for rJMX-Bridge
//!
//! This module defines the error types used throughout the bridge, one enum
//! per layer: bean names, dump payloads, the jmxterm connector and check
//! cycles. Configuration errors live in [`crate::config::ConfigError`].

use thiserror::Error;

/// Bean ObjectName 파싱 에러
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BeanError {
    /// `domain:key=value,...` 형태가 아님
    #[error("Malformed bean identifier '{identifier}': {reason}")]
    MalformedIdentifier { identifier: String, reason: String },
}

/// Dump payload 디코딩 에러
#[derive(Error, Debug)]
pub enum DumpError {
    /// JSON 문법 에러
    #[error("Dump is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// 최상위 값이 객체가 아님
    #[error("Dump payload must be an object of beans, got {0}")]
    NotAnObject(&'static str),

    /// Bean 속성이 객체가 아님
    #[error("Attributes of bean '{bean}' must be an object, got {kind}")]
    BeanNotAnObject { bean: String, kind: &'static str },
}

/// jmxterm 커넥터 에러
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// 외부 프로세스 실행 실패
    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// 프롬프트 대기 시간 초과 (connect)
    #[error("Timed out after {timeout_ms}ms waiting for {endpoint} to become ready")]
    ConnectTimeout { endpoint: String, timeout_ms: u64 },

    /// dump 응답 대기 시간 초과
    #[error("Timed out after {timeout_ms}ms waiting for dump from {endpoint}")]
    DumpTimeout { endpoint: String, timeout_ms: u64 },

    /// dump 응답 디코딩 실패
    #[error("Protocol error from {endpoint}: {source}")]
    Protocol {
        endpoint: String,
        #[source]
        source: DumpError,
    },

    /// 세션 없음
    #[error("No live session")]
    NotConnected,

    /// 프롬프트 전에 stdout이 닫힘
    #[error("Process for {endpoint} exited before sending a prompt")]
    ProcessExited { endpoint: String },

    /// 파이프 I/O 에러
    #[error("I/O error talking to jmxterm: {0}")]
    Io(#[from] std::io::Error),
}

impl ConnectorError {
    /// 세션을 더 이상 쓸 수 없는 에러인지 확인
    ///
    /// A protocol error leaves the session usable; the payload was just bad.
    pub fn is_fatal_for_session(&self) -> bool {
        !matches!(self, ConnectorError::Protocol { .. })
    }
}

/// Check cycle 에러
#[derive(Error, Debug)]
pub enum CheckError {
    /// 커넥터 에러
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    /// 필수 JVM bean/속성 없음
    #[error("Well-known JVM bean missing: {bean} attribute {attribute}")]
    MissingWellKnownBean { bean: String, attribute: String },

    /// 필수 JVM bean/속성이 여러 개
    #[error("Well-known JVM bean ambiguous: {bean} attribute {attribute} matched {count} metrics")]
    AmbiguousWellKnownBean {
        bean: String,
        attribute: String,
        count: usize,
    },

    /// 알 수 없는 integration 이름
    #[error("Unknown integration '{0}'")]
    UnknownIntegration(String),

    /// conf 필터 컴파일 실패
    #[error("Invalid conf filter: {0}")]
    InvalidFilter(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_keeps_session() {
        let err = ConnectorError::Protocol {
            endpoint: "localhost:7199".to_string(),
            source: DumpError::NotAnObject("array"),
        };
        assert!(!err.is_fatal_for_session());
    }

    #[test]
    fn test_timeouts_are_fatal_for_session() {
        let err = ConnectorError::DumpTimeout {
            endpoint: "localhost:7199".to_string(),
            timeout_ms: 100,
        };
        assert!(err.is_fatal_for_session());
        assert!(err.to_string().contains("100ms"));
    }

    #[test]
    fn test_check_error_is_transparent_over_connector() {
        let err = CheckError::from(ConnectorError::NotConnected);
        assert_eq!(err.to_string(), "No live session");
    }
}
