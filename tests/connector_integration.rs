//! Connector 통합 테스트
//!
//! 가짜 jmxterm 스크립트로 프로세스 수명과 프롬프트 프로토콜을 검증

#![cfg(unix)]

mod common;

use std::time::Duration;

use common::{FakeJmxterm, Mode, SHORT};
use rjmx_bridge::collector::{ConnectOptions, ConnectorState, Credentials, Endpoint, JmxConnector};
use rjmx_bridge::error::ConnectorError;
use serde_json::json;

fn options(timeout: Duration) -> ConnectOptions {
    ConnectOptions {
        endpoint: Endpoint::new("localhost", 7199),
        credentials: None,
        timeout,
    }
}

#[tokio::test]
async fn test_connect_and_dump() {
    let fake = FakeJmxterm::new(
        &json!({
            "java.lang:type=Threading": {"ThreadCount": 12},
            "org.apache.activemq:BrokerName=b1,Type=Broker": {"TotalConsumerCount": 3}
        }),
        Mode::Normal,
    );
    let mut connector = JmxConnector::new(fake.launcher(), Duration::from_secs(2));
    assert_eq!(connector.state(), ConnectorState::Unconnected);

    connector.connect(&options(Duration::from_secs(5))).await.unwrap();
    assert!(connector.connected());
    assert!(connector.pid().is_some());
    assert_eq!(connector.endpoint(), Some(&Endpoint::new("localhost", 7199)));

    let dump = connector.dump().await.unwrap();
    assert_eq!(dump.len(), 2);
    assert!(dump.get("java.lang:type=Threading").is_some());

    // the session stays usable for the next cycle
    let again = connector.dump().await.unwrap();
    assert_eq!(again, dump);

    connector.terminate().await;
    assert!(!connector.connected());
    assert_eq!(connector.state(), ConnectorState::Dead);
}

#[tokio::test]
async fn test_credentials_are_accepted() {
    let fake = FakeJmxterm::new(&json!({}), Mode::Normal);
    let mut connector = JmxConnector::new(fake.launcher(), Duration::from_secs(2));

    let mut opts = options(Duration::from_secs(5));
    opts.credentials = Some(Credentials {
        user: "admin".to_string(),
        password: "secret".to_string(),
    });
    connector.connect(&opts).await.unwrap();

    assert!(connector.dump().await.unwrap().is_empty());
    connector.terminate().await;
}

#[tokio::test]
async fn test_prompt_inside_value_does_not_end_response() {
    let fake = FakeJmxterm::new(
        &json!({"com.example:type=Shell": {"Prompt": "$>", "Depth": 2}}),
        Mode::Normal,
    );
    let mut connector = JmxConnector::new(fake.launcher(), Duration::from_secs(2));
    connector.connect(&options(Duration::from_secs(5))).await.unwrap();

    let dump = connector.dump().await.unwrap();
    let attributes = dump.get("com.example:type=Shell").unwrap();
    assert_eq!(attributes.len(), 2);
    connector.terminate().await;
}

#[tokio::test]
async fn test_long_prompt_like_values_keep_stream_in_step() {
    // values ending in `$>` across several pipe reads
    let beans: serde_json::Map<String, serde_json::Value> = (0..8)
        .map(|i| {
            let value = format!("{}$>", "x".repeat(4093 + i));
            (format!("com.example:type=Shell,name=s{}", i), json!({"Prompt": value}))
        })
        .collect();
    let fake = FakeJmxterm::new(&serde_json::Value::Object(beans), Mode::Normal);
    let mut connector = JmxConnector::new(fake.launcher(), Duration::from_secs(2));
    connector.connect(&options(Duration::from_secs(5))).await.unwrap();

    let first = connector.dump().await.unwrap();
    assert_eq!(first.len(), 8);
    let second = connector.dump().await.unwrap();
    assert_eq!(second, first);
    connector.terminate().await;
}

#[tokio::test]
async fn test_connect_timeout() {
    let fake = FakeJmxterm::new(&json!({}), Mode::Silent);
    let mut connector = JmxConnector::new(fake.launcher(), Duration::from_secs(2));

    let err = connector.connect(&options(SHORT)).await.unwrap_err();
    assert!(matches!(err, ConnectorError::ConnectTimeout { .. }), "{err:?}");
    assert!(!connector.connected());
    assert_eq!(connector.state(), ConnectorState::Dead);
}

#[tokio::test]
async fn test_process_exit_before_prompt() {
    let fake = FakeJmxterm::new(&json!({}), Mode::Exit);
    let mut connector = JmxConnector::new(fake.launcher(), Duration::from_secs(2));

    let err = connector
        .connect(&options(Duration::from_secs(5)))
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::ProcessExited { .. }), "{err:?}");
}

#[tokio::test]
async fn test_dump_timeout_kills_session() {
    let fake = FakeJmxterm::new(&json!({}), Mode::Hang);
    let mut connector = JmxConnector::new(fake.launcher(), SHORT);
    connector.connect(&options(Duration::from_secs(5))).await.unwrap();

    let err = connector.dump().await.unwrap_err();
    assert!(matches!(err, ConnectorError::DumpTimeout { .. }), "{err:?}");
    assert!(err.is_fatal_for_session());
    assert!(!connector.connected());
    assert_eq!(connector.state(), ConnectorState::Dead);
}

#[tokio::test]
async fn test_malformed_payload_keeps_session() {
    let fake = FakeJmxterm::with_payload("this is not json", Mode::Normal);
    let mut connector = JmxConnector::new(fake.launcher(), Duration::from_secs(2));
    connector.connect(&options(Duration::from_secs(5))).await.unwrap();

    let err = connector.dump().await.unwrap_err();
    assert!(matches!(err, ConnectorError::Protocol { .. }), "{err:?}");
    assert!(!err.is_fatal_for_session());
    assert!(connector.connected());
    connector.terminate().await;
}

#[tokio::test]
async fn test_reconnect_replaces_previous_session() {
    let fake = FakeJmxterm::new(&json!({}), Mode::Normal);
    let mut connector = JmxConnector::new(fake.launcher(), Duration::from_secs(2));

    connector.connect(&options(Duration::from_secs(5))).await.unwrap();
    let first_pid = connector.pid();
    connector.connect(&options(Duration::from_secs(5))).await.unwrap();

    assert!(connector.connected());
    assert_ne!(connector.pid(), first_pid);
    connector.terminate().await;
}
