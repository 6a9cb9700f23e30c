//! HTTP request handlers
//!
//! Contains handlers for all HTTP endpoints.

use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    Json,
};
use serde::Serialize;
use tracing::{debug, instrument};

use super::AppState;
use crate::check::CollectingSink;
use crate::exposition::TextFormatter;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    /// Health status
    status: String,
    /// Application version
    version: String,
}

/// 설정된 인스턴스 하나
#[derive(Debug, Serialize)]
pub struct InstanceSummary {
    pub integration: String,
    pub instance: String,
    pub host: String,
    pub port: u16,
    /// `None`이면 모든 도메인
    pub domains: Option<Vec<String>>,
}

/// Root endpoint - displays basic info
pub async fn root(State(state): State<AppState>) -> Html<String> {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>rJMX-Bridge</title>
</head>
<body>
    <h1>rJMX-Bridge</h1>
    <p>Version: {}</p>
    <ul>
        <li><a href="/health">Health Check</a></li>
        <li><a href="/checks">Checks</a></li>
        <li><a href="{}">Metrics</a></li>
    </ul>
</body>
</html>"#,
        env!("CARGO_PKG_VERSION"),
        state.config.server.path
    );
    Html(html)
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Configured instances, without connecting
pub async fn checks(State(state): State<AppState>) -> Json<Vec<InstanceSummary>> {
    let summaries = state
        .runner
        .checks()
        .iter()
        .flat_map(|check| {
            check.instances().iter().map(|instance| InstanceSummary {
                integration: check.name().to_string(),
                instance: instance.instance_name(),
                host: instance.config().host.clone(),
                port: instance.config().port,
                domains: instance.domains(),
            })
        })
        .collect();
    Json(summaries)
}

/// Metrics endpoint - runs every check once and returns the text exposition
#[instrument(skip(state), name = "metrics_handler")]
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();

    let mut sink = CollectingSink::new();
    let summary = state.runner.run_all(&mut sink).await;

    let formatter = TextFormatter::new();
    let mut output = formatter.render(&sink.samples, &sink.service_checks);
    output.push_str(&state.runner.metrics().format());

    let scrape_duration = start.elapsed().as_secs_f64();
    output.push_str(&format!(
        r#"# HELP rjmx_bridge_info rJMX-Bridge information
# TYPE rjmx_bridge_info gauge
rjmx_bridge_info{{version="{}"}} 1
# HELP rjmx_bridge_scrape_duration_seconds Time spent running all checks
# TYPE rjmx_bridge_scrape_duration_seconds gauge
rjmx_bridge_scrape_duration_seconds {}
# HELP rjmx_bridge_scrape_failures Number of instances that failed this scrape
# TYPE rjmx_bridge_scrape_failures gauge
rjmx_bridge_scrape_failures {}
"#,
        env!("CARGO_PKG_VERSION"),
        scrape_duration,
        summary.failed,
    ));

    debug!(
        duration_ms = start.elapsed().as_millis() as u64,
        samples = sink.samples.len(),
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Scrape complete"
    );

    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        output,
    )
}

#[cfg(test)]
mod tests {
    use super::super::{router, AppState};
    use crate::check::CheckRunner;
    use crate::collector::ConnectorPool;
    use crate::config::{CheckConfig, Config, InstanceConfig};
    use crate::metrics::InternalMetrics;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app(config: Config) -> axum::Router {
        let runner = CheckRunner::from_config(&config)
            .unwrap()
            .with_pool(ConnectorPool::new())
            .with_metrics(InternalMetrics::new());
        router(AppState::new(config, runner))
    }

    async fn get(app: axum::Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get(app(Config::default()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"status\":\"healthy\""));
    }

    #[tokio::test]
    async fn test_root_links_metrics_path() {
        let mut config = Config::default();
        config.server.path = "/jmx".to_string();
        let (status, body) = get(app(config), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("href=\"/jmx\""));
    }

    #[tokio::test]
    async fn test_metrics_without_checks() {
        let (status, body) = get(app(Config::default()), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("rjmx_bridge_info{version="));
        assert!(body.contains("rjmx_bridge_scrape_failures 0"));
        assert!(body.contains("rjmx_bridge_connectors 0"));
    }

    #[tokio::test]
    async fn test_metrics_reports_unreachable_instance() {
        let mut config = Config::default();
        config.launcher.program = "/nonexistent/rjmx-bridge-jmxterm".to_string();
        config.checks.push(CheckConfig {
            integration: "tomcat".to_string(),
            instances: vec![InstanceConfig::new("localhost", 9012)],
        });

        let (status, body) = get(app(config), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(
            "tomcat_can_connect{host=\"localhost\",instance=\"tomcat-localhost-9012\",port=\"9012\",status=\"CRITICAL\"} 0"
        ));
        assert!(body.contains("rjmx_bridge_scrape_failures 1"));
        assert!(body.contains("rjmx_bridge_check_failure_total{endpoint=\"localhost:9012\"} 1"));
    }

    #[tokio::test]
    async fn test_checks_lists_instances() {
        let mut config = Config::default();
        config.checks.push(CheckConfig {
            integration: "solr".to_string(),
            instances: vec![InstanceConfig::new("search1", 9999)],
        });

        let (status, body) = get(app(config), "/checks").await;
        assert_eq!(status, StatusCode::OK);
        let summaries: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(summaries[0]["integration"], "solr");
        assert_eq!(summaries[0]["instance"], "solr-search1-9999");
        assert_eq!(summaries[0]["domains"], serde_json::json!(["solr"]));
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let (status, _) = get(app(Config::default()), "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
