//! JMX check orchestration
//!
//! One check cycle per instance:
//!
//! 1. Take the cached connector for `(host, port)`; replace it when dead.
//! 2. Dump every bean.
//! 3. Emit the standard `jvm.*` metrics.
//! 4. Keep the integration's domains, build the catalog through its profile
//!    and emit every metric marked for sending.
//! 5. Emit `<integration>.can_connect`: OK, or CRITICAL with the error.

pub mod jvm;
pub mod sink;

use std::time::{Duration, Instant};

use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, instrument, warn};

use crate::catalog::{bean_domain, Catalog};
use crate::collector::{ConnectOptions, ConnectorPool, ConnectorState, Dump, JmxConnector, Launcher};
use crate::config::{CheckConfig, Config, InstanceConfig, LauncherConfig};
use crate::error::CheckError;
use crate::integration::{self, DomainMatch, Integration, Profile};
use crate::metrics::{internal_metrics, InternalMetrics};

pub use jvm::{default_collectors, extract_jvm_metrics, GcCollector, JVM_DOMAIN};
pub use sink::{CollectingSink, MetricSink, Sample, ServiceCheck, Status};

/// 인스턴스 설정 + 해당 integration
#[derive(Debug)]
pub struct CheckInstance {
    config: InstanceConfig,
    integration: Box<dyn Integration>,
}

impl CheckInstance {
    pub fn new(config: InstanceConfig, integration: Box<dyn Integration>) -> Self {
        Self {
            config,
            integration,
        }
    }

    pub fn config(&self) -> &InstanceConfig {
        &self.config
    }

    pub fn integration(&self) -> &dyn Integration {
        self.integration.as_ref()
    }

    /// integration 도메인 + 인스턴스 추가 도메인 (`None`이면 전체)
    pub fn domains(&self) -> Option<Vec<String>> {
        let mut domains = match (self.integration.domains(), &self.config.domains) {
            (None, None) => return None,
            (Some(base), None) => base,
            (None, Some(extra)) => extra.clone(),
            (Some(mut base), Some(extra)) => {
                base.extend(extra.iter().cloned());
                base
            }
        };
        domains.sort();
        domains.dedup();
        Some(domains)
    }

    pub fn instance_name(&self) -> String {
        self.config.instance_name(self.integration.name())
    }

    /// `instance:<name>` + 사용자 태그
    pub fn tags(&self) -> Vec<String> {
        let mut tags = vec![format!("instance:{}", self.instance_name())];
        tags.extend(self.config.tags.iter().cloned());
        tags
    }

    /// `<integration>.can_connect`
    pub fn service_check_name(&self) -> String {
        format!("{}.can_connect", self.integration.name())
    }
}

/// 실행 결과 요약
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// integration 하나와 그 인스턴스들
#[derive(Debug)]
pub struct JmxCheck {
    name: String,
    instances: Vec<CheckInstance>,
    launcher: Launcher,
    connect_timeout: Duration,
    dump_timeout: Duration,
    pool: ConnectorPool,
    metrics: InternalMetrics,
}

impl JmxCheck {
    /// 설정에서 check 생성
    ///
    /// Fails on an unknown integration name or a `conf` filter that does not
    /// compile.
    pub fn new(check: &CheckConfig, launcher: &LauncherConfig) -> Result<Self, CheckError> {
        let instances = check
            .instances
            .iter()
            .map(|instance| {
                let integration = integration::build(&check.integration, &instance.conf)?;
                Ok(CheckInstance::new(instance.clone(), integration))
            })
            .collect::<Result<Vec<_>, CheckError>>()?;

        Ok(Self {
            name: check.integration.clone(),
            instances,
            launcher: launcher.launcher(),
            connect_timeout: launcher.connect_timeout(),
            dump_timeout: launcher.dump_timeout(),
            pool: ConnectorPool::global(),
            metrics: internal_metrics().clone(),
        })
    }

    /// 커넥터 풀 교체 (기본: 프로세스 전역 풀)
    pub fn with_pool(mut self, pool: ConnectorPool) -> Self {
        self.pool = pool;
        self
    }

    /// 자체 메트릭 레지스트리 교체
    pub fn with_metrics(mut self, metrics: InternalMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instances(&self) -> &[CheckInstance] {
        &self.instances
    }

    pub fn pool(&self) -> &ConnectorPool {
        &self.pool
    }

    fn new_connector(&self) -> JmxConnector {
        JmxConnector::new(self.launcher.clone(), self.dump_timeout)
    }

    /// 인스턴스의 커넥터를 잠그고 연결된 상태로 반환
    ///
    /// A connector that was connected before but is no longer alive is
    /// replaced with a fresh one in the same slot.
    pub async fn load_connection(
        &self,
        instance: &InstanceConfig,
    ) -> Result<OwnedMutexGuard<JmxConnector>, CheckError> {
        let endpoint = instance.endpoint();
        let handle = self.pool.slot(&endpoint, || self.new_connector());
        let mut connector = handle.lock_owned().await;

        if connector.connected() {
            return Ok(connector);
        }

        if connector.state() == ConnectorState::Dead {
            warn!(host = %endpoint.host, port = endpoint.port, "JMX connector is dead, reconnecting");
            *connector = self.new_connector();
            self.metrics.record_reconnect(&endpoint.to_string());
        }

        info!(host = %endpoint.host, port = endpoint.port, "Connecting to JMX endpoint");
        connector
            .connect(&ConnectOptions {
                endpoint,
                credentials: instance.credentials(),
                timeout: self.connect_timeout,
            })
            .await?;
        Ok(connector)
    }

    /// 한 인스턴스에 대해 check cycle 실행
    ///
    /// Always emits the `can_connect` service check, then returns the cycle's
    /// error if any.
    #[instrument(skip_all, fields(check = %self.name, host = %instance.config.host, port = instance.config.port))]
    pub async fn check<S>(&self, instance: &CheckInstance, sink: &mut S) -> Result<(), CheckError>
    where
        S: MetricSink + ?Sized + Send,
    {
        let endpoint = instance.config.endpoint().to_string();
        let service_tags = vec![
            format!("host:{}", instance.config.host),
            format!("port:{}", instance.config.port),
            format!("instance:{}", instance.instance_name()),
        ];

        let result = self.run(instance, sink).await;

        match &result {
            Ok(samples) => {
                debug!(samples, "Check cycle complete");
                self.metrics.record_check_success(&endpoint, *samples);
                sink.service_check(ServiceCheck {
                    name: instance.service_check_name(),
                    status: Status::Ok,
                    tags: service_tags,
                    message: None,
                });
            }
            Err(e) => {
                let session_lost =
                    matches!(e, CheckError::Connector(c) if c.is_fatal_for_session());
                error!(error = %e, session_lost, "Check cycle failed");
                self.metrics.record_check_failure(&endpoint);
                sink.service_check(ServiceCheck {
                    name: instance.service_check_name(),
                    status: Status::Critical,
                    tags: service_tags,
                    message: Some(e.to_string()),
                });
            }
        }

        result.map(|_| ())
    }

    /// 모든 인스턴스 순차 실행
    pub async fn check_all<S>(&self, sink: &mut S) -> RunSummary
    where
        S: MetricSink + ?Sized + Send,
    {
        let mut summary = RunSummary::default();
        for instance in &self.instances {
            match self.check(instance, sink).await {
                Ok(()) => summary.succeeded += 1,
                Err(_) => summary.failed += 1,
            }
        }
        summary
    }

    /// dump 후 샘플 emit, emit한 샘플 수 반환
    async fn run<S>(&self, instance: &CheckInstance, sink: &mut S) -> Result<usize, CheckError>
    where
        S: MetricSink + ?Sized + Send,
    {
        let config = &instance.config;
        let tags = instance.tags();

        let dump = {
            let mut connector = self.load_connection(config).await?;
            let started = Instant::now();
            let dump = connector.dump().await?;
            self.metrics
                .observe_dump(&config.endpoint().to_string(), started.elapsed().as_secs_f64());
            dump
        };
        debug!(beans = dump.len(), "Dump received");

        let mut counter = CountingSink { inner: sink, samples: 0 };

        let mut malformed = extract_jvm_metrics(&dump, &tags, &config.collectors(), &mut counter)?;

        let domains = instance.domains();
        let dump = filter_domains(&dump, domains.as_deref(), instance.integration.domain_match());
        let profile = Profile::new(instance.integration(), &config.exclude_attributes);
        let catalog = Catalog::build(&dump, &profile);

        // java.lang beans show up in both catalogs when the domains overlap
        for rejected in catalog.rejected() {
            if !malformed.contains(rejected) {
                malformed.push(rejected.clone());
            }
        }
        if let Some(first) = malformed.first() {
            warn!(
                count = malformed.len(),
                first = %first,
                "Skipped beans with malformed identifiers"
            );
        }

        for metric in catalog.iter().filter(|m| m.send_metric()) {
            let mut sample_tags = tags.clone();
            sample_tags.extend(metric.tagslist());
            counter.submit(Sample {
                name: metric.metric_name(),
                value: metric.value(),
                tags: sample_tags,
                device: metric.device().map(str::to_string),
                metric_type: metric.metric_type(),
            });
        }

        Ok(counter.samples)
    }

    /// 이 check의 모든 세션 종료
    pub async fn kill_connectors(&self) {
        for instance in &self.instances {
            if let Some(handle) = self.pool.get(&instance.config.endpoint()) {
                handle.lock().await.terminate().await;
            }
        }
    }
}

/// 설정된 모든 check
///
/// Checks run one after another; each instance's connector slot is locked
/// only for the duration of its dump.
#[derive(Debug)]
pub struct CheckRunner {
    checks: Vec<JmxCheck>,
    pool: ConnectorPool,
    metrics: InternalMetrics,
}

impl Default for CheckRunner {
    fn default() -> Self {
        Self {
            checks: Vec::new(),
            pool: ConnectorPool::global(),
            metrics: internal_metrics().clone(),
        }
    }
}

impl CheckRunner {
    /// 설정의 모든 check 생성
    pub fn from_config(config: &Config) -> Result<Self, CheckError> {
        let checks = config
            .checks
            .iter()
            .map(|check| JmxCheck::new(check, &config.launcher))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            checks,
            ..Self::default()
        })
    }

    /// 모든 check의 커넥터 풀 교체
    pub fn with_pool(mut self, pool: ConnectorPool) -> Self {
        self.checks = self
            .checks
            .into_iter()
            .map(|c| c.with_pool(pool.clone()))
            .collect();
        self.pool = pool;
        self
    }

    /// 모든 check의 자체 메트릭 레지스트리 교체
    pub fn with_metrics(mut self, metrics: InternalMetrics) -> Self {
        self.checks = self
            .checks
            .into_iter()
            .map(|c| c.with_metrics(metrics.clone()))
            .collect();
        self.metrics = metrics;
        self
    }

    pub fn checks(&self) -> &[JmxCheck] {
        &self.checks
    }

    pub fn pool(&self) -> &ConnectorPool {
        &self.pool
    }

    pub fn metrics(&self) -> &InternalMetrics {
        &self.metrics
    }

    /// 모든 check의 모든 인스턴스 실행
    pub async fn run_all<S>(&self, sink: &mut S) -> RunSummary
    where
        S: MetricSink + ?Sized + Send,
    {
        let mut summary = RunSummary::default();
        for check in &self.checks {
            let result = check.check_all(sink).await;
            summary.succeeded += result.succeeded;
            summary.failed += result.failed;
        }
        self.metrics.set_connectors(self.pool.len());
        summary
    }

    /// 모든 세션 종료
    pub async fn kill_connectors(&self) {
        for check in &self.checks {
            check.kill_connectors().await;
        }
    }
}

/// 샘플 수를 세는 sink 래퍼
struct CountingSink<'a, S: ?Sized> {
    inner: &'a mut S,
    samples: usize,
}

impl<S: MetricSink + ?Sized> MetricSink for CountingSink<'_, S> {
    fn submit(&mut self, sample: Sample) {
        self.samples += 1;
        self.inner.submit(sample);
    }

    fn service_check(&mut self, check: ServiceCheck) {
        self.inner.service_check(check);
    }
}

/// 도메인 목록에 속한 bean만 남김 (`None`이면 전체)
pub fn filter_domains(dump: &Dump, domains: Option<&[String]>, mode: DomainMatch) -> Dump {
    match domains {
        None => dump.clone(),
        Some(domains) => dump.filtered(|bean| {
            let domain = bean_domain(bean);
            domains.iter().any(|wanted| mode.matches(domain, wanted))
        }),
    }
}
