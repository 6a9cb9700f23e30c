//! 프로세스 전역 커넥터 캐시
//!
//! One slot per `(host, port)`. A slot is created on first use and lives for
//! the rest of the process; what sits inside it is swapped for a fresh
//! connector whenever the old one is found dead. Each slot has its own async
//! mutex so concurrent check runs against one endpoint take turns.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use tracing::debug;

use super::connector::{Endpoint, JmxConnector};

/// 커넥터 슬롯 핸들
pub type ConnectorHandle = Arc<tokio::sync::Mutex<JmxConnector>>;

static GLOBAL_POOL: Lazy<ConnectorPool> = Lazy::new(ConnectorPool::new);

/// (host, port) -> 커넥터 슬롯
#[derive(Clone, Default)]
pub struct ConnectorPool {
    slots: Arc<Mutex<HashMap<Endpoint, ConnectorHandle>>>,
}

impl std::fmt::Debug for ConnectorPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorPool")
            .field("endpoints", &self.endpoints())
            .finish()
    }
}

impl ConnectorPool {
    /// 빈 풀 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 프로세스 전역 풀
    pub fn global() -> Self {
        GLOBAL_POOL.clone()
    }

    /// 슬롯 조회, 없으면 `make`로 생성
    pub fn slot<F>(&self, endpoint: &Endpoint, make: F) -> ConnectorHandle
    where
        F: FnOnce() -> JmxConnector,
    {
        let mut slots = self.slots.lock().expect("connector pool lock poisoned");
        slots
            .entry(endpoint.clone())
            .or_insert_with(|| {
                debug!(endpoint = %endpoint, "Creating connector slot");
                Arc::new(tokio::sync::Mutex::new(make()))
            })
            .clone()
    }

    /// 기존 슬롯 조회
    pub fn get(&self, endpoint: &Endpoint) -> Option<ConnectorHandle> {
        let slots = self.slots.lock().expect("connector pool lock poisoned");
        slots.get(endpoint).cloned()
    }

    /// 캐시된 엔드포인트 목록 (정렬)
    pub fn endpoints(&self) -> Vec<Endpoint> {
        let slots = self.slots.lock().expect("connector pool lock poisoned");
        let mut endpoints: Vec<Endpoint> = slots.keys().cloned().collect();
        endpoints.sort();
        endpoints
    }

    /// 슬롯 개수
    pub fn len(&self) -> usize {
        self.slots.lock().expect("connector pool lock poisoned").len()
    }

    /// 비어 있는지 확인
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 모든 세션 종료 (슬롯은 유지)
    pub async fn terminate_all(&self) {
        let handles: Vec<ConnectorHandle> = {
            let slots = self.slots.lock().expect("connector pool lock poisoned");
            slots.values().cloned().collect()
        };

        for handle in handles {
            handle.lock().await.terminate().await;
        }
    }
}
