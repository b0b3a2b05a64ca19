// 파티션 메타데이터 캐시
// 파티션 목록과 파티션 한정 쿼리 템플릿을 TTL 과 함께 보관합니다.
// 하나의 잠금으로 조회와 계산을 모두 감싸므로 같은 키를 동시에 두 번 계산하지 않습니다.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::PartitionConfig;
use crate::error::Result;
use crate::model::PartitionQuery;

struct CacheEntry<T> {
    value: T,
    created_at: Instant,
}

impl<T: Clone> CacheEntry<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            created_at: Instant::now(),
        }
    }

    fn is_fresh(&self, ttl: Option<Duration>) -> bool {
        match ttl {
            Some(ttl) => Instant::now().duration_since(self.created_at) <= ttl,
            None => true,
        }
    }
}

#[derive(Default)]
struct CacheStore {
    partitions: HashMap<(String, bool), CacheEntry<Vec<String>>>,
    models: HashMap<(String, String), CacheEntry<Arc<PartitionQuery>>>,
}

/// 파티션 목록/모델 캐시
pub struct PartitionCache {
    enabled: bool,
    ttl: Option<Duration>,
    store: Mutex<CacheStore>,
}

impl PartitionCache {
    /// `ttl` 이 None 이면 만료 없음
    pub fn new(enabled: bool, ttl: Option<Duration>) -> Self {
        Self {
            enabled,
            ttl,
            store: Mutex::new(CacheStore::default()),
        }
    }

    pub fn from_config(config: &PartitionConfig) -> Self {
        Self::new(config.caching, config.cache_ttl())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// (모델 키, 하위 파티션 포함 여부) 별 파티션 목록
    pub async fn fetch_partitions<F, Fut>(&self, key: &str, include_subpartitions: bool, compute: F) -> Result<Vec<String>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<String>>>,
    {
        if !self.enabled {
            return compute().await;
        }

        let mut store = self.store.lock().await;
        let cache_key = (key.to_string(), include_subpartitions);

        if let Some(entry) = store.partitions.get(&cache_key) {
            if entry.is_fresh(self.ttl) {
                debug!("파티션 캐시 적중: {} (하위 포함: {})", key, include_subpartitions);
                return Ok(entry.value.clone());
            }
        }

        debug!("파티션 캐시 미스: {} (하위 포함: {})", key, include_subpartitions);
        let value = compute().await?;
        store.partitions.insert(cache_key, CacheEntry::new(value.clone()));
        Ok(value)
    }

    /// (모델 키, 자식 테이블) 별 파티션 한정 쿼리 템플릿
    pub async fn fetch_model<F, Fut>(&self, key: &str, child_table: &str, compute: F) -> Result<Arc<PartitionQuery>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<PartitionQuery>>>,
    {
        if !self.enabled {
            return compute().await;
        }

        let mut store = self.store.lock().await;
        let cache_key = (key.to_string(), child_table.to_string());

        if let Some(entry) = store.models.get(&cache_key) {
            if entry.is_fresh(self.ttl) {
                debug!("모델 캐시 적중: {} -> {}", key, child_table);
                return Ok(Arc::clone(&entry.value));
            }
        }

        debug!("모델 캐시 미스: {} -> {}", key, child_table);
        let value = compute().await?;
        store.models.insert(cache_key, CacheEntry::new(Arc::clone(&value)));
        Ok(value)
    }

    /// 모든 항목 삭제
    pub async fn clear(&self) {
        let mut store = self.store.lock().await;
        store.partitions.clear();
        store.models.clear();
        debug!("파티션 캐시 초기화");
    }
}

impl Default for PartitionCache {
    fn default() -> Self {
        Self::from_config(&PartitionConfig::default())
    }
}
