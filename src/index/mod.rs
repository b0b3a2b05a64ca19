// 파티션 트리 전체 인덱스 생성
// 파티션 테이블에는 ON ONLY 인덱스를 먼저 등록하고, 리프 테이블 인덱스를 만든 뒤 ATTACH PARTITION 으로 연결합니다.
// 도중에 실패하거나 무효 인덱스가 남으면 지금까지 만든 인덱스를 모두 삭제하고 원래 오류를 돌려줍니다.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::{Mutex, Semaphore};

use crate::constants::{HASH_PARTITION_MIN_VERSION, MAX_INDEX_NAME_BYTES};
use crate::db::{Connection, ConnectionPool};
use crate::ddl::{attach_index_sql, create_index_sql, drop_index_sql, hashed_index_name, IndexSpec};
use crate::error::{PartitionError, Result};
use crate::introspect::Introspector;
use crate::partition::PartitionManager;

/// 인덱스 생성 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexAlgorithm {
    #[default]
    Default,
    /// 리프 테이블에 CREATE INDEX CONCURRENTLY 사용
    Concurrently,
}

/// 인덱스 생성 옵션
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    pub name: Option<String>,
    pub unique: bool,
    pub using: Option<String>,
    /// 부분 인덱스 조건 (인용하지 않음)
    pub where_clause: Option<String>,
    pub algorithm: IndexAlgorithm,
    /// 하위 파티션 인덱스를 병렬로 만들 워커 수
    pub in_threads: Option<usize>,
}

impl IndexOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn using(mut self, method: impl Into<String>) -> Self {
        self.using = Some(method.into());
        self
    }

    pub fn where_clause(mut self, predicate: impl Into<String>) -> Self {
        self.where_clause = Some(predicate.into());
        self
    }

    pub fn concurrently(mut self) -> Self {
        self.algorithm = IndexAlgorithm::Concurrently;
        self
    }

    pub fn in_threads(mut self, workers: usize) -> Self {
        self.in_threads = Some(workers);
        self
    }
}

/// `index_<table>_on_<col>_and_<col>`
pub fn default_index_name(table_name: &str, columns: &[String]) -> String {
    format!("index_{}_on_{}", table_name, columns.join("_and_"))
}

type BuildFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

// 한 번의 인덱스 빌드가 공유하는 값
#[derive(Clone)]
struct BuildContext {
    root_name: String,
    spec: IndexSpec,
    concurrently: bool,
    attach_supported: bool,
    created: Arc<Mutex<Vec<String>>>,
}

impl BuildContext {
    async fn record(&self, index_name: &str) {
        self.created.lock().await.push(index_name.to_string());
    }

    async fn created(&self) -> Vec<String> {
        self.created.lock().await.clone()
    }
}

impl PartitionManager {
    /// 파티션 트리 전체에 하나의 논리 인덱스 생성
    pub async fn add_index_on_all_partitions(
        &self,
        table_name: &str,
        columns: &[&str],
        options: IndexOptions,
    ) -> Result<()> {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let index_name = options
            .name
            .clone()
            .unwrap_or_else(|| default_index_name(table_name, &columns));

        if index_name.len() > MAX_INDEX_NAME_BYTES {
            return Err(PartitionError::IndexNameTooLong {
                name: index_name,
                max: MAX_INDEX_NAME_BYTES,
            });
        }

        if self.introspector().index_exists(&index_name).await? {
            return Err(PartitionError::IndexAlreadyExists { name: index_name });
        }

        let workers = match options.in_threads {
            Some(in_threads) => Some(self.worker_pool(in_threads)?),
            None => None,
        };

        let version = self.server_version().await?;
        let ctx = BuildContext {
            root_name: index_name.clone(),
            spec: IndexSpec {
                columns,
                unique: options.unique,
                using: options.using.clone(),
                where_clause: options.where_clause.clone(),
            },
            concurrently: options.algorithm == IndexAlgorithm::Concurrently,
            attach_supported: version >= HASH_PARTITION_MIN_VERSION,
            created: Arc::new(Mutex::new(Vec::new())),
        };

        let result = async {
            self.build_root(table_name, &ctx, workers).await?;
            self.verify_indexes(&ctx).await
        }
        .await;

        if let Err(e) = result {
            warn!("{} 인덱스 생성 실패, 생성된 인덱스 롤백: {}", index_name, e);
            self.drop_created_indexes(&ctx).await;
            return Err(e);
        }

        info!("{} 파티션 트리 인덱스 생성 완료: {}", table_name, index_name);
        Ok(())
    }

    fn worker_pool(&self, in_threads: usize) -> Result<(Arc<dyn ConnectionPool>, usize)> {
        if self.conn.transaction_open() {
            return Err(PartitionError::ThreadsInTransaction);
        }

        let pool = self.pool.clone().ok_or(PartitionError::PoolRequired)?;
        let pool_size = pool.size();
        if in_threads >= pool_size {
            return Err(PartitionError::ThreadsExceedPoolSize { in_threads, pool_size });
        }

        Ok((pool, in_threads))
    }

    async fn build_root(
        &self,
        table_name: &str,
        ctx: &BuildContext,
        workers: Option<(Arc<dyn ConnectionPool>, usize)>,
    ) -> Result<()> {
        let conn = self.conn.as_ref();
        let introspector = Introspector::new(conn);
        let partitions = introspector.partitions_for_table(table_name, false).await;

        if !introspector.is_table_partitioned(table_name).await? {
            return create_leaf_index(conn, &ctx.root_name, table_name, ctx).await;
        }

        let parent_index = create_partitioned_index(conn, &ctx.root_name, table_name, ctx).await?;

        match workers {
            Some((pool, in_threads)) => fan_out(pool, in_threads, partitions, parent_index, ctx).await,
            None => {
                for partition in partitions {
                    build_child(conn, partition, parent_index.clone(), ctx).await?;
                }
                Ok(())
            }
        }
    }

    async fn verify_indexes(&self, ctx: &BuildContext) -> Result<()> {
        let created = ctx.created().await;
        let invalid = self.introspector().invalid_indexes(&created).await?;
        if !invalid.is_empty() {
            return Err(PartitionError::IndexInvalid { names: invalid });
        }
        Ok(())
    }

    // 부모 인덱스를 먼저 지우면 연결된 자식 인덱스도 함께 지워지므로 기록 순서대로 삭제
    async fn drop_created_indexes(&self, ctx: &BuildContext) {
        for index_name in ctx.created().await {
            if let Err(e) = self.conn.execute(&drop_index_sql(&index_name)).await {
                warn!("인덱스 롤백 실패: {} ({})", index_name, e);
            }
        }
    }
}

// 하위 파티션 하나를 워커 하나가 맡는다. 워커 안에서의 재귀는 같은 연결로 순차 처리
async fn fan_out(
    pool: Arc<dyn ConnectionPool>,
    in_threads: usize,
    partitions: Vec<String>,
    parent_index: Option<String>,
    ctx: &BuildContext,
) -> Result<()> {
    let semaphore = Arc::new(Semaphore::new(in_threads.max(1)));
    let mut handles = Vec::with_capacity(partitions.len());

    for partition in partitions {
        let pool = Arc::clone(&pool);
        let semaphore = Arc::clone(&semaphore);
        let parent_index = parent_index.clone();
        let ctx = ctx.clone();

        handles.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| PartitionError::Worker(e.to_string()))?;
            let conn = pool.checkout().await?;
            debug!("인덱스 워커 시작: {}", partition);
            build_child(conn.as_ref(), partition, parent_index, &ctx).await
        }));
    }

    // 롤백 전에 모든 워커가 끝나야 한다
    let mut first_error = None;
    for handle in handles {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = outcome {
            if first_error.is_none() {
                first_error = Some(e);
            } else {
                warn!("추가 인덱스 워커 오류: {}", e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn build_child<'a>(
    conn: &'a dyn Connection,
    table_name: String,
    parent_index: Option<String>,
    ctx: &'a BuildContext,
) -> BuildFuture<'a> {
    Box::pin(async move {
        let index_name = hashed_index_name(&ctx.root_name, &table_name);
        let introspector = Introspector::new(conn);

        if introspector.is_table_partitioned(&table_name).await? {
            let own_index = create_partitioned_index(conn, &index_name, &table_name, ctx).await?;
            for partition in introspector.partitions_for_table(&table_name, false).await {
                build_child(conn, partition, own_index.clone(), ctx).await?;
            }
        } else {
            create_leaf_index(conn, &index_name, &table_name, ctx).await?;
        }

        if let Some(parent) = parent_index {
            conn.execute(&attach_index_sql(&parent, &index_name)).await?;
        }

        Ok(())
    })
}

// PostgreSQL 11 미만에서는 파티션 테이블에 인덱스를 만들 수 없으므로 None
async fn create_partitioned_index(
    conn: &dyn Connection,
    index_name: &str,
    table_name: &str,
    ctx: &BuildContext,
) -> Result<Option<String>> {
    if !ctx.attach_supported {
        debug!("파티션 테이블 인덱스 건너뜀: {}", table_name);
        return Ok(None);
    }

    conn.execute(&create_index_sql(index_name, table_name, &ctx.spec, false, true))
        .await?;
    ctx.record(index_name).await;
    Ok(Some(index_name.to_string()))
}

// 실패한 CONCURRENTLY 빌드는 무효 인덱스를 남기므로 그때만 실행 전에 기록
// 기존 인덱스와 이름이 겹치면 기록하지 않고 중단
async fn create_leaf_index(
    conn: &dyn Connection,
    index_name: &str,
    table_name: &str,
    ctx: &BuildContext,
) -> Result<()> {
    if ctx.concurrently {
        if Introspector::new(conn).index_exists(index_name).await? {
            return Err(PartitionError::IndexAlreadyExists {
                name: index_name.to_string(),
            });
        }
        ctx.record(index_name).await;
    }
    conn.execute(&create_index_sql(index_name, table_name, &ctx.spec, ctx.concurrently, false))
        .await?;
    if !ctx.concurrently {
        ctx.record(index_name).await;
    }
    Ok(())
}
