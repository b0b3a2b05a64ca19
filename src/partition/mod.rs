// 파티션 관리자
// 부모 테이블 생성, 자식 파티션 생성/연결/분리, 템플릿 테이블 관리를 담당합니다.

pub mod options;

use std::future::Future;
use std::sync::Arc;

use log::{debug, error, info};
use tokio::sync::OnceCell;

use crate::cache::PartitionCache;
use crate::config::PartitionConfig;
use crate::constants::{
    HASH_PARTITION_MIN_VERSION, MAX_IDENTIFIER_BYTES, PARTITIONING_MIN_VERSION, PGCRYPTO_UUID_FUNCTION,
    UUID_OSSP_FUNCTION,
};
use crate::db::{Connection, ConnectionPool};
use crate::ddl::{
    add_primary_key_sql, attach_partition_sql, create_index_sql, create_table_like_sql, detach_partition_sql,
    hashed_name, hashed_table_name, partition_by_clause, template_table_name, IdType, IndexSpec, PartitionBound,
    PartitionKey, PartitionStrategy, PrimaryKey, TableDefinition,
};
use crate::error::{PartitionError, Result};
use crate::introspect::Introspector;
use crate::model::naming::{DefaultConvention, PrimaryKeyConvention};

pub use options::{PartitionOfOptions, PartitionedTableOptions, TableLikeOptions};

/// 파티션 관리자 구조체
pub struct PartitionManager {
    pub(crate) conn: Arc<dyn Connection>,
    pub(crate) pool: Option<Arc<dyn ConnectionPool>>,
    pub(crate) cache: Arc<PartitionCache>,
    pub(crate) config: PartitionConfig,
    convention: Arc<dyn PrimaryKeyConvention>,
    version: OnceCell<i32>,
}

impl PartitionManager {
    /// 새 PartitionManager 인스턴스 생성 (캐시는 설정으로부터 새로 만든다)
    pub fn new(conn: Arc<dyn Connection>, config: PartitionConfig) -> Self {
        let cache = Arc::new(PartitionCache::from_config(&config));
        Self {
            conn,
            pool: None,
            cache,
            config,
            convention: Arc::new(DefaultConvention::default()),
            version: OnceCell::new(),
        }
    }

    /// 생성 후 서버가 선언적 파티셔닝을 지원하는지 확인
    pub async fn connect(conn: Arc<dyn Connection>, config: PartitionConfig) -> Result<Self> {
        let manager = Self::new(conn, config);
        manager.ensure_partitioning_supported().await?;
        Ok(manager)
    }

    /// 인덱스 워커용 연결 풀
    pub fn with_pool(mut self, pool: Arc<dyn ConnectionPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// 여러 관리자가 공유할 캐시
    pub fn with_cache(mut self, cache: Arc<PartitionCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_convention(mut self, convention: Arc<dyn PrimaryKeyConvention>) -> Self {
        self.convention = convention;
        self
    }

    pub fn connection(&self) -> &dyn Connection {
        self.conn.as_ref()
    }

    pub fn cache(&self) -> &Arc<PartitionCache> {
        &self.cache
    }

    pub fn config(&self) -> &PartitionConfig {
        &self.config
    }

    pub fn introspector(&self) -> Introspector<'_> {
        Introspector::new(self.conn.as_ref())
    }

    /// server_version_num (최초 한 번만 조회)
    pub async fn server_version(&self) -> Result<i32> {
        let version = self
            .version
            .get_or_try_init(|| async { self.conn.server_version_num().await })
            .await?;
        Ok(*version)
    }

    async fn ensure_partitioning_supported(&self) -> Result<()> {
        if self.server_version().await? < PARTITIONING_MIN_VERSION {
            return Err(PartitionError::PartitioningUnsupported);
        }
        Ok(())
    }

    async fn require_version(&self, min_version: i32, feature: &'static str) -> Result<()> {
        if self.server_version().await? < min_version {
            return Err(PartitionError::VersionUnsupported { feature });
        }
        Ok(())
    }

    async fn require_bound_support(&self, bound: &PartitionBound) -> Result<()> {
        match bound {
            PartitionBound::Hash { .. } => self.require_version(HASH_PARTITION_MIN_VERSION, "Hash partitions").await,
            PartitionBound::Default => self.require_version(HASH_PARTITION_MIN_VERSION, "Default partitions").await,
            _ => Ok(()),
        }
    }

    async fn require_strategy_support(&self, strategy: PartitionStrategy) -> Result<()> {
        if strategy == PartitionStrategy::Hash {
            self.require_version(HASH_PARTITION_MIN_VERSION, "Hash partitions").await?;
        }
        Ok(())
    }

    /// 명명 규칙에 따른 기본 키 컬럼
    pub fn primary_key_for(&self, table_name: &str) -> PrimaryKey {
        PrimaryKey::Column(self.convention.primary_key_for(table_name))
    }

    async fn uuid_function(&self) -> Result<&'static str> {
        if self.conn.supports_pgcrypto_uuid().await? {
            Ok(PGCRYPTO_UUID_FUNCTION)
        } else {
            Ok(UUID_OSSP_FUNCTION)
        }
    }

    /// 이미 열린 트랜잭션이 없을 때만 BEGIN/COMMIT 으로 감싼다
    pub(crate) async fn in_transaction<T, F>(&self, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let owned = !self.conn.transaction_open();
        if owned {
            self.conn.begin().await?;
        }

        match work.await {
            Ok(value) => {
                if owned {
                    self.conn.commit().await?;
                }
                Ok(value)
            }
            Err(e) => {
                if owned {
                    if let Err(rollback_err) = self.conn.rollback().await {
                        error!("트랜잭션 롤백 실패: {}", rollback_err);
                    }
                }
                Err(e)
            }
        }
    }

    /// 파티션 부모 테이블 생성
    pub async fn create_partitioned_table(
        &self,
        table_name: &str,
        strategy: PartitionStrategy,
        options: PartitionedTableOptions,
    ) -> Result<()> {
        self.ensure_partitioning_supported().await?;
        self.require_strategy_support(strategy).await?;

        let create_with_primary_key = options
            .create_with_primary_key
            .unwrap_or(self.config.create_with_primary_key);
        let primary_key = options
            .primary_key
            .clone()
            .unwrap_or_else(|| self.primary_key_for(table_name));
        if !create_with_primary_key {
            validate_primary_key(&primary_key)?;
        }
        let template = options.template.unwrap_or(self.config.create_template_tables);

        let mut definition = TableDefinition::new();
        if let (Some(sql_type), Some(column)) = (options.id.sql_type(), primary_key.single()) {
            let uuid_default = if options.id == IdType::Uuid {
                Some(self.uuid_function().await?)
            } else {
                None
            };

            let id_column = definition.column(column, sql_type);
            id_column.not_null();
            if let Some(function) = uuid_default {
                id_column.default_expr(function);
            }
        }
        for column in options.columns.columns() {
            definition.push(column.clone());
        }

        let partition_by = partition_by_clause(strategy, &options.partition_key);
        let create_sql = definition.to_create_sql(table_name, Some(&partition_by));

        self.in_transaction(async {
            self.conn.execute(&create_sql).await?;

            if create_with_primary_key && !primary_key.is_none() {
                self.conn
                    .execute(&add_primary_key_sql(table_name, &primary_key.column_names()))
                    .await?;
            }

            if template {
                let template_key = if options.id == IdType::None {
                    PrimaryKey::None
                } else {
                    primary_key.clone()
                };
                let like = TableLikeOptions {
                    primary_key: Some(template_key),
                    create_with_primary_key: Some(create_with_primary_key),
                    ..TableLikeOptions::default()
                };
                self.clone_table(table_name, &template_table_name(table_name), &like).await?;
            }

            Ok(())
        })
        .await?;

        self.cache.clear().await;
        info!("파티션 테이블 생성 완료: {} ({})", table_name, partition_by);
        Ok(())
    }

    /// CREATE TABLE dest (LIKE source ...)
    pub async fn create_table_like(&self, source: &str, dest: &str, options: TableLikeOptions) -> Result<()> {
        self.in_transaction(self.clone_table(source, dest, &options)).await?;
        self.cache.clear().await;
        info!("테이블 복제 완료: {} -> {}", source, dest);
        Ok(())
    }

    async fn clone_table(&self, source: &str, dest: &str, options: &TableLikeOptions) -> Result<()> {
        let create_with_primary_key = options
            .create_with_primary_key
            .unwrap_or(self.config.create_with_primary_key);
        let primary_key = options
            .primary_key
            .clone()
            .unwrap_or_else(|| self.primary_key_for(source));
        if !create_with_primary_key {
            validate_primary_key(&primary_key)?;
        }

        let partition_by = match (options.partition_type, &options.partition_key) {
            (Some(strategy), Some(key)) => {
                self.require_strategy_support(strategy).await?;
                Some(partition_by_clause(strategy, key))
            }
            (Some(_), None) => return Err(PartitionError::MissingPartitionKey),
            (None, _) => None,
        };

        let excluding_indexes = partition_by.is_some() && !create_with_primary_key;
        self.conn
            .execute(&create_table_like_sql(source, dest, excluding_indexes, partition_by.as_deref()))
            .await?;

        if partition_by.is_some() || primary_key.is_none() {
            return Ok(());
        }
        if self.introspector().has_primary_key(dest).await? {
            debug!("{} 는 이미 기본 키를 가지고 있음", dest);
            return Ok(());
        }

        self.conn
            .execute(&add_primary_key_sql(dest, &primary_key.column_names()))
            .await
    }

    /// 자식 파티션 생성 후 부모에 연결, 생성된 테이블 이름 반환
    pub async fn create_partition_of(
        &self,
        parent: &str,
        bound: PartitionBound,
        options: PartitionOfOptions,
    ) -> Result<String> {
        self.ensure_partitioning_supported().await?;
        self.require_bound_support(&bound).await?;

        if options.partition_type.is_some() && options.partition_key.is_none() {
            return Err(PartitionError::MissingPartitionKey);
        }

        let create_with_primary_key = options
            .create_with_primary_key
            .unwrap_or(self.config.create_with_primary_key);
        let primary_key = options
            .primary_key
            .clone()
            .unwrap_or_else(|| self.primary_key_for(parent));
        if !create_with_primary_key {
            validate_primary_key(&primary_key)?;
        }

        let child = options
            .name
            .clone()
            .unwrap_or_else(|| hashed_table_name(parent, &bound));

        let child = self
            .in_transaction(async {
                let root = self
                    .introspector()
                    .parent_for_table(parent, true)
                    .await
                    .unwrap_or_else(|| parent.to_string());
                let template = template_table_name(&root);

                let mut like = TableLikeOptions {
                    primary_key: None,
                    partition_type: options.partition_type,
                    partition_key: options.partition_key.clone(),
                    create_with_primary_key: Some(create_with_primary_key),
                };

                if self.conn.data_source_exists(&template).await? {
                    debug!("템플릿 테이블에서 복제: {} -> {}", template, child);
                    like.primary_key = Some(PrimaryKey::None);
                    self.clone_table(&template, &child, &like).await?;
                } else {
                    like.primary_key = Some(primary_key.clone());
                    self.clone_table(parent, &child, &like).await?;
                }

                self.conn.execute(&attach_partition_sql(parent, &child, &bound)).await?;

                if options.index {
                    self.index_subpartition_key(&child, &options, &primary_key).await?;
                }

                Ok(child.clone())
            })
            .await?;

        self.cache.clear().await;
        info!("파티션 생성 완료: {} ({} {})", child, parent, bound.for_values());
        Ok(child)
    }

    // 하위 파티션 키가 기본 키와 다르면 자식 테이블에 인덱스 생성
    async fn index_subpartition_key(
        &self,
        child: &str,
        options: &PartitionOfOptions,
        primary_key: &PrimaryKey,
    ) -> Result<()> {
        let columns = match (&options.partition_type, &options.partition_key) {
            (Some(_), Some(PartitionKey::Columns(columns))) => columns,
            _ => return Ok(()),
        };
        if *columns == primary_key.column_names() {
            return Ok(());
        }
        if self.server_version().await? < HASH_PARTITION_MIN_VERSION {
            debug!("PostgreSQL 11 미만에서는 파티션 테이블 인덱스를 만들 수 없음: {}", child);
            return Ok(());
        }

        let mut index_name = format!("index_{}_on_{}", child, columns.join("_and_"));
        if index_name.len() > MAX_IDENTIFIER_BYTES {
            index_name = hashed_name("index", &index_name);
        }

        let spec = IndexSpec {
            columns: columns.clone(),
            ..IndexSpec::default()
        };
        self.conn
            .execute(&create_index_sql(&index_name, child, &spec, false, false))
            .await
    }

    /// 기존 테이블을 파티션으로 연결
    pub async fn attach_partition(&self, parent: &str, child: &str, bound: PartitionBound) -> Result<()> {
        self.require_bound_support(&bound).await?;
        self.conn.execute(&attach_partition_sql(parent, child, &bound)).await?;
        self.cache.clear().await;
        info!("파티션 연결 완료: {} -> {} {}", child, parent, bound.for_values());
        Ok(())
    }

    /// 파티션 분리 (분리된 테이블은 삭제하지 않고 일반 테이블로 남는다)
    pub async fn detach_partition(&self, parent: &str, child: &str) -> Result<()> {
        self.conn.execute(&detach_partition_sql(parent, child)).await?;
        self.cache.clear().await;
        info!("파티션 분리 완료: {} <- {}", parent, child);
        Ok(())
    }

    pub async fn partitions_for_table(&self, table_name: &str, include_subpartitions: bool) -> Vec<String> {
        self.introspector()
            .partitions_for_table(table_name, include_subpartitions)
            .await
    }

    pub async fn parent_for_table(&self, table_name: &str, traverse: bool) -> Option<String> {
        self.introspector().parent_for_table(table_name, traverse).await
    }

    pub async fn table_partitioned(&self, table_name: &str) -> Result<bool> {
        self.introspector().is_table_partitioned(table_name).await
    }

    /// pg_dump 에 넘길 `-T schema.table` 인자 목록
    pub async fn structure_dump_exclusions(&self) -> Result<Vec<String>> {
        if !self.config.schema_exclude_partitions {
            return Ok(Vec::new());
        }

        let tables = self.introspector().partition_tables_for_dump().await?;
        debug!("구조 덤프에서 제외할 파티션: {}개", tables.len());
        Ok(tables
            .into_iter()
            .flat_map(|table| ["-T".to_string(), table])
            .collect())
    }
}

fn validate_primary_key(primary_key: &PrimaryKey) -> Result<()> {
    if let PrimaryKey::Composite(_) = primary_key {
        return Err(PartitionError::CompositePrimaryKey);
    }
    Ok(())
}
