use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use deadpool_postgres::Object;
use log::trace;
use tokio_postgres::SimpleQueryMessage;

use crate::constants::catalog;
use crate::error::{PartitionError, Result};

/// 파티션 관리에 필요한 최소한의 연결 인터페이스
///
/// 모든 SQL 은 단순 쿼리 프로토콜로 실행됩니다. `CREATE INDEX CONCURRENTLY` 처럼
/// 트랜잭션 블록 밖에서만 허용되는 문장도 그대로 보낼 수 있어야 하기 때문입니다.
#[async_trait]
pub trait Connection: Send + Sync {
    /// 결과가 없는 SQL 실행
    async fn execute(&self, sql: &str) -> Result<()>;

    /// 각 행의 첫 번째 컬럼 값을 문자열로 반환
    async fn select_values(&self, sql: &str) -> Result<Vec<String>>;

    async fn begin(&self) -> Result<()>;

    async fn commit(&self) -> Result<()>;

    async fn rollback(&self) -> Result<()>;

    /// 현재 트랜잭션 블록 안에 있는지 여부
    fn transaction_open(&self) -> bool;

    /// server_version_num (예: 110005)
    async fn server_version_num(&self) -> Result<i32> {
        let values = self.select_values(catalog::SERVER_VERSION_NUM).await?;
        let raw = values.first().cloned().unwrap_or_default();
        raw.trim()
            .parse::<i32>()
            .map_err(|e| PartitionError::query(catalog::SERVER_VERSION_NUM, e))
    }

    /// 테이블/뷰 존재 여부
    async fn data_source_exists(&self, name: &str) -> Result<bool> {
        let values = self.select_values(&catalog::table_exists(name)).await?;
        Ok(!values.is_empty())
    }

    /// gen_random_uuid() 사용 가능 여부 (PG13+ 내장 또는 pgcrypto 설치)
    async fn supports_pgcrypto_uuid(&self) -> Result<bool> {
        if self.server_version_num().await? >= crate::constants::BUILTIN_UUID_MIN_VERSION {
            return Ok(true);
        }
        let values = self.select_values(catalog::PGCRYPTO_INSTALLED).await?;
        Ok(!values.is_empty())
    }
}

/// 연결 풀 인터페이스 - 인덱스 워커가 각자 연결을 빌려 쓸 때 사용
#[async_trait]
pub trait ConnectionPool: Send + Sync {
    /// 설정된 최대 연결 수
    fn size(&self) -> usize;

    /// 연결 대여 - 반환된 값이 drop 되면 풀로 돌아간다
    async fn checkout(&self) -> Result<Box<dyn Connection>>;
}

/// deadpool 에서 빌린 PostgreSQL 연결
pub struct PgConnection {
    client: Object,
    depth: AtomicUsize,
}

impl PgConnection {
    pub fn new(client: Object) -> Self {
        Self {
            client,
            depth: AtomicUsize::new(0),
        }
    }

    fn leave_transaction(&self) {
        let _ = self
            .depth
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |d| Some(d.saturating_sub(1)));
    }
}

#[async_trait]
impl Connection for PgConnection {
    async fn execute(&self, sql: &str) -> Result<()> {
        trace!("쿼리 실행: {}", sql);
        self.client
            .batch_execute(sql)
            .await
            .map_err(|e| PartitionError::query(sql, e))
    }

    async fn select_values(&self, sql: &str) -> Result<Vec<String>> {
        trace!("쿼리 실행 및 결과 매핑: {}", sql);
        let messages = self
            .client
            .simple_query(sql)
            .await
            .map_err(|e| PartitionError::query(sql, e))?;

        let mut values = Vec::new();
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                if let Some(value) = row.get(0) {
                    values.push(value.to_string());
                }
            }
        }

        Ok(values)
    }

    async fn begin(&self) -> Result<()> {
        self.execute("BEGIN").await?;
        self.depth.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        let result = self.execute("COMMIT").await;
        self.leave_transaction();
        result
    }

    async fn rollback(&self) -> Result<()> {
        let result = self.execute("ROLLBACK").await;
        self.leave_transaction();
        result
    }

    fn transaction_open(&self) -> bool {
        self.depth.load(Ordering::SeqCst) > 0
    }
}
