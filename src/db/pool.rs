use std::sync::Arc;

use async_trait::async_trait;
use deadpool_postgres::{Config, Object, Pool, PoolConfig, Runtime};
use log::{debug, info};
use tokio_postgres::NoTls;

use super::config::DbConfig;
use super::connection::{Connection, ConnectionPool, PgConnection};
use crate::error::{PartitionError, Result};

/// 데이터베이스 풀 관리자 구조체
pub struct DatabasePool {
    pool: Pool,
    config: DbConfig,
}

/// 풀 상태 구조체
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub max_size: usize,
    pub available: usize,
    pub size: usize,
}

impl DatabasePool {
    /// 새 DatabasePool 인스턴스 생성
    pub fn new(pool: Pool, config: DbConfig) -> Self {
        Self { pool, config }
    }

    /// 데이터베이스 연결 풀 생성 및 연결 테스트
    pub async fn connect(db_config: &DbConfig) -> Result<Arc<Self>> {
        let conn_config = &db_config.connection;

        // deadpool-postgres 설정 생성
        let mut cfg = Config::new();
        cfg.host = Some(conn_config.host.clone());
        cfg.port = Some(conn_config.port);
        cfg.user = Some(conn_config.user.clone());
        cfg.password = Some(conn_config.password.clone());
        cfg.dbname = Some(conn_config.database.clone());
        cfg.pool = Some(PoolConfig::new(conn_config.max_connections));
        cfg.connect_timeout = Some(db_config.get_connection_timeout());

        debug!("DB 연결 풀 생성 중... (최대 연결: {})", conn_config.max_connections);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| PartitionError::Config(e.to_string()))?;

        // 연결 테스트
        let client = pool.get().await?;
        let row = client
            .query_one("SELECT version()", &[])
            .await
            .map_err(|e| PartitionError::query("SELECT version()", e))?;
        let version: String = row.get(0);
        info!("DB 연결 성공: {}", version);

        Ok(Arc::new(Self::new(pool, db_config.clone())))
    }

    /// 클라이언트 가져오기
    pub async fn get_client(&self) -> Result<Object> {
        Ok(self.pool.get().await?)
    }

    /// 설정 가져오기
    pub fn get_config(&self) -> &DbConfig {
        &self.config
    }

    /// 풀 상태 확인
    pub fn get_pool_status(&self) -> PoolStatus {
        let status = self.pool.status();
        PoolStatus {
            max_size: status.max_size,
            available: status.available,
            size: status.size,
        }
    }
}

#[async_trait]
impl ConnectionPool for DatabasePool {
    fn size(&self) -> usize {
        self.pool.status().max_size
    }

    async fn checkout(&self) -> Result<Box<dyn Connection>> {
        let client = self.get_client().await?;
        let status = self.get_pool_status();
        debug!("DB 풀 상태: 사용 가능 {}/{} (최대 {})", status.available, status.size, status.max_size);
        Ok(Box::new(PgConnection::new(client)))
    }
}
