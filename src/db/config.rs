use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::RwLock;
use std::time::Duration;

use log::{error, info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::config::PartitionConfig;
use crate::error::{PartitionError, Result};

// 애플리케이션 진입점 편의를 위한 프로세스 전역 기본 설정
// PartitionManager 는 이 값을 직접 읽지 않고 항상 설정을 명시적으로 받습니다.
pub static DB_CONFIG: Lazy<RwLock<DbConfig>> = Lazy::new(|| {
    match DbConfig::load_from_file("db.yml") {
        Ok(config) => RwLock::new(config),
        Err(_) => {
            warn!("db.yml 설정 파일을 찾을 수 없거나 로드할 수 없습니다. 기본 설정을 사용합니다.");
            RwLock::new(DbConfig::default())
        }
    }
});

/// 데이터베이스 연결 설정
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    #[serde(default = "default_connection_pool_size")]
    pub max_connections: usize,
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_seconds: u64,
}

fn default_connection_pool_size() -> usize {
    20
}

fn default_connection_timeout() -> u64 {
    30
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "postgres".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            max_connections: default_connection_pool_size(),
            connection_timeout_seconds: default_connection_timeout(),
        }
    }
}

/// 데이터베이스 설정
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub partitioning: PartitionConfig,
}

impl DbConfig {
    /// 설정 파일에서 DB 설정 로드
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("DB 설정 파일 로드: {}", path.display());

        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config = Self::from_yaml(&contents)?;
        info!(
            "DB 설정 로드 완료: {}:{}/{}",
            config.connection.host, config.connection.port, config.connection.database
        );

        Ok(config)
    }

    /// YAML 문자열에서 설정 파싱
    pub fn from_yaml(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// 전역 설정 초기화
    pub fn initialize<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Self::load_from_file(path).map_err(|e| {
            error!("DB 설정 파일 로드 실패: {}", e);
            e
        })?;

        let mut global_config = DB_CONFIG.write().map_err(|_| {
            error!("DB 설정 글로벌 변수 잠금 획득 실패");
            PartitionError::Config("DB 설정 글로벌 변수 잠금 획득 실패".to_string())
        })?;
        *global_config = config;
        Ok(())
    }

    /// 전역 설정 가져오기
    pub fn get() -> Result<Self> {
        DB_CONFIG.read().map(|config| config.clone()).map_err(|_| {
            error!("DB 설정 글로벌 변수 읽기 잠금 획득 실패");
            PartitionError::Config("DB 설정 글로벌 변수 읽기 잠금 획득 실패".to_string())
        })
    }

    /// 연결 제한 시간 설정 가져오기
    pub fn get_connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection.connection_timeout_seconds)
    }

    /// 연결 풀 최대 크기 가져오기
    pub fn get_max_connections(&self) -> usize {
        self.connection.max_connections
    }
}
