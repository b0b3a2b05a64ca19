use std::env;
use std::path::Path;

use log::{info, warn};

use crate::db::config::DbConfig;
use crate::error::Result;

/// 설정 소스 우선순위
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigSource {
    /// 환경 변수
    Environment,
    /// 설정 파일
    File,
    /// 기본값
    Default,
}

impl ConfigSource {
    fn describe(&self) -> &'static str {
        match self {
            ConfigSource::Environment => "환경 변수",
            ConfigSource::File => "설정 파일",
            ConfigSource::Default => "기본값",
        }
    }
}

/// 통합 설정 관리자
#[derive(Clone, Debug)]
pub struct Settings {
    /// 데이터베이스 및 파티션 설정
    pub database: DbConfig,
    /// 데이터베이스 설정 소스
    pub db_source: ConfigSource,
}

impl Settings {
    /// 새로운 설정 인스턴스 생성 (파일 로드 후 환경 변수 오버라이드)
    pub fn new() -> Result<Self> {
        let (database, db_source) = Self::load_db_config()?;
        let mut settings = Self { database, db_source };
        settings.override_from_env();
        Ok(settings)
    }

    /// 데이터베이스 설정 로드
    fn load_db_config() -> Result<(DbConfig, ConfigSource)> {
        // 1. 환경 변수에서 설정 파일 경로 확인
        if let Ok(path) = env::var("DB_CONFIG_FILE") {
            info!("환경 변수에서 DB 설정 파일 경로 로드: {}", path);
            if Path::new(&path).exists() {
                match DbConfig::load_from_file(&path) {
                    Ok(config) => return Ok((config, ConfigSource::Environment)),
                    Err(e) => {
                        warn!("환경 변수에 지정된 DB 설정 파일 로드 실패: {}", e);
                    }
                }
            } else {
                warn!("환경 변수에 지정된 DB 설정 파일이 존재하지 않음: {}", path);
            }
        }

        // 2. 현재 디렉토리의 db.yml 파일 확인
        if Path::new("db.yml").exists() {
            info!("DB 설정 파일 로드: db.yml");
            match DbConfig::load_from_file("db.yml") {
                Ok(config) => return Ok((config, ConfigSource::File)),
                Err(e) => {
                    warn!("기본 DB 설정 파일 로드 실패: {}", e);
                }
            }
        }

        // 3. 기본 설정 사용
        info!("DB 설정 파일을 찾을 수 없어 기본 설정 사용");
        Ok((DbConfig::default(), ConfigSource::Default))
    }

    /// 환경 변수에서 설정 값 오버라이드
    pub fn override_from_env(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// 조회 함수로 얻은 값으로 설정 오버라이드
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("DB_HOST") {
            info!("환경 변수에서 DB 호스트 설정: {}", host);
            self.database.connection.host = host;
            self.db_source = ConfigSource::Environment;
        }

        if let Some(port) = lookup("DB_PORT") {
            match port.parse::<u16>() {
                Ok(port) => {
                    info!("환경 변수에서 DB 포트 설정: {}", port);
                    self.database.connection.port = port;
                    self.db_source = ConfigSource::Environment;
                }
                Err(_) => warn!("환경 변수 DB_PORT 값이 유효한 포트 번호가 아님: {}", port),
            }
        }

        if let Some(name) = lookup("DB_NAME") {
            info!("환경 변수에서 DB 이름 설정: {}", name);
            self.database.connection.database = name;
            self.db_source = ConfigSource::Environment;
        }

        if let Some(user) = lookup("DB_USER") {
            info!("환경 변수에서 DB 사용자 설정: {}", user);
            self.database.connection.user = user;
            self.db_source = ConfigSource::Environment;
        }

        if let Some(password) = lookup("DB_PASSWORD") {
            info!("환경 변수에서 DB 비밀번호 설정");
            self.database.connection.password = password;
            self.db_source = ConfigSource::Environment;
        }

        if let Some(max_conn) = lookup("DB_MAX_CONNECTIONS") {
            if let Ok(max) = max_conn.parse::<usize>() {
                info!("환경 변수에서 DB 최대 연결 수 설정: {}", max);
                self.database.connection.max_connections = max;
                self.db_source = ConfigSource::Environment;
            }
        }

        // 파티션 캐시 설정 오버라이드
        if let Some(caching) = lookup("PARTITION_CACHING") {
            match caching.parse::<bool>() {
                Ok(caching) => {
                    info!("환경 변수에서 파티션 캐싱 설정: {}", caching);
                    self.database.partitioning.caching = caching;
                }
                Err(_) => warn!("환경 변수 PARTITION_CACHING 값이 true/false 가 아님: {}", caching),
            }
        }

        if let Some(ttl) = lookup("PARTITION_CACHING_TTL") {
            match ttl.parse::<i64>() {
                Ok(ttl) => {
                    info!("환경 변수에서 파티션 캐시 TTL 설정: {}초", ttl);
                    self.database.partitioning.caching_ttl = ttl;
                }
                Err(_) => warn!("환경 변수 PARTITION_CACHING_TTL 값이 정수가 아님: {}", ttl),
            }
        }
    }

    /// 설정 정보 로그 출력
    pub fn log_settings(&self) {
        info!("데이터베이스 설정 소스: {}", self.db_source.describe());
        info!(
            "데이터베이스 연결: {}:{}/{}",
            self.database.connection.host,
            self.database.connection.port,
            self.database.connection.database
        );

        let partitioning = &self.database.partitioning;
        info!(
            "파티션 캐싱: {} (TTL: {})",
            partitioning.caching,
            match partitioning.cache_ttl() {
                Some(ttl) => humantime::format_duration(ttl).to_string(),
                None => "만료 없음".to_string(),
            }
        );
    }
}
