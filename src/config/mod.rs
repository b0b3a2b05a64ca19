pub mod settings;

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// 파티션 관리 설정
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionConfig {
    /// 파티션 목록/모델 캐싱 사용 여부
    #[serde(default = "default_caching")]
    pub caching: bool,
    /// 캐시 유효 시간(초), 0 이하이면 만료되지 않음
    #[serde(default = "default_caching_ttl")]
    pub caching_ttl: i64,
    /// 구조 덤프에서 파티션 테이블 제외 여부
    #[serde(default = "default_true")]
    pub schema_exclude_partitions: bool,
    /// 템플릿 테이블 자동 생성 여부
    #[serde(default = "default_true")]
    pub create_template_tables: bool,
    /// 파티션마다 독립적인 기본 키 생성 여부
    #[serde(default)]
    pub create_with_primary_key: bool,
    /// 파티션 목록 조회 시 하위 파티션 포함 여부
    #[serde(default)]
    pub include_subpartitions_in_partition_list: bool,
}

fn default_caching() -> bool {
    true
}

fn default_caching_ttl() -> i64 {
    -1
}

fn default_true() -> bool {
    true
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            caching: default_caching(),
            caching_ttl: default_caching_ttl(),
            schema_exclude_partitions: true,
            create_template_tables: true,
            create_with_primary_key: false,
            include_subpartitions_in_partition_list: false,
        }
    }
}

impl PartitionConfig {
    /// 설정 파일(YAML)에서 로드
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: Self = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// 캐시 유효 시간 (None 이면 만료 없음)
    pub fn cache_ttl(&self) -> Option<Duration> {
        if self.caching_ttl > 0 {
            Some(Duration::from_secs(self.caching_ttl as u64))
        } else {
            None
        }
    }
}
