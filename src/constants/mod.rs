// SQL 상수 모듈 (카탈로그 조회 쿼리 및 식별자 제한 관리)
pub mod catalog;

// PostgreSQL 식별자 최대 길이 (NAMEDATALEN - 1)
pub const MAX_IDENTIFIER_BYTES: usize = 63;

// 파티션 인덱스 기본 이름 최대 길이 (해시 접미사 8바이트 여유)
pub const MAX_INDEX_NAME_BYTES: usize = 55;

// 파생 테이블/인덱스 이름에 붙는 MD5 접두 길이
pub const HASH_SUFFIX_LEN: usize = 7;

// 템플릿 테이블 접미사
pub const TEMPLATE_SUFFIX: &str = "_template";

// 기본(DEFAULT) 파티션 접미사
pub const DEFAULT_PARTITION_SUFFIX: &str = "_default";

// 서버 버전 (server_version_num 형식)
pub const PARTITIONING_MIN_VERSION: i32 = 100_000;   // 선언적 파티셔닝
pub const HASH_PARTITION_MIN_VERSION: i32 = 110_000; // 해시/기본 파티션, 파티션 인덱스
pub const BUILTIN_UUID_MIN_VERSION: i32 = 130_000;   // gen_random_uuid() 내장

// UUID 기본값 함수
pub const PGCRYPTO_UUID_FUNCTION: &str = "gen_random_uuid()";
pub const UUID_OSSP_FUNCTION: &str = "uuid_generate_v4()";
