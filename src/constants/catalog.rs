// 카탈로그 조회 SQL
// 테이블 이름은 항상 문자열 리터럴로 인용해서 삽입합니다.

use crate::ddl::quote_literal;

/// 서버 버전 조회 쿼리
pub const SERVER_VERSION_NUM: &str = "SHOW server_version_num";

/// pgcrypto 확장 설치 여부 조회 쿼리
pub const PGCRYPTO_INSTALLED: &str =
    "SELECT extname FROM pg_catalog.pg_extension WHERE extname = 'pgcrypto'";

/// 구조 덤프에서 제외할 파티션 목록 조회 쿼리 (schema.table 형식)
pub const PARTITION_TABLES_FOR_DUMP: &str = "
    SELECT CONCAT(pg_namespace.nspname, '.', child.relname)
    FROM pg_inherits
      JOIN pg_class parent ON pg_inherits.inhparent = parent.oid
      JOIN pg_class child  ON pg_inherits.inhrelid  = child.oid
      JOIN pg_namespace    ON parent.relnamespace = pg_namespace.oid
    WHERE parent.relkind = 'p'
    ORDER BY child.oid
";

/// 직계 파티션 목록 조회 쿼리 (생성 순서)
pub fn partitions_of(table_name: &str) -> String {
    format!(
        "
    SELECT pg_inherits.inhrelid::regclass::text
    FROM pg_tables
    INNER JOIN pg_inherits
      ON pg_tables.tablename::regclass = pg_inherits.inhparent::regclass
    WHERE pg_tables.schemaname = current_schema()
    AND pg_tables.tablename = {}
    ORDER BY pg_inherits.inhrelid
",
        quote_literal(table_name)
    )
}

/// 부모 테이블 조회 쿼리
pub fn parent_of(table_name: &str) -> String {
    format!(
        "
    SELECT pg_inherits.inhparent::regclass::text
    FROM pg_tables
    INNER JOIN pg_inherits
      ON pg_tables.tablename::regclass = pg_inherits.inhrelid::regclass
    WHERE pg_tables.schemaname = current_schema()
    AND pg_tables.tablename = {}
",
        quote_literal(table_name)
    )
}

/// 파티션 테이블(relkind = 'p') 여부 조회 쿼리
pub fn partitioned_relkind(table_name: &str) -> String {
    format!(
        "SELECT relkind FROM pg_catalog.pg_class WHERE relname = {} AND relkind = 'p' AND pg_catalog.pg_table_is_visible(oid)",
        quote_literal(table_name)
    )
}

/// 테이블 존재 여부 조회 쿼리
pub fn table_exists(table_name: &str) -> String {
    format!(
        "
    SELECT c.relname
    FROM pg_catalog.pg_class c
    WHERE c.relname = {}
    AND c.relkind IN ('r', 'p', 'v', 'm', 'f')
    AND pg_catalog.pg_table_is_visible(c.oid)
",
        quote_literal(table_name)
    )
}

/// 기본 키 컬럼 조회 쿼리
pub fn primary_key_columns(table_name: &str) -> String {
    format!(
        "
    SELECT a.attname
    FROM pg_catalog.pg_index i
    JOIN pg_catalog.pg_class c ON c.oid = i.indrelid
    JOIN pg_catalog.pg_attribute a
      ON a.attrelid = i.indrelid AND a.attnum = ANY(i.indkey)
    WHERE i.indisprimary
    AND c.relname = {}
    AND pg_catalog.pg_table_is_visible(c.oid)
    ORDER BY array_position(i.indkey::int2[], a.attnum)
",
        quote_literal(table_name)
    )
}

/// 인덱스 존재 여부 조회 쿼리
pub fn index_exists(index_name: &str) -> String {
    format!(
        "SELECT relname FROM pg_catalog.pg_class WHERE relname = {} AND relkind IN ('i', 'I') AND pg_catalog.pg_table_is_visible(oid)",
        quote_literal(index_name)
    )
}

/// 유효하지 않은(indisvalid = false) 인덱스 조회 쿼리
pub fn invalid_indexes(index_names: &[String]) -> String {
    let names = index_names
        .iter()
        .map(|name| quote_literal(name))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "
    SELECT c.relname
    FROM pg_catalog.pg_class c
    JOIN pg_catalog.pg_index i ON i.indexrelid = c.oid
    WHERE NOT i.indisvalid
    AND c.relname IN ({})
",
        names
    )
}
