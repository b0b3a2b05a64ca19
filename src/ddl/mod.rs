// DDL 생성 모듈
// 파티션 테이블, 파티션 연결/분리, 인덱스 관련 SQL 문자열을 만드는 순수 함수들입니다.
// 입력 검증은 PartitionManager 가 담당하고, 여기서는 잘 구성된 입력만 받는다고 가정합니다.

pub mod table;
pub mod value;

use std::fmt;
use std::str::FromStr;

use md5::{Digest, Md5};

use crate::constants::{DEFAULT_PARTITION_SUFFIX, HASH_SUFFIX_LEN, TEMPLATE_SUFFIX};
use crate::error::{PartitionError, Result};

pub use table::{ColumnDefinition, IdType, TableDefinition};
pub use value::{quote_collection, quote_ident, quote_literal, quote_table_name, SqlValue};

/// 파티션 전략
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionStrategy {
    Range,
    List,
    Hash,
}

impl PartitionStrategy {
    pub fn as_sql(&self) -> &'static str {
        match self {
            PartitionStrategy::Range => "RANGE",
            PartitionStrategy::List => "LIST",
            PartitionStrategy::Hash => "HASH",
        }
    }
}

impl FromStr for PartitionStrategy {
    type Err = PartitionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "range" => Ok(PartitionStrategy::Range),
            "list" => Ok(PartitionStrategy::List),
            "hash" => Ok(PartitionStrategy::Hash),
            _ => Err(PartitionError::UnsupportedPartitionType(s.to_string())),
        }
    }
}

impl fmt::Display for PartitionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_sql().to_ascii_lowercase())
    }
}

/// 파티션 키 - 컬럼 목록 또는 계산식
///
/// 계산식은 인용하지 않고 그대로 SQL 에 삽입됩니다. 호출자가 신뢰하는 값만 넘겨야 합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionKey {
    Columns(Vec<String>),
    Expression(String),
}

impl PartitionKey {
    pub fn column(name: impl Into<String>) -> Self {
        PartitionKey::Columns(vec![name.into()])
    }

    pub fn columns<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PartitionKey::Columns(names.into_iter().map(Into::into).collect())
    }

    pub fn expression(expr: impl Into<String>) -> Self {
        PartitionKey::Expression(expr.into())
    }

    /// 클로저가 돌려주는 계산식으로 키 생성
    pub fn computed<F>(f: F) -> Self
    where
        F: FnOnce() -> String,
    {
        PartitionKey::Expression(f())
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, PartitionKey::Expression(_))
    }

    pub fn column_names(&self) -> Option<&[String]> {
        match self {
            PartitionKey::Columns(columns) => Some(columns),
            PartitionKey::Expression(_) => None,
        }
    }

    pub fn to_sql(&self) -> String {
        match self {
            PartitionKey::Columns(columns) => columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(","),
            PartitionKey::Expression(expr) => expr.clone(),
        }
    }
}

impl From<&str> for PartitionKey {
    fn from(name: &str) -> Self {
        PartitionKey::column(name)
    }
}

impl From<String> for PartitionKey {
    fn from(name: String) -> Self {
        PartitionKey::column(name)
    }
}

/// 기본 키 지정
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryKey {
    /// 기본 키 없음
    None,
    Column(String),
    Composite(Vec<String>),
}

impl PrimaryKey {
    pub fn is_none(&self) -> bool {
        matches!(self, PrimaryKey::None)
    }

    pub fn column_names(&self) -> Vec<String> {
        match self {
            PrimaryKey::None => Vec::new(),
            PrimaryKey::Column(c) => vec![c.clone()],
            PrimaryKey::Composite(cs) => cs.clone(),
        }
    }

    /// 단일 컬럼 이름 (복합 키 / 없음이면 None)
    pub fn single(&self) -> Option<&str> {
        match self {
            PrimaryKey::Column(c) => Some(c),
            _ => None,
        }
    }
}

impl From<&str> for PrimaryKey {
    fn from(name: &str) -> Self {
        PrimaryKey::Column(name.to_string())
    }
}

impl From<String> for PrimaryKey {
    fn from(name: String) -> Self {
        PrimaryKey::Column(name)
    }
}

impl From<Vec<String>> for PrimaryKey {
    fn from(names: Vec<String>) -> Self {
        match names.len() {
            0 => PrimaryKey::None,
            1 => PrimaryKey::Column(names.into_iter().next().unwrap_or_default()),
            _ => PrimaryKey::Composite(names),
        }
    }
}

/// 파티션 경계 (FOR VALUES ... 절)
#[derive(Debug, Clone, PartialEq)]
pub enum PartitionBound {
    Range { start: Vec<SqlValue>, end: Vec<SqlValue> },
    List(Vec<SqlValue>),
    Hash { modulus: u32, remainder: u32 },
    Default,
}

impl PartitionBound {
    pub fn range(start: impl Into<SqlValue>, end: impl Into<SqlValue>) -> Self {
        PartitionBound::Range {
            start: vec![start.into()],
            end: vec![end.into()],
        }
    }

    /// 다중 컬럼 범위
    pub fn range_multi(start: Vec<SqlValue>, end: Vec<SqlValue>) -> Self {
        PartitionBound::Range { start, end }
    }

    pub fn list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        PartitionBound::List(values.into_iter().map(Into::into).collect())
    }

    pub fn hash(modulus: u32, remainder: u32) -> Self {
        PartitionBound::Hash { modulus, remainder }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, PartitionBound::Default)
    }

    /// 제약 절 (DEFAULT 파티션은 None)
    pub fn constraint_clause(&self) -> Option<String> {
        match self {
            PartitionBound::Range { start, end } => Some(format!(
                "FROM ({}) TO ({})",
                quote_collection(start),
                quote_collection(end)
            )),
            PartitionBound::List(values) => Some(format!("IN ({})", quote_collection(values))),
            PartitionBound::Hash { modulus, remainder } => {
                Some(format!("WITH (MODULUS {}, REMAINDER {})", modulus, remainder))
            }
            PartitionBound::Default => None,
        }
    }

    /// ATTACH PARTITION 뒤에 붙는 절
    pub fn for_values(&self) -> String {
        match self.constraint_clause() {
            Some(clause) => format!("FOR VALUES {}", clause),
            None => "DEFAULT".to_string(),
        }
    }
}

/// 인덱스 정의 (컬럼, 고유 여부, 접근 방식, 부분 인덱스 조건)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexSpec {
    pub columns: Vec<String>,
    pub unique: bool,
    pub using: Option<String>,
    pub where_clause: Option<String>,
}

/// 문자열의 MD5 16진수
pub fn md5_hex(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// `{base}_{md5(input) 앞 7자리}`
pub fn hashed_name(base: &str, input: &str) -> String {
    let digest = md5_hex(input);
    format!("{}_{}", base, &digest[..HASH_SUFFIX_LEN])
}

/// 자식 테이블 이름 유도 - 같은 부모/제약 절이면 항상 같은 이름
pub fn hashed_table_name(parent: &str, bound: &PartitionBound) -> String {
    match bound.constraint_clause() {
        Some(clause) => hashed_name(parent, &clause),
        None => format!("{}{}", parent, DEFAULT_PARTITION_SUFFIX),
    }
}

/// 하위 레벨 인덱스 이름 (루트 인덱스 이름 + 테이블 이름 해시)
pub fn hashed_index_name(base_index: &str, table_name: &str) -> String {
    hashed_name(base_index, table_name)
}

pub fn template_table_name(table_name: &str) -> String {
    format!("{}{}", table_name, TEMPLATE_SUFFIX)
}

pub fn partition_by_clause(strategy: PartitionStrategy, key: &PartitionKey) -> String {
    format!("PARTITION BY {} ({})", strategy.as_sql(), key.to_sql())
}

/// CREATE TABLE dest (LIKE source INCLUDING ALL [EXCLUDING INDEXES]) [PARTITION BY ...]
pub fn create_table_like_sql(
    source: &str,
    dest: &str,
    excluding_indexes: bool,
    partition_by: Option<&str>,
) -> String {
    let like_option = if excluding_indexes {
        "INCLUDING ALL EXCLUDING INDEXES"
    } else {
        "INCLUDING ALL"
    };

    let mut sql = format!(
        "CREATE TABLE {} (LIKE {} {})",
        quote_table_name(dest),
        quote_table_name(source),
        like_option
    );

    if let Some(clause) = partition_by {
        sql.push(' ');
        sql.push_str(clause);
    }

    sql
}

pub fn add_primary_key_sql(table_name: &str, columns: &[String]) -> String {
    let columns = columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(",");
    format!("ALTER TABLE {} ADD PRIMARY KEY ({})", quote_table_name(table_name), columns)
}

pub fn attach_partition_sql(parent: &str, child: &str, bound: &PartitionBound) -> String {
    format!(
        "ALTER TABLE {} ATTACH PARTITION {} {}",
        quote_table_name(parent),
        quote_table_name(child),
        bound.for_values()
    )
}

pub fn detach_partition_sql(parent: &str, child: &str) -> String {
    format!(
        "ALTER TABLE {} DETACH PARTITION {}",
        quote_table_name(parent),
        quote_table_name(child)
    )
}

/// CREATE [UNIQUE] INDEX [CONCURRENTLY] name ON [ONLY] table [USING method] (cols) [WHERE pred]
pub fn create_index_sql(
    index_name: &str,
    table_name: &str,
    spec: &IndexSpec,
    concurrently: bool,
    only: bool,
) -> String {
    let mut sql = String::from("CREATE ");
    if spec.unique {
        sql.push_str("UNIQUE ");
    }
    sql.push_str("INDEX ");
    if concurrently {
        sql.push_str("CONCURRENTLY ");
    }
    sql.push_str(&quote_ident(index_name));
    sql.push_str(" ON ");
    if only {
        sql.push_str("ONLY ");
    }
    sql.push_str(&quote_table_name(table_name));

    if let Some(method) = &spec.using {
        sql.push_str(" USING ");
        sql.push_str(&access_method(method));
    }

    let columns = spec.columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", ");
    sql.push_str(&format!(" ({})", columns));

    if let Some(predicate) = &spec.where_clause {
        sql.push_str(" WHERE ");
        sql.push_str(predicate);
    }

    sql
}

pub fn attach_index_sql(parent_index: &str, child_index: &str) -> String {
    format!(
        "ALTER INDEX {} ATTACH PARTITION {}",
        quote_ident(parent_index),
        quote_ident(child_index)
    )
}

pub fn drop_index_sql(index_name: &str) -> String {
    format!("DROP INDEX IF EXISTS {}", quote_ident(index_name))
}

// 접근 방식 이름은 소문자 식별자만 그대로 사용
fn access_method(method: &str) -> String {
    let method = method.to_ascii_lowercase();
    if !method.is_empty() && method.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        method
    } else {
        quote_ident(&method)
    }
}
