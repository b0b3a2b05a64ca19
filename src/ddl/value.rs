use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

/// 파티션 경계 및 조회 조건에 쓰이는 SQL 값
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Uuid(Uuid),
    /// 범위 파티션 하한 없음
    MinValue,
    /// 범위 파티션 상한 없음
    MaxValue,
}

impl SqlValue {
    /// SQL 리터럴로 변환
    ///
    /// 불리언은 카탈로그에 저장되는 형태와 맞추기 위해 `'t'` / `'f'` 로 출력합니다.
    pub fn quote(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(true) => "'t'".to_string(),
            SqlValue::Bool(false) => "'f'".to_string(),
            SqlValue::Int(v) => v.to_string(),
            SqlValue::Float(v) if v.is_nan() => "'NaN'".to_string(),
            SqlValue::Float(v) if v.is_infinite() => {
                if v.is_sign_positive() { "'Infinity'" } else { "'-Infinity'" }.to_string()
            }
            SqlValue::Float(v) => v.to_string(),
            SqlValue::Text(v) => quote_literal(v),
            SqlValue::Date(v) => quote_literal(&v.format("%Y-%m-%d").to_string()),
            SqlValue::Timestamp(v) => quote_literal(&v.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
            SqlValue::Uuid(v) => quote_literal(&v.to_string()),
            SqlValue::MinValue => "MINVALUE".to_string(),
            SqlValue::MaxValue => "MAXVALUE".to_string(),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.quote())
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v as i64)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        SqlValue::Int(v as i64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::Timestamp(v)
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// 문자열 리터럴 인용 ('' 이스케이프)
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// 식별자 인용 ("" 이스케이프)
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// 테이블 이름 인용 (schema.table 형식 지원)
pub fn quote_table_name(name: &str) -> String {
    match name.split_once('.') {
        Some((schema, table)) if !schema.is_empty() && !table.is_empty() && !name.starts_with('"') => {
            format!("{}.{}", quote_ident(schema), quote_ident(table))
        }
        _ => quote_ident(name),
    }
}

/// 값 목록을 쉼표로 연결
pub fn quote_collection(values: &[SqlValue]) -> String {
    values.iter().map(SqlValue::quote).collect::<Vec<_>>().join(",")
}
