use super::value::quote_ident;
use super::value::quote_table_name;

/// 기본 키 컬럼 저장 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdType {
    #[default]
    BigSerial,
    Serial,
    /// 기본값 함수(gen_random_uuid / uuid_generate_v4)가 붙는 UUID
    Uuid,
    /// 기본 키 컬럼을 만들지 않음
    None,
}

impl IdType {
    pub fn sql_type(&self) -> Option<&'static str> {
        match self {
            IdType::BigSerial => Some("bigserial"),
            IdType::Serial => Some("serial"),
            IdType::Uuid => Some("uuid"),
            IdType::None => None,
        }
    }
}

/// 컬럼 정의
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub sql_type: String,
    pub null: bool,
    pub default: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            null: true,
            default: None,
        }
    }

    pub fn not_null(&mut self) -> &mut Self {
        self.null = false;
        self
    }

    /// 기본값 표현식 (인용하지 않음)
    pub fn default_expr(&mut self, expr: impl Into<String>) -> &mut Self {
        self.default = Some(expr.into());
        self
    }

    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", quote_ident(&self.name), self.sql_type);
        if let Some(default) = &self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        if !self.null {
            sql.push_str(" NOT NULL");
        }
        sql
    }
}

/// 테이블 정의 - 호출자가 컬럼 콜백으로 채운다
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableDefinition {
    columns: Vec<ColumnDefinition>,
}

impl TableDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// 컬럼 추가 후 세부 옵션 설정용 참조 반환
    pub fn column(&mut self, name: impl Into<String>, sql_type: impl Into<String>) -> &mut ColumnDefinition {
        self.columns.push(ColumnDefinition::new(name, sql_type));
        let last = self.columns.len() - 1;
        &mut self.columns[last]
    }

    /// created_at / updated_at 컬럼 추가
    pub fn timestamps(&mut self) {
        self.column("created_at", "timestamp without time zone").not_null();
        self.column("updated_at", "timestamp without time zone").not_null();
    }

    pub fn push(&mut self, column: ColumnDefinition) {
        self.columns.push(column);
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// CREATE TABLE 문 생성 (`suffix` 는 PARTITION BY 절 등)
    pub fn to_create_sql(&self, table_name: &str, suffix: Option<&str>) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("  {}", c.to_sql()))
            .collect::<Vec<_>>()
            .join(",\n");

        let body = if columns.is_empty() {
            "()".to_string()
        } else {
            format!("(\n{}\n)", columns)
        };

        match suffix {
            Some(suffix) => format!("CREATE TABLE {} {} {}", quote_table_name(table_name), body, suffix),
            None => format!("CREATE TABLE {} {}", quote_table_name(table_name), body),
        }
    }
}
