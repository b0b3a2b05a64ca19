// 기본 키 명명 규칙
// 테이블 이름을 단수형으로 바꾼 뒤 접두 규칙에 따라 기본 키 컬럼 이름을 정합니다.

/// 테이블 이름으로 기본 키 컬럼 이름을 정하는 규칙
pub trait PrimaryKeyConvention: Send + Sync {
    fn primary_key_for(&self, table_name: &str) -> String;
}

/// 기본 키 접두 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimaryKeyPrefix {
    /// `id`
    #[default]
    None,
    /// `orderid`
    TableName,
    /// `order_id`
    TableNameWithUnderscore,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConvention {
    pub prefix: PrimaryKeyPrefix,
}

impl DefaultConvention {
    pub fn new(prefix: PrimaryKeyPrefix) -> Self {
        Self { prefix }
    }
}

impl PrimaryKeyConvention for DefaultConvention {
    fn primary_key_for(&self, table_name: &str) -> String {
        match self.prefix {
            PrimaryKeyPrefix::None => "id".to_string(),
            PrimaryKeyPrefix::TableName => format!("{}id", singularize(base_name(table_name))),
            PrimaryKeyPrefix::TableNameWithUnderscore => format!("{}_id", singularize(base_name(table_name))),
        }
    }
}

// schema.table 이면 table 부분만
fn base_name(table_name: &str) -> &str {
    table_name.rsplit('.').next().unwrap_or(table_name)
}

/// 영어 복수형 테이블 이름의 단순 단수화
pub fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{}y", stem);
        }
    }

    for suffix in ["sses", "shes", "ches", "xes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }

    if word.ends_with('s') && !word.ends_with("ss") && !word.ends_with("us") {
        return word[..word.len() - 1].to_string();
    }

    word.to_string()
}
