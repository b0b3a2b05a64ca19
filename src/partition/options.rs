use crate::ddl::{IdType, PartitionKey, PartitionStrategy, PrimaryKey, TableDefinition};

/// 파티션 부모 테이블 생성 옵션
#[derive(Debug, Clone)]
pub struct PartitionedTableOptions {
    pub partition_key: PartitionKey,
    /// None 이면 명명 규칙으로 추론
    pub primary_key: Option<PrimaryKey>,
    pub id: IdType,
    /// None 이면 설정의 create_template_tables
    pub template: Option<bool>,
    /// None 이면 설정의 create_with_primary_key
    pub create_with_primary_key: Option<bool>,
    pub columns: TableDefinition,
}

impl PartitionedTableOptions {
    pub fn new(partition_key: impl Into<PartitionKey>) -> Self {
        Self {
            partition_key: partition_key.into(),
            primary_key: None,
            id: IdType::default(),
            template: None,
            create_with_primary_key: None,
            columns: TableDefinition::new(),
        }
    }

    pub fn primary_key(mut self, key: impl Into<PrimaryKey>) -> Self {
        self.primary_key = Some(key.into());
        self
    }

    /// 기본 키 없이 생성
    pub fn without_primary_key(mut self) -> Self {
        self.primary_key = Some(PrimaryKey::None);
        self.id = IdType::None;
        self
    }

    pub fn id(mut self, id: IdType) -> Self {
        self.id = id;
        self
    }

    pub fn template(mut self, template: bool) -> Self {
        self.template = Some(template);
        self
    }

    pub fn create_with_primary_key(mut self, enabled: bool) -> Self {
        self.create_with_primary_key = Some(enabled);
        self
    }

    /// 컬럼 정의 콜백
    pub fn columns<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut TableDefinition),
    {
        f(&mut self.columns);
        self
    }
}

/// 자식 파티션 생성 옵션
#[derive(Debug, Clone)]
pub struct PartitionOfOptions {
    /// None 이면 제약 절 해시로 이름 유도
    pub name: Option<String>,
    pub primary_key: Option<PrimaryKey>,
    /// 하위 파티션 키 인덱스 자동 생성 여부
    pub index: bool,
    /// 자식을 다시 파티션 테이블로 만들 때의 전략
    pub partition_type: Option<PartitionStrategy>,
    pub partition_key: Option<PartitionKey>,
    pub create_with_primary_key: Option<bool>,
}

impl Default for PartitionOfOptions {
    fn default() -> Self {
        Self {
            name: None,
            primary_key: None,
            index: true,
            partition_type: None,
            partition_key: None,
            create_with_primary_key: None,
        }
    }
}

impl PartitionOfOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn primary_key(mut self, key: impl Into<PrimaryKey>) -> Self {
        self.primary_key = Some(key.into());
        self
    }

    pub fn index(mut self, index: bool) -> Self {
        self.index = index;
        self
    }

    /// 하위 파티션 지정
    pub fn subpartition(mut self, strategy: PartitionStrategy, key: impl Into<PartitionKey>) -> Self {
        self.partition_type = Some(strategy);
        self.partition_key = Some(key.into());
        self
    }

    pub fn create_with_primary_key(mut self, enabled: bool) -> Self {
        self.create_with_primary_key = Some(enabled);
        self
    }
}

/// LIKE 복제 옵션
#[derive(Debug, Clone, Default)]
pub struct TableLikeOptions {
    /// None 이면 원본 테이블 이름으로 추론, Some(PrimaryKey::None) 이면 기본 키 추가 안 함
    pub primary_key: Option<PrimaryKey>,
    pub partition_type: Option<PartitionStrategy>,
    pub partition_key: Option<PartitionKey>,
    pub create_with_primary_key: Option<bool>,
}

impl TableLikeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primary_key(mut self, key: impl Into<PrimaryKey>) -> Self {
        self.primary_key = Some(key.into());
        self
    }

    pub fn without_primary_key(mut self) -> Self {
        self.primary_key = Some(PrimaryKey::None);
        self
    }

    pub fn partition_by(mut self, strategy: PartitionStrategy, key: impl Into<PartitionKey>) -> Self {
        self.partition_type = Some(strategy);
        self.partition_key = Some(key.into());
        self
    }

    pub fn create_with_primary_key(mut self, enabled: bool) -> Self {
        self.create_with_primary_key = Some(enabled);
        self
    }
}
