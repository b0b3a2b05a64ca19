// 모델 수준 파티션 헬퍼
// 파티션 키 조건 쿼리, 특정 자식 파티션으로 한정한 쿼리, 파티션 목록 조회를 제공합니다.

pub mod naming;

use std::sync::Arc;

use log::warn;

use crate::ddl::{
    quote_collection, quote_ident, quote_table_name, PartitionBound, PartitionKey, PartitionStrategy, PrimaryKey,
    SqlValue,
};
use crate::error::{PartitionError, Result};
use crate::partition::{PartitionManager, PartitionOfOptions};

/// 파티션 한정 쿼리 템플릿
///
/// `source` 가 있으면 부모 대신 그 자식 테이블을 읽는다. 계산식 파티션 키 조건은
/// 하위 SELECT 안에 두고 바깥에서는 원래 테이블 이름으로 별칭을 붙인다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionQuery {
    table_name: String,
    source: Option<String>,
    inner_filters: Vec<String>,
    filters: Vec<String>,
}

impl PartitionQuery {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            source: None,
            inner_filters: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// 읽을 테이블 교체
    pub fn from_table(mut self, table_name: impl Into<String>) -> Self {
        self.source = Some(table_name.into());
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn source_table(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.table_name)
    }

    /// 조건에 쓰는 별칭 (스키마를 뗀 테이블 이름)
    pub fn alias(&self) -> &str {
        let source = self.source_table();
        source.rsplit('.').next().unwrap_or(source)
    }

    /// 임의 조건 추가 (인용하지 않음)
    pub fn filter(mut self, condition: impl Into<String>) -> Self {
        self.filters.push(condition.into());
        self
    }

    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    pub fn partition_key_eq<I, V>(self, key: &PartitionKey, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        let values = collect_values(values);
        match key {
            PartitionKey::Expression(expr) => {
                Ok(self.inner_filter(format!("({}) = ({})", expr, quote_collection(&values))))
            }
            PartitionKey::Columns(columns) => {
                let conditions = self.compare_columns(columns, &values, "=")?;
                Ok(self.with_filters(conditions))
            }
        }
    }

    /// start 이상 end 미만
    pub fn partition_key_in_range<I, J, V, W>(self, key: &PartitionKey, start: I, end: J) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        J: IntoIterator<Item = W>,
        V: Into<SqlValue>,
        W: Into<SqlValue>,
    {
        let start = collect_values(start);
        let end = collect_values(end);
        match key {
            PartitionKey::Expression(expr) => Ok(self.inner_filter(format!(
                "({expr}) >= ({}) AND ({expr}) < ({})",
                quote_collection(&start),
                quote_collection(&end)
            ))),
            PartitionKey::Columns(columns) => {
                let mut conditions = self.compare_columns(columns, &start, ">=")?;
                conditions.extend(self.compare_columns(columns, &end, "<")?);
                Ok(self.with_filters(conditions))
            }
        }
    }

    pub fn partition_key_in_list<I, V>(self, key: &PartitionKey, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        let values = collect_values(values);
        match key {
            PartitionKey::Expression(expr) => {
                let condition = in_condition(&format!("({})", expr), &values);
                Ok(self.inner_filter(condition))
            }
            PartitionKey::Columns(columns) => {
                if columns.len() != 1 {
                    return Err(PartitionError::KeyValueMismatch);
                }
                let condition = in_condition(&self.column_ref(&columns[0]), &values);
                Ok(self.with_filters(vec![condition]))
            }
        }
    }

    pub fn to_sql(&self) -> String {
        let source = quote_table_name(self.source_table());
        let from = if self.inner_filters.is_empty() {
            source
        } else {
            format!(
                "(SELECT * FROM {} WHERE {}) AS {}",
                source,
                self.inner_filters.join(" AND "),
                quote_ident(self.alias())
            )
        };

        let mut sql = format!("SELECT * FROM {}", from);
        if !self.filters.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.filters.join(" AND "));
        }
        sql
    }

    fn column_ref(&self, column: &str) -> String {
        format!("{}.{}", quote_ident(self.alias()), quote_ident(column))
    }

    fn compare_columns(&self, columns: &[String], values: &[SqlValue], op: &str) -> Result<Vec<String>> {
        if columns.len() != values.len() {
            return Err(PartitionError::KeyValueMismatch);
        }

        Ok(columns
            .iter()
            .zip(values)
            .map(|(column, value)| match (value, op) {
                (SqlValue::Null, "=") => format!("{} IS NULL", self.column_ref(column)),
                _ => format!("{} {} {}", self.column_ref(column), op, value.quote()),
            })
            .collect())
    }

    fn inner_filter(mut self, condition: String) -> Self {
        self.inner_filters.push(condition);
        self
    }

    fn with_filters(mut self, conditions: Vec<String>) -> Self {
        self.filters.extend(conditions);
        self
    }
}

fn collect_values<I, V>(values: I) -> Vec<SqlValue>
where
    I: IntoIterator<Item = V>,
    V: Into<SqlValue>,
{
    values.into_iter().map(Into::into).collect()
}

// 빈 목록은 항상 거짓
fn in_condition(lhs: &str, values: &[SqlValue]) -> String {
    if values.is_empty() {
        "1=0".to_string()
    } else {
        format!("{} IN ({})", lhs, quote_collection(values))
    }
}

/// 파티션 테이블 하나에 대응하는 모델
pub struct PartitionedModel {
    manager: Arc<PartitionManager>,
    name: String,
    table_name: String,
    strategy: PartitionStrategy,
    partition_key: PartitionKey,
    primary_key: PrimaryKey,
}

impl PartitionedModel {
    /// 기본 키는 관리자의 명명 규칙으로 정한다
    pub fn new(
        manager: Arc<PartitionManager>,
        name: impl Into<String>,
        table_name: impl Into<String>,
        strategy: PartitionStrategy,
        partition_key: impl Into<PartitionKey>,
    ) -> Self {
        let table_name = table_name.into();
        let primary_key = manager.primary_key_for(&table_name);
        Self {
            manager,
            name: name.into(),
            table_name,
            strategy,
            partition_key: partition_key.into(),
            primary_key,
        }
    }

    pub fn with_primary_key(mut self, primary_key: impl Into<PrimaryKey>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    pub fn manager(&self) -> &Arc<PartitionManager> {
        &self.manager
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn strategy(&self) -> PartitionStrategy {
        self.strategy
    }

    pub fn partition_key(&self) -> &PartitionKey {
        &self.partition_key
    }

    pub fn primary_key(&self) -> &PrimaryKey {
        &self.primary_key
    }

    // 캐시 항목의 소유 모델 식별자
    fn cache_key(&self) -> String {
        format!("{}:{}", self.name, self.table_name)
    }

    pub fn query(&self) -> PartitionQuery {
        PartitionQuery::new(self.table_name.clone())
    }

    pub fn partition_key_eq<I, V>(&self, values: I) -> Result<PartitionQuery>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.query().partition_key_eq(&self.partition_key, values)
    }

    pub fn range_partition_key_in<I, J, V, W>(&self, start: I, end: J) -> Result<PartitionQuery>
    where
        I: IntoIterator<Item = V>,
        J: IntoIterator<Item = W>,
        V: Into<SqlValue>,
        W: Into<SqlValue>,
    {
        self.query().partition_key_in_range(&self.partition_key, start, end)
    }

    pub fn list_partition_key_in<I, V>(&self, values: I) -> Result<PartitionQuery>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.query().partition_key_in_list(&self.partition_key, values)
    }

    pub fn hash_partition_key_in<I, V>(&self, values: I) -> Result<PartitionQuery>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.list_partition_key_in(values)
    }

    /// 특정 자식 파티션으로 한정한 쿼리 (같은 자식이면 같은 인스턴스)
    pub async fn in_partition(&self, child_table: &str) -> Result<Arc<PartitionQuery>> {
        self.manager
            .cache()
            .fetch_model(&self.cache_key(), child_table, || async move {
                Ok(Arc::new(self.query().from_table(child_table)))
            })
            .await
    }

    /// 알려진 파티션 목록 (조회 실패 시 빈 목록)
    pub async fn partitions(&self, include_subpartitions: Option<bool>) -> Vec<String> {
        let include_subpartitions =
            include_subpartitions.unwrap_or(self.manager.config().include_subpartitions_in_partition_list);

        let result = self
            .manager
            .cache()
            .fetch_partitions(&self.cache_key(), include_subpartitions, || async move {
                Ok(self
                    .manager
                    .partitions_for_table(&self.table_name, include_subpartitions)
                    .await)
            })
            .await;

        match result {
            Ok(partitions) => partitions,
            Err(e) => {
                warn!("{} 파티션 목록 조회 실패: {}", self.table_name, e);
                Vec::new()
            }
        }
    }

    pub async fn create_range_partition<I, J, V, W>(&self, start: I, end: J, options: PartitionOfOptions) -> Result<String>
    where
        I: IntoIterator<Item = V>,
        J: IntoIterator<Item = W>,
        V: Into<SqlValue>,
        W: Into<SqlValue>,
    {
        let bound = PartitionBound::range_multi(collect_values(start), collect_values(end));
        self.create_partition(bound, options).await
    }

    pub async fn create_list_partition<I, V>(&self, values: I, options: PartitionOfOptions) -> Result<String>
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.create_partition(PartitionBound::list(values), options).await
    }

    pub async fn create_hash_partition(&self, modulus: u32, remainder: u32, options: PartitionOfOptions) -> Result<String> {
        self.create_partition(PartitionBound::hash(modulus, remainder), options)
            .await
    }

    pub async fn create_default_partition(&self, options: PartitionOfOptions) -> Result<String> {
        self.create_partition(PartitionBound::Default, options).await
    }

    async fn create_partition(&self, bound: PartitionBound, mut options: PartitionOfOptions) -> Result<String> {
        options.primary_key = Some(self.primary_key.clone());
        self.manager
            .create_partition_of(&self.table_name, bound, options)
            .await
    }

    /// 첫 번째 파티션(없으면 부모 테이블)이 존재하는지
    pub async fn table_exists(&self) -> Result<bool> {
        let target = self
            .partitions(None)
            .await
            .into_iter()
            .next()
            .unwrap_or_else(|| self.table_name.clone());

        self.manager.connection().data_source_exists(&target).await
    }

    /// 첫 번째 리프 파티션의 기본 키 (파티션이 없으면 모델에 지정된 키)
    pub async fn partition_primary_key(&self) -> Result<PrimaryKey> {
        let partitions = self.partitions(Some(true)).await;
        if partitions.is_empty() {
            return Ok(self.primary_key.clone());
        }

        let introspector = self.manager.introspector();
        for partition in &partitions {
            if !introspector.is_table_partitioned(partition).await? {
                let columns = introspector.primary_key_columns(partition).await?;
                return Ok(PrimaryKey::from(columns));
            }
        }

        Err(PartitionError::NoChildPartitions)
    }
}
