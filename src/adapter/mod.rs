// 파티션 DDL 동사 인터페이스
// 마이그레이션/모델 코드가 연결 어댑터에 기대하는 전체 동사 집합입니다.

use async_trait::async_trait;

use crate::ddl::{PartitionBound, PartitionStrategy, SqlValue};
use crate::error::Result;
use crate::index::IndexOptions;
use crate::partition::{PartitionManager, PartitionOfOptions, PartitionedTableOptions, TableLikeOptions};

/// 파티션 관리 어댑터
#[async_trait]
pub trait PartitionAdapter: Send + Sync {
    async fn create_range_partition(&self, table_name: &str, options: PartitionedTableOptions) -> Result<()>;

    async fn create_list_partition(&self, table_name: &str, options: PartitionedTableOptions) -> Result<()>;

    /// PostgreSQL 11 이상
    async fn create_hash_partition(&self, table_name: &str, options: PartitionedTableOptions) -> Result<()>;

    async fn create_range_partition_of(
        &self,
        parent: &str,
        start: Vec<SqlValue>,
        end: Vec<SqlValue>,
        options: PartitionOfOptions,
    ) -> Result<String>;

    async fn create_list_partition_of(
        &self,
        parent: &str,
        values: Vec<SqlValue>,
        options: PartitionOfOptions,
    ) -> Result<String>;

    async fn create_hash_partition_of(
        &self,
        parent: &str,
        modulus: u32,
        remainder: u32,
        options: PartitionOfOptions,
    ) -> Result<String>;

    async fn create_default_partition_of(&self, parent: &str, options: PartitionOfOptions) -> Result<String>;

    async fn create_table_like(&self, source: &str, dest: &str, options: TableLikeOptions) -> Result<()>;

    async fn attach_range_partition(
        &self,
        parent: &str,
        child: &str,
        start: Vec<SqlValue>,
        end: Vec<SqlValue>,
    ) -> Result<()>;

    async fn attach_list_partition(&self, parent: &str, child: &str, values: Vec<SqlValue>) -> Result<()>;

    async fn attach_hash_partition(&self, parent: &str, child: &str, modulus: u32, remainder: u32) -> Result<()>;

    async fn attach_default_partition(&self, parent: &str, child: &str) -> Result<()>;

    async fn detach_partition(&self, parent: &str, child: &str) -> Result<()>;

    async fn add_index_on_all_partitions(&self, table_name: &str, columns: &[&str], options: IndexOptions) -> Result<()>;

    async fn partitions_for_table(&self, table_name: &str, include_subpartitions: bool) -> Vec<String>;

    async fn parent_for_table(&self, table_name: &str, traverse: bool) -> Option<String>;

    async fn table_partitioned(&self, table_name: &str) -> Result<bool>;
}

#[async_trait]
impl PartitionAdapter for PartitionManager {
    async fn create_range_partition(&self, table_name: &str, options: PartitionedTableOptions) -> Result<()> {
        self.create_partitioned_table(table_name, PartitionStrategy::Range, options)
            .await
    }

    async fn create_list_partition(&self, table_name: &str, options: PartitionedTableOptions) -> Result<()> {
        self.create_partitioned_table(table_name, PartitionStrategy::List, options)
            .await
    }

    async fn create_hash_partition(&self, table_name: &str, options: PartitionedTableOptions) -> Result<()> {
        self.create_partitioned_table(table_name, PartitionStrategy::Hash, options)
            .await
    }

    async fn create_range_partition_of(
        &self,
        parent: &str,
        start: Vec<SqlValue>,
        end: Vec<SqlValue>,
        options: PartitionOfOptions,
    ) -> Result<String> {
        self.create_partition_of(parent, PartitionBound::range_multi(start, end), options)
            .await
    }

    async fn create_list_partition_of(
        &self,
        parent: &str,
        values: Vec<SqlValue>,
        options: PartitionOfOptions,
    ) -> Result<String> {
        self.create_partition_of(parent, PartitionBound::List(values), options)
            .await
    }

    async fn create_hash_partition_of(
        &self,
        parent: &str,
        modulus: u32,
        remainder: u32,
        options: PartitionOfOptions,
    ) -> Result<String> {
        self.create_partition_of(parent, PartitionBound::hash(modulus, remainder), options)
            .await
    }

    async fn create_default_partition_of(&self, parent: &str, options: PartitionOfOptions) -> Result<String> {
        self.create_partition_of(parent, PartitionBound::Default, options)
            .await
    }

    async fn create_table_like(&self, source: &str, dest: &str, options: TableLikeOptions) -> Result<()> {
        PartitionManager::create_table_like(self, source, dest, options).await
    }

    async fn attach_range_partition(
        &self,
        parent: &str,
        child: &str,
        start: Vec<SqlValue>,
        end: Vec<SqlValue>,
    ) -> Result<()> {
        self.attach_partition(parent, child, PartitionBound::range_multi(start, end))
            .await
    }

    async fn attach_list_partition(&self, parent: &str, child: &str, values: Vec<SqlValue>) -> Result<()> {
        self.attach_partition(parent, child, PartitionBound::List(values))
            .await
    }

    async fn attach_hash_partition(&self, parent: &str, child: &str, modulus: u32, remainder: u32) -> Result<()> {
        self.attach_partition(parent, child, PartitionBound::hash(modulus, remainder))
            .await
    }

    async fn attach_default_partition(&self, parent: &str, child: &str) -> Result<()> {
        self.attach_partition(parent, child, PartitionBound::Default)
            .await
    }

    async fn detach_partition(&self, parent: &str, child: &str) -> Result<()> {
        PartitionManager::detach_partition(self, parent, child).await
    }

    async fn add_index_on_all_partitions(&self, table_name: &str, columns: &[&str], options: IndexOptions) -> Result<()> {
        PartitionManager::add_index_on_all_partitions(self, table_name, columns, options).await
    }

    async fn partitions_for_table(&self, table_name: &str, include_subpartitions: bool) -> Vec<String> {
        PartitionManager::partitions_for_table(self, table_name, include_subpartitions).await
    }

    async fn parent_for_table(&self, table_name: &str, traverse: bool) -> Option<String> {
        PartitionManager::parent_for_table(self, table_name, traverse).await
    }

    async fn table_partitioned(&self, table_name: &str) -> Result<bool> {
        PartitionManager::table_partitioned(self, table_name).await
    }
}
