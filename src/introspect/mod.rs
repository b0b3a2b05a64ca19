// 파티션 카탈로그 조회 모듈
// pg_inherits / pg_class 를 읽어 부모-자식 관계를 찾습니다. 캐시에는 직접 관여하지 않습니다.

use std::collections::VecDeque;

use log::{debug, warn};

use crate::constants::catalog;
use crate::db::Connection;
use crate::error::Result;

/// 읽기 전용 카탈로그 조회기
pub struct Introspector<'a> {
    conn: &'a dyn Connection,
}

impl<'a> Introspector<'a> {
    pub fn new(conn: &'a dyn Connection) -> Self {
        Self { conn }
    }

    /// 파티션 목록 조회
    ///
    /// `include_subpartitions` 이면 각 자식 바로 뒤에 그 자식의 하위 파티션이 온다
    /// (예: `[C1, G1, C2]`). 루트 자신은 포함하지 않는다. 조회 실패는 빈 목록으로 처리한다.
    pub async fn partitions_for_table(&self, table_name: &str, include_subpartitions: bool) -> Vec<String> {
        match self.collect_partitions(table_name, include_subpartitions).await {
            Ok(partitions) => {
                debug!("{} 파티션 {}개 조회", table_name, partitions.len());
                partitions
            }
            Err(e) => {
                warn!("{} 파티션 조회 실패, 빈 목록으로 처리: {}", table_name, e);
                Vec::new()
            }
        }
    }

    async fn collect_partitions(&self, table_name: &str, include_subpartitions: bool) -> Result<Vec<String>> {
        let direct = self.conn.select_values(&catalog::partitions_of(table_name)).await?;
        if !include_subpartitions {
            return Ok(direct);
        }

        // 앞쪽부터 꺼내면서 하위 파티션을 다시 앞쪽에 끼워 넣어 전위 순회 순서를 유지
        let mut pending: VecDeque<String> = direct.into();
        let mut result = Vec::new();

        while let Some(name) = pending.pop_front() {
            let children = self.conn.select_values(&catalog::partitions_of(&name)).await?;
            for child in children.into_iter().rev() {
                pending.push_front(child);
            }
            result.push(name);
        }

        Ok(result)
    }

    /// 부모 테이블 조회 (`traverse` 이면 최상위 조상까지 따라 올라감)
    pub async fn parent_for_table(&self, table_name: &str, traverse: bool) -> Option<String> {
        let mut current = self.direct_parent(table_name).await?;

        if traverse {
            while let Some(parent) = self.direct_parent(&current).await {
                current = parent;
            }
        }

        Some(current)
    }

    async fn direct_parent(&self, table_name: &str) -> Option<String> {
        match self.conn.select_values(&catalog::parent_of(table_name)).await {
            Ok(values) => values.into_iter().next(),
            Err(e) => {
                warn!("{} 부모 테이블 조회 실패: {}", table_name, e);
                None
            }
        }
    }

    /// relkind = 'p' 여부
    pub async fn is_table_partitioned(&self, table_name: &str) -> Result<bool> {
        let values = self.conn.select_values(&catalog::partitioned_relkind(table_name)).await?;
        Ok(!values.is_empty())
    }

    pub async fn primary_key_columns(&self, table_name: &str) -> Result<Vec<String>> {
        self.conn.select_values(&catalog::primary_key_columns(table_name)).await
    }

    pub async fn has_primary_key(&self, table_name: &str) -> Result<bool> {
        Ok(!self.primary_key_columns(table_name).await?.is_empty())
    }

    pub async fn index_exists(&self, index_name: &str) -> Result<bool> {
        let values = self.conn.select_values(&catalog::index_exists(index_name)).await?;
        Ok(!values.is_empty())
    }

    /// 주어진 이름 중 indisvalid = false 인 인덱스
    pub async fn invalid_indexes(&self, index_names: &[String]) -> Result<Vec<String>> {
        if index_names.is_empty() {
            return Ok(Vec::new());
        }
        self.conn.select_values(&catalog::invalid_indexes(index_names)).await
    }

    /// 파티션 테이블의 모든 자식 (schema.table 형식)
    pub async fn partition_tables_for_dump(&self) -> Result<Vec<String>> {
        self.conn.select_values(catalog::PARTITION_TABLES_FOR_DUMP).await
    }
}
