// PostgreSQL 선언적 파티셔닝 관리 라이브러리
// 파티션 테이블 생성/연결/분리, 파티션 트리 전체 인덱스 생성, 파티션 메타데이터 캐싱을 제공합니다.

pub mod adapter;
pub mod cache;
pub mod config;
pub mod constants;
pub mod db;
pub mod ddl;
pub mod error;
pub mod index;
pub mod introspect;
pub mod model;
pub mod partition;

pub use adapter::PartitionAdapter;
pub use cache::PartitionCache;
pub use config::settings::Settings;
pub use config::PartitionConfig;
pub use db::{Connection, ConnectionPool, DatabasePool, DbConfig, PgConnection};
pub use ddl::{
    IdType, IndexSpec, PartitionBound, PartitionKey, PartitionStrategy, PrimaryKey, SqlValue,
    TableDefinition,
};
pub use error::{PartitionError, Result};
pub use index::{IndexAlgorithm, IndexOptions};
pub use introspect::Introspector;
pub use model::naming::{DefaultConvention, PrimaryKeyConvention, PrimaryKeyPrefix};
pub use model::{PartitionQuery, PartitionedModel};
pub use partition::{PartitionManager, PartitionOfOptions, PartitionedTableOptions, TableLikeOptions};
