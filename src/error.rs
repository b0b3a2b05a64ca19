// 에러 타입 정의
// 파티션 관리 작업에서 발생하는 모든 오류를 하나의 열거형으로 관리합니다.

use thiserror::Error;

/// 파티션 관리 오류
#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("composite primary key not supported")]
    CompositePrimaryKey,

    #[error("Supported partition types are range, list, hash (got `{0}`)")]
    UnsupportedPartitionType(String),

    #[error("`partition_key` is required when specifying a partition_type")]
    MissingPartitionKey,

    #[error("index name `{name}` is too long - must be {max} bytes or fewer")]
    IndexNameTooLong { name: String, max: usize },

    #[error(
        "`in_threads:` cannot be used within a transaction. If running in a migration, use \
         `disable_ddl_transaction!` and break out this operation into its own migration."
    )]
    ThreadsInTransaction,

    #[error("index `{name}` already exists")]
    IndexAlreadyExists { name: String },

    #[error("in_threads: must be lower than your database connection pool size ({pool_size})")]
    ThreadsExceedPoolSize { in_threads: usize, pool_size: usize },

    #[error("in_threads: requires a connection pool")]
    PoolRequired,

    #[error("number of provided values does not match the number of partition key columns")]
    KeyValueMismatch,

    #[error("No child partitions exist for this model")]
    NoChildPartitions,

    #[error("Partitioning only supported in PostgreSQL >= 10.0")]
    PartitioningUnsupported,

    #[error("{feature} are only available in Postgres 11 or higher")]
    VersionUnsupported { feature: &'static str },

    #[error("index creation failed - an index was marked invalid ({})", names.join(", "))]
    IndexInvalid { names: Vec<String> },

    #[error("query failed: {source} [{sql}]")]
    Query {
        sql: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("index worker failed: {0}")]
    Worker(String),
}

impl PartitionError {
    /// 실행한 SQL과 함께 드라이버 오류를 감싼다
    pub fn query<E>(sql: &str, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        PartitionError::Query {
            sql: sql.to_string(),
            source: source.into(),
        }
    }
}

impl From<serde_yaml::Error> for PartitionError {
    fn from(e: serde_yaml::Error) -> Self {
        PartitionError::Config(e.to_string())
    }
}

impl From<std::io::Error> for PartitionError {
    fn from(e: std::io::Error) -> Self {
        PartitionError::Config(e.to_string())
    }
}

impl From<tokio::task::JoinError> for PartitionError {
    fn from(e: tokio::task::JoinError) -> Self {
        PartitionError::Worker(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PartitionError>;
