// 데이터베이스 관리 모듈
// 데이터베이스 연결, 설정 로드 및 연결 풀을 담당합니다.

pub mod config;
pub mod connection;
pub mod pool;

// 외부로 노출할 항목들
pub use config::{ConnectionConfig, DbConfig};
pub use connection::{Connection, ConnectionPool, PgConnection};
pub use pool::{DatabasePool, PoolStatus};
