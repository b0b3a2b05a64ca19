// 테스트용 가상 PostgreSQL
// 실행된 DDL 을 해석해 메모리 카탈로그에 반영하고, 카탈로그 조회 쿼리에 그 상태로 답합니다.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use pg_partition_kit::constants::catalog;
use pg_partition_kit::{Connection, ConnectionPool, PartitionConfig, PartitionError, PartitionManager, Result};

pub const PG10: i32 = 100_015;
pub const PG11: i32 = 110_010;
pub const PG12: i32 = 120_008;
pub const PG14: i32 = 140_005;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Clone, Debug)]
pub struct MockIndex {
    pub name: String,
    pub table: String,
    pub only: bool,
    pub unique: bool,
    pub concurrently: bool,
    pub attached: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub tables: Vec<String>,
    pub columns: HashMap<String, Vec<String>>,
    pub partitioned: HashSet<String>,
    pub inherits: Vec<(String, String)>,
    pub primary_keys: HashMap<String, Vec<String>>,
    pub indexes: Vec<MockIndex>,
}

impl Catalog {
    fn exists(&self, table: &str) -> bool {
        self.tables.iter().any(|t| t == table)
    }

    pub fn children(&self, parent: &str) -> Vec<String> {
        self.inherits
            .iter()
            .filter(|(p, _)| p == parent)
            .map(|(_, c)| c.clone())
            .collect()
    }

    pub fn parent(&self, child: &str) -> Option<String> {
        self.inherits.iter().find(|(_, c)| c == child).map(|(p, _)| p.clone())
    }

    pub fn index(&self, name: &str) -> Option<&MockIndex> {
        self.indexes.iter().find(|i| i.name == name)
    }

    fn drop_index(&mut self, name: &str) {
        let Some(position) = self.indexes.iter().position(|i| i.name == name) else {
            return;
        };
        let removed = self.indexes.remove(position);
        for child in removed.attached {
            self.drop_index(&child);
        }
        for index in &mut self.indexes {
            index.attached.retain(|c| c != name);
        }
    }
}

pub struct MockState {
    pub version: i32,
    pub pgcrypto: bool,
    pub catalog: Catalog,
    pub fail_on: Vec<String>,
    pub skip: Vec<String>,
    pub forced_invalid: Vec<String>,
    pub log: Vec<String>,
}

impl MockState {
    fn apply(&mut self, sql: &str) -> std::result::Result<(), String> {
        let ids = quoted_identifiers(sql);
        let ident = |i: usize| ids.get(i).cloned().ok_or_else(|| format!("cannot parse statement: {}", sql));
        let catalog = &mut self.catalog;

        if sql.starts_with("CREATE TABLE") {
            let name = ident(0)?;
            if catalog.exists(&name) {
                return Err(format!("relation \"{}\" already exists", name));
            }

            let (columns, primary_key) = if sql.contains("(LIKE ") {
                let source = ident(1)?;
                if !catalog.exists(&source) {
                    return Err(format!("relation \"{}\" does not exist", source));
                }
                let columns = catalog.columns.get(&source).cloned().unwrap_or_default();
                let primary_key = if sql.contains("EXCLUDING INDEXES") {
                    None
                } else {
                    catalog.primary_keys.get(&source).cloned()
                };
                (columns, primary_key)
            } else {
                let columns = sql
                    .lines()
                    .filter(|line| line.starts_with("  \""))
                    .filter_map(|line| quoted_identifiers(line).into_iter().next())
                    .collect();
                (columns, None)
            };

            catalog.tables.push(name.clone());
            catalog.columns.insert(name.clone(), columns);
            if let Some(primary_key) = primary_key {
                catalog.primary_keys.insert(name.clone(), primary_key);
            }
            if sql.contains(" PARTITION BY ") {
                catalog.partitioned.insert(name);
            }
            return Ok(());
        }

        if sql.starts_with("ALTER TABLE") {
            let table = ident(0)?;
            if !catalog.exists(&table) {
                return Err(format!("relation \"{}\" does not exist", table));
            }

            if sql.contains("ADD PRIMARY KEY") {
                if catalog.primary_keys.contains_key(&table) {
                    return Err(format!("multiple primary keys for table \"{}\" are not allowed", table));
                }
                catalog.primary_keys.insert(table, ids[1..].to_vec());
                return Ok(());
            }

            let child = ident(1)?;
            if sql.contains("ATTACH PARTITION") {
                if !catalog.exists(&child) {
                    return Err(format!("relation \"{}\" does not exist", child));
                }
                if catalog.parent(&child).is_some() {
                    return Err(format!("\"{}\" is already a partition", child));
                }
                catalog.inherits.push((table, child));
                return Ok(());
            }
            if sql.contains("DETACH PARTITION") {
                let before = catalog.inherits.len();
                catalog.inherits.retain(|(p, c)| !(p == &table && c == &child));
                if catalog.inherits.len() == before {
                    return Err(format!("relation \"{}\" is not a partition of \"{}\"", child, table));
                }
                return Ok(());
            }
        }

        if sql.starts_with("CREATE ") && sql.contains(" INDEX ") {
            let name = ident(0)?;
            let table = ident(1)?;
            if catalog.index(&name).is_some() {
                return Err(format!("relation \"{}\" already exists", name));
            }
            if !catalog.exists(&table) {
                return Err(format!("relation \"{}\" does not exist", table));
            }
            catalog.indexes.push(MockIndex {
                name,
                table,
                only: sql.contains(" ON ONLY "),
                unique: sql.contains("UNIQUE"),
                concurrently: sql.contains("CONCURRENTLY"),
                attached: Vec::new(),
            });
            return Ok(());
        }

        if sql.starts_with("ALTER INDEX") && sql.contains("ATTACH PARTITION") {
            let parent = ident(0)?;
            let child = ident(1)?;
            if catalog.index(&child).is_none() {
                return Err(format!("index \"{}\" does not exist", child));
            }
            let Some(parent_index) = catalog.indexes.iter_mut().find(|i| i.name == parent) else {
                return Err(format!("index \"{}\" does not exist", parent));
            };
            parent_index.attached.push(child);
            return Ok(());
        }

        if sql.starts_with("DROP INDEX IF EXISTS") {
            let name = ident(0)?;
            catalog.drop_index(&name);
            return Ok(());
        }

        Ok(())
    }

    fn answer(&self, sql: &str) -> Vec<String> {
        let catalog = &self.catalog;

        if sql == catalog::SERVER_VERSION_NUM {
            return vec![self.version.to_string()];
        }
        if sql == catalog::PGCRYPTO_INSTALLED {
            return if self.pgcrypto { vec!["pgcrypto".to_string()] } else { Vec::new() };
        }
        if sql == catalog::PARTITION_TABLES_FOR_DUMP {
            return catalog
                .inherits
                .iter()
                .filter(|(p, _)| catalog.partitioned.contains(p))
                .map(|(_, c)| format!("public.{}", c))
                .collect();
        }

        let literals = quoted_literals(sql);
        if !literals.is_empty() && sql == catalog::invalid_indexes(&literals) {
            return literals
                .into_iter()
                .filter(|name| self.is_invalid(name))
                .collect();
        }

        let Some(name) = literals.first() else {
            return Vec::new();
        };

        if sql == catalog::partitions_of(name) {
            return catalog.children(name);
        }
        if sql == catalog::parent_of(name) {
            return catalog.parent(name).into_iter().collect();
        }
        if sql == catalog::partitioned_relkind(name) {
            return if catalog.partitioned.contains(name) { vec!["p".to_string()] } else { Vec::new() };
        }
        if sql == catalog::table_exists(name) {
            return if catalog.exists(name) { vec![name.clone()] } else { Vec::new() };
        }
        if sql == catalog::index_exists(name) {
            return catalog.index(name).map(|i| i.name.clone()).into_iter().collect();
        }
        if sql == catalog::primary_key_columns(name) {
            return catalog.primary_keys.get(name).cloned().unwrap_or_default();
        }

        Vec::new()
    }

    // ON ONLY 인덱스는 테이블의 모든 파티션 인덱스가 연결되어야 유효
    fn is_invalid(&self, name: &str) -> bool {
        if self.forced_invalid.iter().any(|n| n == name) {
            return true;
        }
        match self.catalog.index(name) {
            Some(index) if index.only => index.attached.len() < self.catalog.children(&index.table).len(),
            _ => false,
        }
    }

    fn check_failure(&self, sql: &str) -> Option<String> {
        self.fail_on
            .iter()
            .find(|pattern| sql.contains(pattern.as_str()))
            .map(|pattern| format!("simulated failure ({})", pattern))
    }
}

/// 여러 연결이 공유하는 가상 데이터베이스
#[derive(Clone)]
pub struct MockDb {
    state: Arc<Mutex<MockState>>,
}

impl MockDb {
    pub fn new(version: i32) -> Self {
        init_logging();
        Self {
            state: Arc::new(Mutex::new(MockState {
                version,
                pgcrypto: false,
                catalog: Catalog::default(),
                fail_on: Vec::new(),
                skip: Vec::new(),
                forced_invalid: Vec::new(),
                log: Vec::new(),
            })),
        }
    }

    pub fn connection(&self) -> Arc<dyn Connection> {
        Arc::new(MockConnection::new(Arc::clone(&self.state)))
    }

    pub fn pool(&self, size: usize) -> Arc<MockPool> {
        Arc::new(MockPool {
            state: Arc::clone(&self.state),
            size,
            checkouts: AtomicUsize::new(0),
        })
    }

    pub fn manager(&self) -> PartitionManager {
        self.manager_with(PartitionConfig::default())
    }

    pub fn manager_with(&self, config: PartitionConfig) -> PartitionManager {
        PartitionManager::new(self.connection(), config)
    }

    pub fn with_state<T>(&self, f: impl FnOnce(&mut MockState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn set_pgcrypto(&self, installed: bool) {
        self.with_state(|s| s.pgcrypto = installed);
    }

    pub fn fail_on(&self, pattern: &str) {
        self.with_state(|s| s.fail_on.push(pattern.to_string()));
    }

    /// 기록만 하고 효과는 반영하지 않을 문장
    pub fn skip(&self, pattern: &str) {
        self.with_state(|s| s.skip.push(pattern.to_string()));
    }

    pub fn force_invalid(&self, index_name: &str) {
        self.with_state(|s| s.forced_invalid.push(index_name.to_string()));
    }

    pub fn run(&self, sql: &str) {
        self.with_state(|s| s.apply(sql)).unwrap();
    }

    pub fn table(&self, name: &str) {
        self.run(&format!("CREATE TABLE \"{}\" (\n  \"id\" bigint\n)", name));
    }

    pub fn partitioned_table(&self, name: &str) {
        self.run(&format!("CREATE TABLE \"{}\" (\n  \"id\" bigint\n) PARTITION BY LIST (\"id\")", name));
    }

    pub fn attach(&self, parent: &str, child: &str) {
        self.run(&format!("ALTER TABLE \"{}\" ATTACH PARTITION \"{}\" DEFAULT", parent, child));
    }

    pub fn statements(&self) -> Vec<String> {
        self.with_state(|s| s.log.clone())
    }

    pub fn clear_log(&self) {
        self.with_state(|s| s.log.clear());
    }

    pub fn statements_starting_with(&self, prefix: &str) -> Vec<String> {
        self.statements()
            .into_iter()
            .filter(|sql| sql.starts_with(prefix))
            .collect()
    }

    pub fn catalog(&self) -> Catalog {
        self.with_state(|s| s.catalog.clone())
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.catalog().exists(name)
    }

    pub fn is_partitioned(&self, name: &str) -> bool {
        self.catalog().partitioned.contains(name)
    }

    pub fn primary_key(&self, name: &str) -> Option<Vec<String>> {
        self.catalog().primary_keys.get(name).cloned()
    }

    pub fn columns(&self, name: &str) -> Vec<String> {
        self.catalog().columns.get(name).cloned().unwrap_or_default()
    }

    pub fn index_names(&self) -> Vec<String> {
        self.catalog().indexes.into_iter().map(|i| i.name).collect()
    }
}

pub struct MockConnection {
    state: Arc<Mutex<MockState>>,
    depth: AtomicUsize,
    snapshot: Mutex<Option<Catalog>>,
}

impl MockConnection {
    fn new(state: Arc<Mutex<MockState>>) -> Self {
        Self {
            state,
            depth: AtomicUsize::new(0),
            snapshot: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn execute(&self, sql: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.log.push(sql.to_string());

        if let Some(failure) = state.check_failure(sql) {
            return Err(PartitionError::query(sql, failure));
        }
        if state.skip.iter().any(|pattern| sql.contains(pattern.as_str())) {
            return Ok(());
        }

        state.apply(sql).map_err(|e| PartitionError::query(sql, e))
    }

    async fn select_values(&self, sql: &str) -> Result<Vec<String>> {
        let mut state = self.state.lock().unwrap();
        state.log.push(sql.to_string());

        if let Some(failure) = state.check_failure(sql) {
            return Err(PartitionError::query(sql, failure));
        }

        Ok(state.answer(sql))
    }

    async fn begin(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.log.push("BEGIN".to_string());
        if self.depth.fetch_add(1, Ordering::SeqCst) == 0 {
            *self.snapshot.lock().unwrap() = Some(state.catalog.clone());
        }
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.log.push("COMMIT".to_string());
        if self.depth.fetch_sub(1, Ordering::SeqCst) == 1 {
            *self.snapshot.lock().unwrap() = None;
        }
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.log.push("ROLLBACK".to_string());
        if self.depth.fetch_sub(1, Ordering::SeqCst) == 1 {
            if let Some(catalog) = self.snapshot.lock().unwrap().take() {
                state.catalog = catalog;
            }
        }
        Ok(())
    }

    fn transaction_open(&self) -> bool {
        self.depth.load(Ordering::SeqCst) > 0
    }
}

pub struct MockPool {
    state: Arc<Mutex<MockState>>,
    size: usize,
    checkouts: AtomicUsize,
}

impl MockPool {
    pub fn checkouts(&self) -> usize {
        self.checkouts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionPool for MockPool {
    fn size(&self) -> usize {
        self.size
    }

    async fn checkout(&self) -> Result<Box<dyn Connection>> {
        self.checkouts.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConnection::new(Arc::clone(&self.state))))
    }
}

fn quoted(sql: &str, quote: char) -> Vec<String> {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == quote {
            let mut value = String::new();
            i += 1;
            while i < chars.len() {
                if chars[i] == quote {
                    if i + 1 < chars.len() && chars[i + 1] == quote {
                        value.push(quote);
                        i += 2;
                        continue;
                    }
                    break;
                }
                value.push(chars[i]);
                i += 1;
            }
            out.push(value);
        }
        i += 1;
    }

    out
}

pub fn quoted_identifiers(sql: &str) -> Vec<String> {
    quoted(sql, '"')
}

pub fn quoted_literals(sql: &str) -> Vec<String> {
    quoted(sql, '\'')
}
