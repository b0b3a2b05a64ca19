mod common;

use common::{MockDb, PG10, PG14};
use pg_partition_kit::ddl::hashed_index_name;
use pg_partition_kit::{IndexOptions, PartitionAdapter, PartitionError};

const ROOT: &str = "index_orders_on_region";

// orders -> [orders_a, orders_b -> [orders_b1]]
fn tree(version: i32) -> MockDb {
    let db = MockDb::new(version);
    db.partitioned_table("orders");
    db.table("orders_a");
    db.partitioned_table("orders_b");
    db.table("orders_b1");
    db.attach("orders", "orders_a");
    db.attach("orders", "orders_b");
    db.attach("orders_b", "orders_b1");
    db
}

fn index_statements(db: &MockDb) -> Vec<String> {
    db.statements()
        .into_iter()
        .filter(|sql| (sql.starts_with("CREATE ") && sql.contains(" INDEX ")) || sql.starts_with("ALTER INDEX"))
        .collect()
}

#[tokio::test]
async fn parent_index_is_registered_before_children() {
    let db = tree(PG14);
    let manager = db.manager();

    manager
        .add_index_on_all_partitions("orders", &["region"], IndexOptions::new())
        .await
        .unwrap();

    let a = hashed_index_name(ROOT, "orders_a");
    let b = hashed_index_name(ROOT, "orders_b");
    let b1 = hashed_index_name(ROOT, "orders_b1");
    assert!(a.starts_with("index_orders_on_region_"));
    assert_eq!(a.len(), ROOT.len() + 8);

    assert_eq!(
        index_statements(&db),
        vec![
            format!("CREATE INDEX \"{}\" ON ONLY \"orders\" (\"region\")", ROOT),
            format!("CREATE INDEX \"{}\" ON \"orders_a\" (\"region\")", a),
            format!("ALTER INDEX \"{}\" ATTACH PARTITION \"{}\"", ROOT, a),
            format!("CREATE INDEX \"{}\" ON ONLY \"orders_b\" (\"region\")", b),
            format!("CREATE INDEX \"{}\" ON \"orders_b1\" (\"region\")", b1),
            format!("ALTER INDEX \"{}\" ATTACH PARTITION \"{}\"", b, b1),
            format!("ALTER INDEX \"{}\" ATTACH PARTITION \"{}\"", ROOT, b),
        ]
    );

    let catalog = db.catalog();
    assert_eq!(catalog.index(ROOT).unwrap().attached, vec![a, b.clone()]);
    assert_eq!(catalog.index(&b).unwrap().attached, vec![b1]);
}

#[tokio::test]
async fn concurrently_applies_to_leaf_tables_only() {
    let db = tree(PG14);
    let manager = db.manager();

    manager
        .add_index_on_all_partitions("orders", &["region"], IndexOptions::new().concurrently())
        .await
        .unwrap();

    let catalog = db.catalog();
    assert!(!catalog.index(ROOT).unwrap().concurrently);
    assert!(!catalog.index(&hashed_index_name(ROOT, "orders_b")).unwrap().concurrently);
    assert!(catalog.index(&hashed_index_name(ROOT, "orders_a")).unwrap().concurrently);
    assert!(catalog.index(&hashed_index_name(ROOT, "orders_b1")).unwrap().concurrently);
}

#[tokio::test]
async fn plain_table_gets_a_single_index() {
    let db = MockDb::new(PG14);
    db.table("plain");
    let manager = db.manager();

    manager
        .add_index_on_all_partitions(
            "plain",
            &["id"],
            IndexOptions::new().unique().using("BTREE").where_clause("id > 0"),
        )
        .await
        .unwrap();

    assert_eq!(
        index_statements(&db),
        vec!["CREATE UNIQUE INDEX \"index_plain_on_id\" ON \"plain\" USING btree (\"id\") WHERE id > 0"]
    );
    assert!(db.catalog().index("index_plain_on_id").unwrap().unique);
}

#[tokio::test]
async fn unattached_parent_index_is_invalid_and_rolled_back() {
    let db = tree(PG14);
    db.skip("ALTER INDEX");
    let manager = db.manager();

    let err = manager
        .add_index_on_all_partitions("orders", &["region"], IndexOptions::new())
        .await
        .unwrap_err();

    let b = hashed_index_name(ROOT, "orders_b");
    match err {
        PartitionError::IndexInvalid { names } => assert_eq!(names, vec![ROOT.to_string(), b.clone()]),
        other => panic!("unexpected error: {}", other),
    }
    assert!(db.index_names().is_empty());

    let drops = db.statements_starting_with("DROP INDEX IF EXISTS");
    assert_eq!(drops.len(), 4);
    assert_eq!(drops[0], format!("DROP INDEX IF EXISTS \"{}\"", ROOT));
}

#[tokio::test]
async fn failed_child_build_drops_everything() {
    let db = tree(PG14);
    db.fail_on("ON \"orders_b1\"");
    let manager = db.manager();

    let err = manager
        .add_index_on_all_partitions("orders", &["region"], IndexOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PartitionError::Query { .. }));
    assert!(err.to_string().contains("simulated failure"));
    assert!(db.index_names().is_empty());

    // 만들어지지 않은 일반 인덱스는 롤백 대상이 아니다
    assert!(!db
        .statements()
        .contains(&format!("DROP INDEX IF EXISTS \"{}\"", hashed_index_name(ROOT, "orders_b1"))));
}

#[tokio::test]
async fn failed_concurrent_leaf_build_is_dropped() {
    let db = tree(PG14);
    db.fail_on("ON \"orders_b1\"");
    let manager = db.manager();

    manager
        .add_index_on_all_partitions("orders", &["region"], IndexOptions::new().concurrently())
        .await
        .unwrap_err();

    assert!(db.index_names().is_empty());
    assert!(db
        .statements()
        .contains(&format!("DROP INDEX IF EXISTS \"{}\"", hashed_index_name(ROOT, "orders_b1"))));
}

#[tokio::test]
async fn existing_index_with_the_same_name_is_left_alone() {
    let db = tree(PG14);
    db.run(&format!("CREATE INDEX \"{}\" ON ONLY \"orders\" (\"region\")", ROOT));
    db.run("CREATE INDEX \"user_orders_a_region\" ON \"orders_a\" (\"region\")");
    db.run(&format!("ALTER INDEX \"{}\" ATTACH PARTITION \"user_orders_a_region\"", ROOT));
    let manager = db.manager();

    let err = manager
        .add_index_on_all_partitions("orders", &["region"], IndexOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PartitionError::IndexAlreadyExists { ref name } if name == ROOT));
    assert_eq!(err.to_string(), format!("index `{}` already exists", ROOT));
    assert!(index_statements(&db).is_empty());
    assert!(db.statements_starting_with("DROP INDEX").is_empty());

    assert_eq!(db.index_names(), vec![ROOT.to_string(), "user_orders_a_region".to_string()]);
    assert_eq!(db.catalog().index(ROOT).unwrap().attached, vec!["user_orders_a_region"]);
}

#[tokio::test]
async fn child_name_collision_keeps_the_existing_index() {
    let db = tree(PG14);
    db.table("other");
    let b = hashed_index_name(ROOT, "orders_b");
    db.run(&format!("CREATE INDEX \"{}\" ON \"other\" (\"region\")", b));
    let manager = db.manager();

    let err = manager
        .add_index_on_all_partitions("orders", &["region"], IndexOptions::new())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("already exists"));
    assert!(!db.statements().contains(&format!("DROP INDEX IF EXISTS \"{}\"", b)));
    assert_eq!(db.index_names(), vec![b.clone()]);
    assert_eq!(db.catalog().index(&b).unwrap().table, "other");
}

#[tokio::test]
async fn invalid_leaf_index_is_reported() {
    let db = tree(PG14);
    let a = hashed_index_name(ROOT, "orders_a");
    db.force_invalid(&a);
    let manager = db.manager();

    let err = manager
        .add_index_on_all_partitions("orders", &["region"], IndexOptions::new())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        format!("index creation failed - an index was marked invalid ({})", a)
    );
    assert!(db.index_names().is_empty());
}

#[tokio::test]
async fn index_name_length_is_checked_first() {
    let table = "a_rather_long_partitioned_table_name_for_events";
    let db = MockDb::new(PG14);
    db.partitioned_table(table);
    let manager = db.manager();

    let err = manager
        .add_index_on_all_partitions(table, &["region"], IndexOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PartitionError::IndexNameTooLong { max: 55, .. }));
    assert!(index_statements(&db).is_empty());

    manager
        .add_index_on_all_partitions(table, &["region"], IndexOptions::new().name("index_events_region"))
        .await
        .unwrap();
    assert_eq!(db.index_names(), vec!["index_events_region"]);
}

#[tokio::test]
async fn worker_options_are_validated() {
    let db = tree(PG14);

    let manager = db.manager();
    manager.connection().begin().await.unwrap();
    let err = manager
        .add_index_on_all_partitions("orders", &["region"], IndexOptions::new().in_threads(1))
        .await
        .unwrap_err();
    assert!(matches!(err, PartitionError::ThreadsInTransaction));
    manager.connection().rollback().await.unwrap();

    let err = manager
        .add_index_on_all_partitions("orders", &["region"], IndexOptions::new().in_threads(1))
        .await
        .unwrap_err();
    assert!(matches!(err, PartitionError::PoolRequired));

    let manager = db.manager().with_pool(db.pool(2));
    let err = manager
        .add_index_on_all_partitions("orders", &["region"], IndexOptions::new().in_threads(2))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "in_threads: must be lower than your database connection pool size (2)"
    );

    assert!(index_statements(&db).is_empty());
}

#[tokio::test]
async fn threaded_build_uses_one_connection_per_partition() {
    let db = tree(PG14);
    for name in ["orders_c", "orders_d"] {
        db.table(name);
        db.attach("orders", name);
    }
    let pool = db.pool(5);
    let manager = db.manager().with_pool(pool.clone());

    manager
        .add_index_on_all_partitions("orders", &["region"], IndexOptions::new().in_threads(2))
        .await
        .unwrap();

    assert_eq!(pool.checkouts(), 4);
    assert_eq!(db.index_names().len(), 6);
    let root = db.catalog().index(ROOT).cloned().unwrap();
    assert_eq!(root.attached.len(), 4);
}

#[tokio::test]
async fn threaded_failure_waits_for_workers_before_rollback() {
    let db = tree(PG14);
    db.table("orders_c");
    db.attach("orders", "orders_c");
    db.fail_on("ON \"orders_c\"");
    let pool = db.pool(4);
    let manager = db.manager().with_pool(pool.clone());

    let err = manager
        .add_index_on_all_partitions("orders", &["region"], IndexOptions::new().in_threads(0))
        .await
        .unwrap_err();

    assert!(matches!(err, PartitionError::Query { .. }));
    assert_eq!(pool.checkouts(), 3);
    assert!(db.index_names().is_empty());
}

#[tokio::test]
async fn postgres_10_indexes_leaf_tables_only() {
    let db = tree(PG10);
    let manager = db.manager();

    PartitionAdapter::add_index_on_all_partitions(&manager, "orders", &["region"], IndexOptions::new())
        .await
        .unwrap();

    assert!(db.statements_starting_with("ALTER INDEX").is_empty());
    assert!(index_statements(&db).iter().all(|sql| !sql.contains(" ON ONLY ")));
    assert_eq!(
        db.index_names(),
        vec![
            hashed_index_name(ROOT, "orders_a"),
            hashed_index_name(ROOT, "orders_b1"),
        ]
    );
}

#[tokio::test]
async fn concurrent_leaf_name_collision_keeps_the_existing_index() {
    let db = tree(PG14);
    db.table("other");
    let a = hashed_index_name(ROOT, "orders_a");
    db.run(&format!("CREATE INDEX \"{}\" ON \"other\" (\"region\")", a));
    let manager = db.manager();

    let err = manager
        .add_index_on_all_partitions("orders", &["region"], IndexOptions::new().concurrently())
        .await
        .unwrap_err();

    assert!(matches!(err, PartitionError::IndexAlreadyExists { ref name } if *name == a));
    assert!(!db.statements().contains(&format!("DROP INDEX IF EXISTS \"{}\"", a)));
    assert_eq!(db.index_names(), vec![a.clone()]);
    assert_eq!(db.catalog().index(&a).unwrap().table, "other");
}
