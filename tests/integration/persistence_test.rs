//! Integration tests for the persistence layer.

use athena_glance::persistence::{parameter_sets, sql_log, StateDb, StatementOutcome};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

async fn create_test_db() -> (StateDb, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test_state.db");
    let db = StateDb::open(&path).await.unwrap();
    (db, dir)
}

#[tokio::test]
async fn test_state_db_creation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.db");

    let db = StateDb::open(&path).await.unwrap();
    assert!(path.exists());
    db.close().await;
}

#[tokio::test]
async fn test_sql_log_lifecycle() {
    let (db, _dir) = create_test_db().await;

    sql_log::record_statement(
        db.pool(),
        "default",
        "select 1",
        StatementOutcome::Succeeded,
        Some(1),
        None,
    )
    .await
    .unwrap();
    let cancelled = sql_log::record_statement(
        db.pool(),
        "prod",
        "select * from big",
        StatementOutcome::Cancelled,
        None,
        None,
    )
    .await
    .unwrap();

    let entries = sql_log::list_statements(db.pool(), None).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].connection_name, "prod");
    assert_eq!(entries[0].outcome, StatementOutcome::Cancelled);
    assert!(!entries[0].created_at.is_empty());

    assert!(sql_log::delete_statement(db.pool(), cancelled).await.unwrap());
    assert_eq!(sql_log::count_statements(db.pool()).await.unwrap(), 1);

    assert_eq!(sql_log::clear_statements(db.pool()).await.unwrap(), 1);
    assert!(sql_log::list_statements(db.pool(), None).await.unwrap().is_empty());

    db.close().await;
}

#[tokio::test]
async fn test_sql_log_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.db");

    let db = StateDb::open(&path).await.unwrap();
    sql_log::record_statement(
        db.pool(),
        "default",
        "selec 1",
        StatementOutcome::Failed,
        None,
        Some("SYNTAX_ERROR: line 1:1: mismatched input 'selec'"),
    )
    .await
    .unwrap();
    parameter_sets::add_parameter_set(db.pool(), &["'a'".to_string()])
        .await
        .unwrap();
    db.close().await;

    let db = StateDb::open(&path).await.unwrap();
    let entries = sql_log::list_statements(db.pool(), Some(10)).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0].error_message.as_deref(),
        Some("SYNTAX_ERROR: line 1:1: mismatched input 'selec'")
    );
    let sets = parameter_sets::list_parameter_sets(db.pool()).await.unwrap();
    assert_eq!(sets[0].items, vec!["'a'".to_string()]);
    db.close().await;
}

#[tokio::test]
async fn test_recent_parameter_sets_reused_across_runs() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.db");
    let values = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    let db = StateDb::open(&path).await.unwrap();
    parameter_sets::add_parameter_set(db.pool(), &values(&["'2024-01-01'", "10"]))
        .await
        .unwrap();
    parameter_sets::add_parameter_set(db.pool(), &values(&["'2024-02-01'", "5"]))
        .await
        .unwrap();
    db.close().await;

    let db = StateDb::open(&path).await.unwrap();
    let previous = parameter_sets::recent_parameter_set(db.pool(), 2)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(previous.label(), "'2024-01-01',10");

    // Running with a reused set makes it the newest again
    parameter_sets::add_parameter_set(db.pool(), &previous.items)
        .await
        .unwrap();
    let sets = parameter_sets::list_parameter_sets(db.pool()).await.unwrap();
    assert_eq!(sets.len(), 2);
    assert_eq!(sets[0].items, previous.items);
    assert!(parameter_sets::recent_parameter_set(db.pool(), 3)
        .await
        .unwrap()
        .is_none());
    db.close().await;
}

#[tokio::test]
async fn test_sql_log_is_bounded() {
    let (db, _dir) = create_test_db().await;

    for i in 0..1005 {
        sql_log::record_statement(
            db.pool(),
            "default",
            &format!("select {i}"),
            StatementOutcome::Succeeded,
            Some(1),
            None,
        )
        .await
        .unwrap();
    }

    assert_eq!(sql_log::count_statements(db.pool()).await.unwrap(), 1000);
    let newest = sql_log::list_statements(db.pool(), Some(1)).await.unwrap();
    assert_eq!(newest[0].statement, "select 1004");

    db.close().await;
}

#[tokio::test]
async fn test_corrupt_database_is_recovered() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.db");
    std::fs::write(&path, vec![b'x'; 4096]).unwrap();

    let db = StateDb::open(&path).await.unwrap();
    assert!(path.with_extension("db.bak").exists());
    assert_eq!(sql_log::count_statements(db.pool()).await.unwrap(), 0);
    db.close().await;
}
