//! Migration tests against in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn migrations_apply_on_fresh_database() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    rolegate_db::run_migrations(&db).await.unwrap();

    let mut result = db
        .query("SELECT VALUE version FROM _migration ORDER BY version ASC")
        .await
        .unwrap();
    let versions: Vec<u32> = result.take(0).unwrap();
    assert_eq!(versions, vec![1]);
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    assert_eq!(rolegate_db::run_migrations(&db).await.unwrap(), vec![1]);
    assert!(rolegate_db::run_migrations(&db).await.unwrap().is_empty());

    let mut result = db.query("SELECT VALUE version FROM _migration").await.unwrap();
    let versions: Vec<u32> = result.take(0).unwrap();
    assert_eq!(versions.len(), 1);
}
