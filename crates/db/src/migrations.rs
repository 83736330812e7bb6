//! Runner for the migrations modules contribute through `Module::migrations`.

use bookstore_kernel::Migration;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

const CREATE_LEDGER: &str = r#"
    CREATE TABLE IF NOT EXISTS _module_migrations (
        module     TEXT NOT NULL,
        id         TEXT NOT NULL,
        applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (module, id)
    )
"#;

pub(crate) async fn apply(
    pool: &SqlitePool,
    migrations: &[(String, Migration)],
) -> DbResult<usize> {
    info!(total = migrations.len(), "checking for pending migrations");

    sqlx::query(CREATE_LEDGER).execute(pool).await?;

    let mut applied = 0;
    for (module, migration) in migrations {
        let already: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM _module_migrations WHERE module = ? AND id = ?")
                .bind(module)
                .bind(migration.id)
                .fetch_optional(pool)
                .await?;

        if already.is_some() {
            debug!(module = %module, migration = migration.id, "migration already applied");
            continue;
        }

        apply_one(pool, module, migration)
            .await
            .map_err(|e| DbError::MigrationFailed {
                module: module.clone(),
                id: migration.id.to_string(),
                message: e.to_string(),
            })?;

        info!(module = %module, migration = migration.id, "migration applied");
        applied += 1;
    }

    info!(applied, "all migrations applied");
    Ok(applied)
}

/// Schema change and ledger entry commit together.
async fn apply_one(
    pool: &SqlitePool,
    module: &str,
    migration: &Migration,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::raw_sql(migration.up).execute(&mut *tx).await?;
    sqlx::query("INSERT INTO _module_migrations (module, id) VALUES (?, ?)")
        .bind(module)
        .bind(migration.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await
}

pub(crate) async fn applied(pool: &SqlitePool) -> DbResult<Vec<(String, String)>> {
    sqlx::query(CREATE_LEDGER).execute(pool).await?;

    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT module, id FROM _module_migrations ORDER BY module, id")
            .fetch_all(pool)
            .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};
    use bookstore_kernel::Migration;

    fn shelf_migrations() -> Vec<(String, Migration)> {
        vec![(
            "shelf".to_string(),
            Migration {
                id: "001_init",
                up: r#"
                    CREATE TABLE shelf (id INTEGER PRIMARY KEY, label TEXT NOT NULL);
                    CREATE INDEX shelf_label ON shelf (label);
                "#,
            },
        )]
    }

    #[tokio::test]
    async fn migrations_apply_once() {
        let db = Database::connect(DbConfig::in_memory()).await.unwrap();

        assert_eq!(db.migrate(&shelf_migrations()).await.unwrap(), 1);
        assert_eq!(db.migrate(&shelf_migrations()).await.unwrap(), 0);

        assert_eq!(
            db.applied_migrations().await.unwrap(),
            vec![("shelf".to_string(), "001_init".to_string())]
        );
    }

    #[tokio::test]
    async fn failed_migration_is_not_recorded() {
        let db = Database::connect(DbConfig::in_memory()).await.unwrap();
        let broken = vec![(
            "shelf".to_string(),
            Migration {
                id: "001_broken",
                up: "CREATE TABLE shelf (id INTEGER PRIMARY KEY); CREATE TABLE shelf (id INTEGER);",
            },
        )];

        let err = db.migrate(&broken).await.unwrap_err();

        assert!(matches!(err, DbError::MigrationFailed { ref id, .. } if id == "001_broken"));
        assert!(db.applied_migrations().await.unwrap().is_empty());
    }
}
