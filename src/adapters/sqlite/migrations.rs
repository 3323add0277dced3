use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{info, warn};

use crate::core::errors::{PoolError, Result};
use crate::core::models::customer::name_key;

/// One schema step.
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    up: &'static [&'static str],
    down: &'static [&'static str],
    /// Data fill run after `up`, for values SQL cannot compute.
    fill: Option<Fill>,
}

#[derive(Debug, Clone, Copy)]
enum Fill {
    /// Unicode-lowercased names; SQLite's `lower()` folds ASCII only.
    NameKeys,
}

/// Versioned schema migrations, in order.
///
/// Each step has an `up` and a `down` script and runs in its own
/// transaction together with its `schema_version` row, so an interrupted
/// run leaves the database at the last completed version. Never edit a
/// released step; append a new one instead.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create customers and audit",
        up: &[
            r#"
            CREATE TABLE customers (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                name              TEXT NOT NULL UNIQUE COLLATE NOCASE,
                status            TEXT NOT NULL DEFAULT 'Lead',
                technician        TEXT NOT NULL DEFAULT 'Unassigned',
                route_value       TEXT NOT NULL DEFAULT '0'
                                  CHECK (CAST(route_value AS REAL) >= 0),
                charge_method     TEXT,
                auto_pay          INTEGER NOT NULL DEFAULT 0,
                last_service_date TEXT,
                next_service_date TEXT,
                created_at        TEXT NOT NULL,
                updated_at        TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE audit (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                customer_id   INTEGER REFERENCES customers(id) ON DELETE SET NULL,
                customer_name TEXT NOT NULL,
                action        TEXT NOT NULL,
                field         TEXT,
                old_value     TEXT,
                new_value     TEXT,
                actor         TEXT NOT NULL,
                timestamp     TEXT NOT NULL
            )
            "#,
            "CREATE INDEX idx_audit_customer ON audit(customer_id)",
        ],
        down: &[
            "DROP INDEX IF EXISTS idx_audit_customer",
            "DROP TABLE audit",
            "DROP TABLE customers",
        ],
        fill: None,
    },
    Migration {
        version: 2,
        name: "add filter columns",
        up: &[
            "ALTER TABLE customers ADD COLUMN filter_type TEXT",
            "ALTER TABLE customers ADD COLUMN filter_value TEXT NOT NULL DEFAULT '0' \
             CHECK (CAST(filter_value AS REAL) >= 0)",
        ],
        down: &[
            "ALTER TABLE customers DROP COLUMN filter_value",
            "ALTER TABLE customers DROP COLUMN filter_type",
        ],
        fill: None,
    },
    Migration {
        version: 3,
        name: "drop billing method columns",
        up: &[
            "ALTER TABLE customers DROP COLUMN charge_method",
            "ALTER TABLE customers DROP COLUMN auto_pay",
        ],
        down: &[
            "ALTER TABLE customers ADD COLUMN charge_method TEXT",
            "ALTER TABLE customers ADD COLUMN auto_pay INTEGER NOT NULL DEFAULT 0",
        ],
        fill: None,
    },
    Migration {
        version: 4,
        name: "canonicalize statuses and technicians",
        up: &[
            "UPDATE customers SET status = 'Active (routed)' \
             WHERE lower(trim(status)) IN ('ativo', 'active', 'active (routed)')",
            "UPDATE customers SET status = 'Active (no route)' \
             WHERE lower(trim(status)) IN ('ativo sem rota', 'ativo (sem rota)', 'active (no route)')",
            "UPDATE customers SET status = 'Inactive' \
             WHERE lower(trim(status)) IN ('inativo', 'inactive')",
            "UPDATE customers SET status = 'Lead' WHERE lower(trim(status)) = 'lead'",
            "UPDATE customers SET technician = 'Unassigned' \
             WHERE lower(trim(technician)) IN ('', 'n/a', 'none', 'unassigned', 'sem piscineiro', \
             'sem piscinero', 'nao atribuido', 'não atribuído')",
        ],
        // Lossy: every legacy synonym comes back as its most common spelling.
        down: &[
            "UPDATE customers SET status = 'Ativo' WHERE status = 'Active (routed)'",
            "UPDATE customers SET status = 'Ativo sem Rota' WHERE status = 'Active (no route)'",
            "UPDATE customers SET status = 'Inativo' WHERE status = 'Inactive'",
            "UPDATE customers SET technician = 'Não atribuído' WHERE technician = 'Unassigned'",
        ],
        fill: None,
    },
    Migration {
        version: 5,
        name: "unicode name keys",
        up: &[
            "ALTER TABLE customers ADD COLUMN name_key TEXT",
            "CREATE UNIQUE INDEX idx_customers_name_key ON customers(name_key)",
        ],
        down: &[
            "DROP INDEX IF EXISTS idx_customers_name_key",
            "ALTER TABLE customers DROP COLUMN name_key",
        ],
        fill: Some(Fill::NameKeys),
    },
];

/// Highest version this build knows about.
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

async fn ensure_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version    INTEGER PRIMARY KEY,
            name       TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Version currently applied; 0 for an empty database.
pub async fn current_version(pool: &SqlitePool) -> Result<i64> {
    ensure_version_table(pool).await?;
    let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await?;
    Ok(version.unwrap_or(0))
}

/// Apply pending steps up to `target` (default: latest). Returns the
/// versions applied; an up-to-date database yields an empty list.
pub async fn migrate_up(pool: &SqlitePool, target: Option<i64>) -> Result<Vec<i64>> {
    let target = target.unwrap_or_else(latest_version);
    if target > latest_version() {
        return Err(PoolError::Migration {
            detail: format!(
                "target version {target} is unknown (latest is {})",
                latest_version()
            ),
        });
    }

    let current = current_version(pool).await?;
    if current > latest_version() {
        warn!(
            current,
            latest = latest_version(),
            "database schema is newer than this build"
        );
        return Ok(Vec::new());
    }
    if current >= target {
        info!(version = current, "database schema is up to date");
        return Ok(Vec::new());
    }

    let mut applied = Vec::new();
    for step in MIGRATIONS
        .iter()
        .filter(|m| m.version > current && m.version <= target)
    {
        run_step(pool, step, Direction::Up).await?;
        applied.push(step.version);
    }
    Ok(applied)
}

/// Revert applied steps down to `target` (exclusive), newest first.
/// Returns the versions reverted.
pub async fn migrate_down(pool: &SqlitePool, target: i64) -> Result<Vec<i64>> {
    if target < 0 {
        return Err(PoolError::Migration {
            detail: format!("target version {target} is negative"),
        });
    }
    let current = current_version(pool).await?;
    if current > latest_version() {
        return Err(PoolError::Migration {
            detail: format!(
                "database is at version {current}, newer than this build ({}); refusing to downgrade",
                latest_version()
            ),
        });
    }

    let mut reverted = Vec::new();
    for step in MIGRATIONS
        .iter()
        .rev()
        .filter(|m| m.version <= current && m.version > target)
    {
        run_step(pool, step, Direction::Down).await?;
        reverted.push(step.version);
    }
    Ok(reverted)
}

#[derive(Clone, Copy)]
enum Direction {
    Up,
    Down,
}

async fn run_step(pool: &SqlitePool, step: &Migration, direction: Direction) -> Result<()> {
    let (scripts, label) = match direction {
        Direction::Up => (step.up, "up"),
        Direction::Down => (step.down, "down"),
    };
    info!(version = step.version, name = step.name, direction = label, "running migration");

    let failed = |e: sqlx::Error| PoolError::Migration {
        detail: format!("v{} ({}) {label}: {e}", step.version, step.name),
    };

    let mut tx = pool.begin().await.map_err(failed)?;
    for sql in scripts {
        sqlx::query(sql).execute(&mut *tx).await.map_err(failed)?;
    }
    match direction {
        Direction::Up => {
            if let Some(fill) = step.fill {
                run_fill(&mut tx, fill).await.map_err(failed)?;
            }
            sqlx::query("INSERT INTO schema_version (version, name, applied_at) VALUES (?, ?, ?)")
                .bind(step.version)
                .bind(step.name)
                .bind(chrono::Utc::now())
                .execute(&mut *tx)
                .await
                .map_err(failed)?;
        }
        Direction::Down => {
            sqlx::query("DELETE FROM schema_version WHERE version = ?")
                .bind(step.version)
                .execute(&mut *tx)
                .await
                .map_err(failed)?;
        }
    }
    tx.commit().await.map_err(failed)?;

    info!(version = step.version, direction = label, "✓ migration completed");
    Ok(())
}

async fn run_fill(tx: &mut Transaction<'_, Sqlite>, fill: Fill) -> sqlx::Result<()> {
    match fill {
        Fill::NameKeys => {
            let rows: Vec<(i64, String)> =
                sqlx::query_as("SELECT id, name FROM customers WHERE name_key IS NULL")
                    .fetch_all(&mut **tx)
                    .await?;
            for (id, name) in &rows {
                sqlx::query("UPDATE customers SET name_key = ? WHERE id = ?")
                    .bind(name_key(name))
                    .bind(id)
                    .execute(&mut **tx)
                    .await?;
            }
            info!(rows = rows.len(), "name keys filled");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    async fn columns(pool: &SqlitePool) -> Vec<String> {
        sqlx::query_scalar("SELECT name FROM pragma_table_info('customers') ORDER BY name")
            .fetch_all(pool)
            .await
            .unwrap()
    }

    #[test]
    fn versions_are_sequential() {
        for (i, m) in MIGRATIONS.iter().enumerate() {
            assert_eq!(m.version, i as i64 + 1, "{}", m.name);
        }
    }

    #[tokio::test]
    async fn up_to_latest_twice_is_a_noop() {
        let pool = memory_pool().await;
        let first = migrate_up(&pool, None).await.unwrap();
        assert_eq!(first, vec![1, 2, 3, 4, 5]);
        let cols = columns(&pool).await;

        let second = migrate_up(&pool, None).await.unwrap();
        assert!(second.is_empty());
        assert_eq!(columns(&pool).await, cols);
        assert_eq!(current_version(&pool).await.unwrap(), latest_version());
    }

    #[tokio::test]
    async fn down_then_up_restores_schema() {
        let pool = memory_pool().await;
        migrate_up(&pool, None).await.unwrap();
        let latest_cols = columns(&pool).await;

        let reverted = migrate_down(&pool, 1).await.unwrap();
        assert_eq!(reverted, vec![5, 4, 3, 2]);
        let v1_cols = columns(&pool).await;
        assert!(v1_cols.contains(&"charge_method".to_string()));
        assert!(!v1_cols.contains(&"filter_value".to_string()));

        migrate_up(&pool, None).await.unwrap();
        assert_eq!(columns(&pool).await, latest_cols);
    }

    #[tokio::test]
    async fn down_to_zero_drops_everything() {
        let pool = memory_pool().await;
        migrate_up(&pool, None).await.unwrap();
        migrate_down(&pool, 0).await.unwrap();
        assert_eq!(current_version(&pool).await.unwrap(), 0);
        assert!(columns(&pool).await.is_empty());
    }

    #[tokio::test]
    async fn partial_up_stops_at_target() {
        let pool = memory_pool().await;
        assert_eq!(migrate_up(&pool, Some(2)).await.unwrap(), vec![1, 2]);
        assert_eq!(current_version(&pool).await.unwrap(), 2);
        assert!(migrate_up(&pool, Some(99)).await.is_err());
    }

    #[tokio::test]
    async fn canonicalizes_legacy_values() {
        let pool = memory_pool().await;
        migrate_up(&pool, Some(3)).await.unwrap();
        for (name, status, tech) in [
            ("A", "Ativo", "Não atribuído"),
            ("B", "Ativo sem Rota", "Pedro"),
            ("C", "Inativo", "N/A"),
        ] {
            sqlx::query(
                "INSERT INTO customers (name, status, technician, created_at, updated_at) \
                 VALUES (?, ?, ?, '2025-01-01', '2025-01-01')",
            )
            .bind(name)
            .bind(status)
            .bind(tech)
            .execute(&pool)
            .await
            .unwrap();
        }

        migrate_up(&pool, None).await.unwrap();
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT status, technician FROM customers ORDER BY name")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(
            rows,
            vec![
                ("Active (routed)".to_string(), "Unassigned".to_string()),
                ("Active (no route)".to_string(), "Pedro".to_string()),
                ("Inactive".to_string(), "Unassigned".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn failed_step_leaves_previous_version() {
        let pool = memory_pool().await;
        migrate_up(&pool, Some(1)).await.unwrap();
        // A column that v2 is about to add makes its script fail.
        sqlx::query("ALTER TABLE customers ADD COLUMN filter_type TEXT")
            .execute(&pool)
            .await
            .unwrap();

        let err = migrate_up(&pool, None).await.unwrap_err();
        assert!(matches!(err, PoolError::Migration { .. }));
        assert_eq!(current_version(&pool).await.unwrap(), 1);
    }

    async fn insert_legacy(pool: &SqlitePool, name: &str) {
        sqlx::query(
            "INSERT INTO customers (name, created_at, updated_at) \
             VALUES (?, '2025-01-01', '2025-01-01')",
        )
        .bind(name)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn name_keys_are_filled_with_unicode_lowercase() {
        let pool = memory_pool().await;
        migrate_up(&pool, Some(4)).await.unwrap();
        insert_legacy(&pool, "ÁGUA Clara").await;
        insert_legacy(&pool, "João").await;

        migrate_up(&pool, None).await.unwrap();
        let keys: Vec<String> = sqlx::query_scalar("SELECT name_key FROM customers ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(keys, vec!["água clara", "joão"]);
    }

    #[tokio::test]
    async fn colliding_name_keys_stop_the_migration() {
        let pool = memory_pool().await;
        migrate_up(&pool, Some(4)).await.unwrap();
        // NOCASE lets both in; their Unicode keys are equal.
        insert_legacy(&pool, "água clara").await;
        insert_legacy(&pool, "ÁGUA CLARA").await;

        let err = migrate_up(&pool, None).await.unwrap_err();
        assert!(matches!(err, PoolError::Migration { .. }));
        assert_eq!(current_version(&pool).await.unwrap(), 4);
    }
}
