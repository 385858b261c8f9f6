//! Schema creation and migration for the memory store.
//!
//! All `CREATE TABLE` statements live here -- single source of truth,
//! applied idempotently on every open so an existing database is brought
//! up to date without a separate migration-runner step.
//!
//! Reflections and insights share one physical table (`reflections`),
//! distinguished by a nullable `insight_type` column: `insight_type IS
//! NULL` is a reflection, non-null is an insight. This is spec-shaped,
//! not an implementation shortcut -- `insight_type IS NULL` is the single
//! predicate every reflection/insight query filters on.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::Result;

/// Ensure every table, index, and column this crate depends on exists.
/// Safe to call on every startup: each statement is `IF NOT EXISTS` or
/// tolerates already having run.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    create_conversation_table(pool).await?;
    create_reflection_table(pool).await?;
    migrate_insight_columns(pool).await?;
    create_code_graph_table(pool).await?;
    info!("memory store schema verified");
    Ok(())
}

async fn create_conversation_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS conversations (
            id TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            metadata TEXT NOT NULL DEFAULT '{}',
            embedding BLOB,
            fingerprint BLOB,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_conversations_created_at ON conversations(created_at)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Base reflections table. Starts with no insight-specific columns so a
/// fresh database and a database migrated up from before insights
/// existed converge on the same shape via [`migrate_insight_columns`].
async fn create_reflection_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS reflections (
            id TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]',
            metadata TEXT NOT NULL DEFAULT '{}',
            embedding BLOB,
            fingerprint BLOB,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reflections_created_at ON reflections(created_at)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Older databases may predate the insight columns; add them if missing
/// rather than requiring a fresh database. SQLite has no `ADD COLUMN IF
/// NOT EXISTS`, so we inspect `pragma_table_info` first and swallow
/// "duplicate column" errors from a racing migration.
async fn migrate_insight_columns(pool: &SqlitePool) -> Result<()> {
    let existing: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info('reflections')")
        .fetch_all(pool)
        .await?;

    let wanted = [
        ("insight_type", "TEXT"),
        ("usage_count", "INTEGER NOT NULL DEFAULT 0"),
        ("last_used_at", "TEXT"),
        ("confidence_score", "REAL NOT NULL DEFAULT 0.5"),
    ];

    for (column, ddl) in wanted {
        if !existing.iter().any(|c| c == column) {
            let sql = format!("ALTER TABLE reflections ADD COLUMN {column} {ddl}");
            match sqlx::query(&sql).execute(pool).await {
                Ok(_) => {}
                Err(sqlx::Error::Database(e)) if e.message().contains("duplicate column") => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reflections_insight_type ON reflections(insight_type)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reflections_usage_count ON reflections(usage_count)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reflections_last_used_at ON reflections(last_used_at)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Write-only collaborator table for a code graph. Nothing in this
/// crate reads from it yet; it exists so a code-indexing collaborator
/// has somewhere to persist its output against the same connection the
/// memory store already manages.
async fn create_code_graph_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS code_graphs (
            id TEXT PRIMARY KEY,
            repo_path TEXT NOT NULL,
            commit_hash TEXT NOT NULL,
            indexed_at TEXT NOT NULL,
            nodes_count INTEGER NOT NULL DEFAULT 0,
            graph_data TEXT NOT NULL DEFAULT '{}',
            metadata TEXT NOT NULL DEFAULT '{}'
        )"#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
