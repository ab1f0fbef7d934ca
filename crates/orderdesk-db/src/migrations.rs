//! # Database Migrations
//!
//! SQL files under `migrations/sqlite/` are compiled into the binary and
//! applied in filename order. sqlx records each applied file (with its
//! checksum) in `_sqlx_migrations`, so a file already applied is skipped.
//!
//! ```text
//! migrations/sqlite/
//! └── 001_initial_schema.sql   users, profile_screens (+ default screens), orders
//! ```
//!
//! ## Adding a Migration
//! Add `NNN_description.sql` with the next number. Never edit a file that
//! has shipped: its checksum is recorded and a change makes startup fail.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every pending migration, each in its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!(
        available = MIGRATOR.migrations.len(),
        "Checking for pending migrations"
    );

    MIGRATOR.run(pool).await?;

    info!("Schema up to date");
    Ok(())
}

/// `(embedded, applied)` migration counts, for diagnostics.
///
/// A database that was never migrated reports zero applied.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((total, applied as usize))
}
