//! SQLite connection pool and the migration runner for module-contributed schema.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const BUSY_TIMEOUT: Duration = Duration::from_millis(1500);

/// Migration definition contributed by a module.
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

/// Shared database handle. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the database at `url` (e.g. `sqlite://libris.db`).
    ///
    /// The file is created when missing.
    pub async fn connect(url: &str, max_connections: Option<u32>) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid database url '{url}'"))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool_options =
            SqlitePoolOptions::new().max_connections(max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS));
        Self::open(options, pool_options).await
    }

    /// Connect to a private in-memory database.
    ///
    /// In-memory databases vanish with their connection, so the pool holds
    /// exactly one connection and never retires it.
    pub async fn connect_in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("invalid in-memory database url")?;
        let pool_options = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
        Self::open(options, pool_options).await
    }

    async fn open(
        options: SqliteConnectOptions,
        pool_options: SqlitePoolOptions,
    ) -> anyhow::Result<Self> {
        let options = options.foreign_keys(true).busy_timeout(BUSY_TIMEOUT);
        let max_connections = pool_options.get_max_connections();

        let pool = pool_options
            .connect_with(options)
            .await
            .context("failed to open SQLite pool")?;

        tracing::info!(target: "libris-db", max_connections, "database pool ready");
        Ok(Self { pool })
    }

    /// Apply `(module, migration)` pairs in the given order.
    ///
    /// Each pair is applied at most once; applied ids are recorded in
    /// `_module_migrations`. Returns how many migrations ran.
    pub async fn apply_migrations(&self, migrations: &[(String, Migration)]) -> anyhow::Result<usize> {
        sqlx::raw_sql(
            r#"
            CREATE TABLE IF NOT EXISTS _module_migrations (
                module     TEXT NOT NULL,
                id         TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (module, id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to create migration ledger")?;

        let mut applied = 0;
        for (module, migration) in migrations {
            let seen: Option<i64> = sqlx::query_scalar(
                "SELECT 1 FROM _module_migrations WHERE module = ? AND id = ?",
            )
            .bind(module)
            .bind(migration.id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to read migration ledger")?;

            if seen.is_some() {
                tracing::debug!(target: "libris-db", %module, id = migration.id, "migration already applied");
                continue;
            }

            let mut tx = self.pool.begin().await.context("failed to open migration transaction")?;
            sqlx::raw_sql(migration.up)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("migration '{}/{}' failed", module, migration.id))?;
            sqlx::query("INSERT INTO _module_migrations (module, id) VALUES (?, ?)")
                .bind(module)
                .bind(migration.id)
                .execute(&mut *tx)
                .await
                .context("failed to record migration")?;
            tx.commit().await.context("failed to commit migration")?;

            tracing::info!(target: "libris-db", %module, id = migration.id, "migration applied");
            applied += 1;
        }

        Ok(applied)
    }

    /// Underlying pool, for repositories.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
