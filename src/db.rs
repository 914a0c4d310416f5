use crate::catalog::fold_case;
use crate::config::Config;
use anyhow::Result;
use libsql::{Builder, Connection, Database as LibsqlDatabase};
use std::path::{Path, PathBuf};

const BUSY_TIMEOUT_MS: u32 = 5000;

const SYSTEM_MIGRATIONS: &[(&str, &str)] =
    &[("system/000_migrations_table.sql", include_str!("migrations/system/000_migrations_table.sql"))];

const MIGRATIONS: &[(&str, &str)] = &[
    ("001_schema.sql", include_str!("migrations/001_schema.sql")),
    ("002_folded_search.sql", include_str!("migrations/002_folded_search.sql")),
];

const FOLDED_SEARCH_MIGRATION: &str = "002_folded_search.sql";

/// Handle to the file-backed catalog database.
///
/// Handlers never share a connection: each request calls [`Database::connect`]
/// and drops the connection when it is done.
pub struct Database {
    db: LibsqlDatabase,
    path: PathBuf,
}

impl Database {
    pub async fn new(cfg: &Config, data_dir: &Path) -> Result<Self> {
        Self::open(&cfg.app.database_path(data_dir)).await
    }

    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| anyhow::anyhow!("failed to create database directory {:?}: {e}", parent))?;
        }

        tracing::info!(path = ?path, "[db] opening local database");
        let db = Builder::new_local(path).build().await?;
        let database = Database {
            db,
            path: path.to_path_buf(),
        };

        let conn = database.connect().await?;
        conn.query("SELECT 1", ()).await?;

        for (filename, sql) in SYSTEM_MIGRATIONS {
            Self::run_migration(&conn, filename, sql).await?;
        }

        for (filename, sql) in MIGRATIONS {
            let applied = Self::run_migration(&conn, filename, sql).await?;
            if applied && *filename == FOLDED_SEARCH_MIGRATION {
                Self::refold_search_columns(&conn).await?;
            }
        }

        Ok(database)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens a connection with foreign keys enforced and a busy timeout set.
    pub async fn connect(&self) -> std::result::Result<Connection, libsql::Error> {
        let conn = self.db.connect()?;
        conn.execute("PRAGMA foreign_keys = ON", ()).await?;
        let mut rows = conn
            .query(&format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS}"), ())
            .await?;
        while rows.next().await?.is_some() {}
        Ok(conn)
    }

    pub async fn ping(&self) -> std::result::Result<(), libsql::Error> {
        let conn = self.connect().await?;
        let mut rows = conn.query("SELECT 1", ()).await?;
        rows.next().await?;
        Ok(())
    }

    async fn is_migration_applied(conn: &Connection, name: &str) -> Result<bool> {
        let query = "SELECT 1 FROM _migrations WHERE name = ?";
        match conn.query(query, libsql::params![name]).await {
            Ok(mut rows) => Ok(rows.next().await?.is_some()),
            Err(e) => {
                if e.to_string().contains("no such table") {
                    Ok(false)
                } else {
                    Err(e.into())
                }
            }
        }
    }

    async fn record_migration(conn: &Connection, name: &str) -> Result<()> {
        let query = r#"
            INSERT INTO _migrations (name, applied_at)
            VALUES (?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        "#;
        conn.execute(query, libsql::params![name]).await?;
        Ok(())
    }

    /// Returns whether the migration ran now, as opposed to on an earlier open.
    async fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<bool> {
        if Self::is_migration_applied(conn, name).await? {
            tracing::debug!("migration {} already applied, skipping", name);
            return Ok(false);
        }

        tracing::info!("applying migration: {}", name);
        conn.execute_batch(sql)
            .await
            .map_err(|e| anyhow::anyhow!("failed to execute migration {name}: {e}"))?;

        Self::record_migration(conn, name).await?;
        Ok(true)
    }

    // SQLite's lower() only folds ASCII, so rows that predate the folded
    // columns are re-folded here with the same folding new inserts use.
    async fn refold_search_columns(conn: &Connection) -> Result<()> {
        let mut authors = Vec::new();
        let mut rows = conn.query("SELECT id, name FROM authors", ()).await?;
        while let Some(row) = rows.next().await? {
            authors.push((row.get::<i64>(0)?, row.get::<String>(1)?));
        }

        let mut books = Vec::new();
        let mut rows = conn.query("SELECT id, title FROM books", ()).await?;
        while let Some(row) = rows.next().await? {
            books.push((row.get::<i64>(0)?, row.get::<String>(1)?));
        }

        for (id, name) in &authors {
            conn.execute(
                "UPDATE authors SET name_folded = ? WHERE id = ?",
                libsql::params![fold_case(name), *id],
            )
            .await?;
        }
        for (id, title) in &books {
            conn.execute(
                "UPDATE books SET title_folded = ? WHERE id = ?",
                libsql::params![fold_case(title), *id],
            )
            .await?;
        }

        tracing::info!(authors = authors.len(), books = books.len(), "[db] folded search columns");
        Ok(())
    }
}
