use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use rusqlite::Connection;

use super::migrations::run_migrations;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the on-disk store.
///
/// Cloning is cheap and no connection is shared: the writer owns its own connection and
/// every query opens a fresh one on a blocking worker, so readers and the writer only
/// meet at SQLite's WAL locking.
#[derive(Clone)]
pub struct Database {
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let database = Self {
            db_path: Arc::new(db_path),
        };

        // Initialisation uses its own short-lived connection.
        let mut conn = database.open_connection()?;
        run_migrations(&mut conn).context("failed to run database migrations")?;
        drop(conn);

        log_info!("Database initialized at {}", database.path().display());

        Ok(database)
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    /// Opens a new connection configured for concurrent use.
    pub fn open_connection(&self) -> Result<Connection> {
        let conn = Connection::open(self.path()).with_context(|| {
            format!("failed to open SQLite database {}", self.path().display())
        })?;

        conn.busy_timeout(BUSY_TIMEOUT)
            .context("failed to set busy timeout")?;
        match conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        }) {
            Ok(mode) if !mode.eq_ignore_ascii_case("wal") => {
                log_warn!("SQLite kept journal mode {mode} instead of WAL");
            }
            Ok(_) => {}
            Err(err) => log_warn!("Failed to enable WAL mode: {err}"),
        }

        Ok(conn)
    }

    /// Runs `task` against a connection of its own on the blocking pool.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let database = self.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = database.open_connection()?;
            task(&mut conn)
        })
        .await
        .map_err(|err| anyhow!("database task terminated unexpectedly: {err}"))?
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use uuid::Uuid;

    /// Database file in the temp dir, removed (with its WAL files) on drop.
    pub(crate) struct TempDb {
        pub db: Database,
        dir: PathBuf,
    }

    impl TempDb {
        pub fn new() -> Self {
            let dir = std::env::temp_dir().join(format!("shadowtrace-db-{}", Uuid::new_v4()));
            let db = Database::new(dir.join("shadowtrace.db")).unwrap();
            Self { db, dir }
        }
    }

    impl Drop for TempDb {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }

    #[test]
    fn creates_parent_directories() {
        let temp = TempDb::new();
        assert!(temp.db.path().is_file());
    }

    #[test]
    fn initialisation_is_repeatable_while_connections_are_open() {
        let temp = TempDb::new();
        let open = temp.db.open_connection().unwrap();
        open.execute(
            "INSERT INTO sensor_logs (timestamp, is_moving) VALUES ('2024-01-01 00:00:00.000000', 0)",
            [],
        )
        .unwrap();

        let again = Database::new(temp.db.path().to_path_buf()).unwrap();
        let rows: i64 = again
            .open_connection()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM sensor_logs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn connections_use_wal() {
        let temp = TempDb::new();
        let mode: String = temp
            .db
            .open_connection()
            .unwrap()
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }
}
