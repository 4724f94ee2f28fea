use anyhow::{bail, Context, Result};
use rusqlite::{Connection, Transaction, TransactionBehavior};

pub const CURRENT_SCHEMA_VERSION: i32 = 1;

fn read_user_version(conn: &Connection) -> Result<i32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")
}

/// Brings the schema up to date. Safe to run from several connections at once: the
/// upgrade happens inside an immediate transaction and every statement is idempotent.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    if read_user_version(conn)? == CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .context("failed to open migration transaction")?;

    // Another connection may have finished the upgrade while we waited for the lock.
    let mut version = read_user_version(&tx)?;
    if version > CURRENT_SCHEMA_VERSION {
        bail!(
            "database version ({}) is newer than supported schema ({})",
            version,
            CURRENT_SCHEMA_VERSION
        );
    }

    while version < CURRENT_SCHEMA_VERSION {
        let next_version = version + 1;
        apply_migration(&tx, next_version)
            .with_context(|| format!("migration to version {next_version} failed"))?;
        version = next_version;
    }

    tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)
        .context("failed to update user_version pragma")?;
    tx.commit().context("failed to commit migrations")?;

    Ok(())
}

fn apply_migration(tx: &Transaction<'_>, version: i32) -> Result<()> {
    match version {
        1 => {
            tx.execute_batch(include_str!("schemas/schema_v1.sql"))
                .context("failed to execute schema_v1.sql")?;
            Ok(())
        }
        _ => bail!("unknown migration target version: {version}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap();
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .unwrap()
            .collect::<rusqlite::Result<Vec<_>>>()
            .unwrap();
        names
    }

    #[test]
    fn creates_both_tables_once() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        run_migrations(&mut conn).unwrap();

        assert_eq!(table_names(&conn), vec!["movement_events", "sensor_logs"]);
        assert_eq!(read_user_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn adopts_existing_unversioned_store() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE sensor_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp DATETIME, acc_x REAL, acc_y REAL, acc_z REAL,
                light_level REAL, is_moving BOOLEAN
            );
            INSERT INTO sensor_logs (timestamp, acc_x, acc_y, acc_z, light_level, is_moving)
            VALUES ('2024-01-01 10:00:00.000000', 0.1, 9.8, 0.0, 300.0, 0);",
        )
        .unwrap();

        run_migrations(&mut conn).unwrap();

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM sensor_logs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
        assert!(table_names(&conn).contains(&"movement_events".to_string()));
    }

    #[test]
    fn rejects_newer_schema() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION + 1)
            .unwrap();
        assert!(run_migrations(&mut conn).is_err());
    }
}
