use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use rusqlite::{params, Connection, Row};

use crate::db::{
    connection::Database,
    helpers::{day_key, format_timestamp, parse_hour, parse_timestamp},
    models::{HourlyActivity, LogEntry},
};
use crate::models::SensorReading;

const INSERT_READING: &str = "INSERT INTO sensor_logs (timestamp, acc_x, acc_y, acc_z, light_level, is_moving)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

fn row_to_entry(row: &Row) -> Result<LogEntry> {
    let timestamp: String = row.get("timestamp")?;
    Ok(LogEntry {
        id: row.get("id")?,
        reading: SensorReading {
            timestamp: parse_timestamp(&timestamp, "timestamp")?,
            acc_x: row.get::<_, Option<f64>>("acc_x")?.unwrap_or(0.0),
            acc_y: row.get::<_, Option<f64>>("acc_y")?.unwrap_or(0.0),
            acc_z: row.get::<_, Option<f64>>("acc_z")?.unwrap_or(0.0),
            light_level: row.get::<_, Option<f64>>("light_level")?.unwrap_or(0.0),
            is_moving: row.get::<_, Option<bool>>("is_moving")?.unwrap_or(false),
        },
        cluster_id: None,
    })
}

/// Append-only write handle owned by a single thread.
///
/// The connection is opened by, and stays with, the thread that writes; it is never
/// shared with readers.
pub struct LogWriter {
    conn: Connection,
}

impl LogWriter {
    pub(crate) fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Inserts one row and returns its id.
    pub fn append(&mut self, reading: &SensorReading) -> Result<i64> {
        let mut stmt = self
            .conn
            .prepare_cached(INSERT_READING)
            .context("failed to prepare sensor log insert")?;
        stmt.execute(params![
            format_timestamp(&reading.timestamp),
            reading.acc_x,
            reading.acc_y,
            reading.acc_z,
            reading.light_level,
            reading.is_moving,
        ])
        .context("failed to insert sensor log")?;
        Ok(self.conn.last_insert_rowid())
    }
}

impl Database {
    pub fn open_writer(&self) -> Result<LogWriter> {
        let conn = self.open_connection()?;
        // Fail here, not on the first sample, if the store is unusable.
        conn.prepare_cached(INSERT_READING)
            .context("sensor_logs is not writable")?;
        Ok(LogWriter::new(conn))
    }

    /// Rows of the current local calendar day, newest first.
    pub async fn get_todays_logs(&self) -> Result<Vec<LogEntry>> {
        self.get_logs_for_day(Local::now().date_naive()).await
    }

    pub async fn get_logs_for_day(&self, day: NaiveDate) -> Result<Vec<LogEntry>> {
        let day = day_key(day);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, timestamp, acc_x, acc_y, acc_z, light_level, is_moving
                 FROM sensor_logs
                 WHERE timestamp IS NOT NULL AND date(timestamp) = ?1
                 ORDER BY timestamp DESC, id DESC",
            )?;

            let mut rows = stmt.query(params![day])?;
            let mut entries = Vec::new();
            while let Some(row) = rows.next()? {
                entries.push(row_to_entry(row)?);
            }

            Ok(entries)
        })
        .await
    }

    /// Moving-sample counts per hour of the current local day, ascending by hour.
    /// Hours without movement are absent.
    pub async fn get_hourly_activity(&self) -> Result<Vec<HourlyActivity>> {
        self.get_hourly_activity_for_day(Local::now().date_naive())
            .await
    }

    pub async fn get_hourly_activity_for_day(&self, day: NaiveDate) -> Result<Vec<HourlyActivity>> {
        let day = day_key(day);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT strftime('%H', timestamp) AS hour, COUNT(*) AS activity_count
                 FROM sensor_logs
                 WHERE is_moving = 1 AND date(timestamp) = ?1
                 GROUP BY hour
                 ORDER BY hour",
            )?;

            let mut rows = stmt.query(params![day])?;
            let mut buckets = Vec::new();
            while let Some(row) = rows.next()? {
                let hour: String = row.get("hour")?;
                let count: i64 = row.get("activity_count")?;
                buckets.push(HourlyActivity {
                    hour: parse_hour(&hour)?,
                    activity_count: u64::try_from(count)
                        .context("negative activity count")?,
                });
            }

            Ok(buckets)
        })
        .await
    }

    pub async fn count_logs(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM sensor_logs", [], |row| row.get(0))?;
            u64::try_from(count).context("negative row count")
        })
        .await
    }
}
