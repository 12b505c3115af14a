use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::analysis::{ReadingSource, StoreError};
use crate::db::{
    connection::Database,
    helpers::{invalid_data, limit_param, parse_datetime, timestamp_text},
    models::{Acceleration, Reading, Rgb},
};

fn row_to_reading(row: &Row) -> Result<Reading, rusqlite::Error> {
    let timestamp_str: String = row.get("timestamp")?;
    let rgb_str: String = row.get("rgb")?;
    let accelerometer_str: String = row.get("accelerometer")?;

    Ok(Reading {
        id: row.get("id")?,
        timestamp: parse_datetime(&timestamp_str, "timestamp").map_err(invalid_data)?,
        light: row.get("light")?,
        rgb: Rgb::parse(&rgb_str),
        accelerometer: Acceleration::parse(&accelerometer_str),
        ambient_temp: row.get("temp")?,
        pressure: row.get("pressure")?,
        cpu_temp: row.get("cputemp")?,
    })
}

fn insert_row(conn: &Connection, reading: &Reading) -> Result<i64> {
    conn.execute(
        "INSERT INTO enviro_log (timestamp, light, rgb, accelerometer, temp, pressure, cputemp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            timestamp_text(&reading.timestamp),
            reading.light,
            reading.rgb.to_string(),
            reading.accelerometer.to_string(),
            reading.ambient_temp,
            reading.pressure,
            reading.cpu_temp,
        ],
    )
    .with_context(|| "failed to insert reading")?;
    Ok(conn.last_insert_rowid())
}

fn query_latest(conn: &Connection, limit: usize) -> Result<Vec<Reading>> {
    let mut stmt = conn.prepare(
        "SELECT id, timestamp, light, rgb, accelerometer, temp, pressure, cputemp
         FROM enviro_log
         ORDER BY timestamp DESC, id DESC
         LIMIT ?1",
    )?;

    let readings_iter = stmt.query_map(params![limit_param(limit)?], row_to_reading)?;

    let mut readings = Vec::new();
    for reading_result in readings_iter {
        readings.push(reading_result.context("failed to decode reading row")?);
    }
    Ok(readings)
}

fn query_between(
    conn: &Connection,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Reading>> {
    let mut stmt = conn.prepare(
        "SELECT id, timestamp, light, rgb, accelerometer, temp, pressure, cputemp
         FROM enviro_log
         WHERE timestamp >= ?1 AND timestamp < ?2
         ORDER BY timestamp ASC, id ASC",
    )?;

    let readings_iter = stmt.query_map(
        params![timestamp_text(&start), timestamp_text(&end)],
        row_to_reading,
    )?;

    let mut readings = Vec::new();
    for reading_result in readings_iter {
        readings.push(reading_result.context("failed to decode reading row")?);
    }
    Ok(readings)
}

impl Database {
    /// Append one reading; returns its row id.
    pub async fn insert_reading(&self, reading: &Reading) -> Result<i64> {
        let record = reading.clone();
        self.execute(move |conn| insert_row(conn, &record)).await
    }

    /// Append a batch of readings in one transaction.
    pub async fn insert_readings(&self, readings: &[Reading]) -> Result<()> {
        let readings = readings.to_vec();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            for reading in &readings {
                insert_row(&tx, reading)?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// The `limit` newest readings, newest first.
    pub async fn get_latest_readings(&self, limit: usize) -> Result<Vec<Reading>> {
        self.execute(move |conn| query_latest(conn, limit)).await
    }

    /// Readings in `[start, end)`, oldest first.
    pub async fn get_readings_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reading>> {
        self.execute(move |conn| query_between(conn, start, end)).await
    }

    pub async fn count_readings(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM enviro_log", [], |row| row.get(0))?;
            Ok(u64::try_from(count).unwrap_or_default())
        })
        .await
    }
}

impl ReadingSource for Database {
    async fn latest(&self, limit: usize) -> Result<Vec<Reading>, StoreError> {
        self.dispatch(move |conn| query_latest(conn, limit))
            .await
            .map_err(|gone| StoreError::Unavailable(gone.0))?
            .map_err(StoreError::Query)
    }

    async fn between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reading>, StoreError> {
        self.dispatch(move |conn| query_between(conn, start, end))
            .await
            .map_err(|gone| StoreError::Unavailable(gone.0))?
            .map_err(StoreError::Query)
    }
}
