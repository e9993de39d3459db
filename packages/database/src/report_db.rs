//! Service report rows stored in `DuckDB`.
//!
//! One `service_reports` table holds every branch and day. Rows keep their
//! position in the uploaded report (`seq`) so reads return them in report
//! order. Counter tokens are stored verbatim as text.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use dealer_feed_source_models::{ProductivityCounter, ProductivityCounters, ServiceReportRow};
use duckdb::Connection;

use crate::DbError;

/// Date format of the `report_date` column.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Leading non-counter columns, in select order.
const KEY_COLUMNS: [&str; 4] = ["branch", "report_date", "technician_id", "technician_name"];

/// Opens (or creates) a report database and ensures the schema exists.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open(path: &Path) -> Result<Connection, DbError> {
    if let Some(parent) = path.parent() {
        crate::paths::ensure_dir(parent)?;
    }

    let conn = Connection::open(path)?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Opens a throwaway in-memory report database.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open_in_memory() -> Result<Connection, DbError> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

fn counter_columns() -> impl Iterator<Item = &'static str> {
    ProductivityCounter::ALL.into_iter().map(<&'static str>::from)
}

fn create_schema(conn: &Connection) -> Result<(), DbError> {
    let counters = counter_columns()
        .map(|name| format!("{name} TEXT NOT NULL DEFAULT '0'"))
        .collect::<Vec<_>>()
        .join(",\n            ");

    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS service_reports (
            branch TEXT NOT NULL,
            report_date TEXT NOT NULL,
            seq INTEGER NOT NULL,
            technician_id TEXT NOT NULL,
            technician_name TEXT NOT NULL,
            {counters},
            created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
        );"
    ))?;
    Ok(())
}

/// Replaces every stored row for `(branch, date)` with `rows`.
///
/// The delete and the inserts run in one transaction, so readers see
/// either the previous set or the new one. Each row's own `branch` and
/// `date` are ignored in favour of the key. Returns the number of rows
/// stored.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails; the previous set is kept.
pub fn replace_reports(
    conn: &mut Connection,
    branch: &str,
    date: NaiveDate,
    rows: &[ServiceReportRow],
) -> Result<usize, DbError> {
    let report_date = date.format(DATE_FORMAT).to_string();
    let tx = conn.transaction()?;

    let removed = tx.execute(
        "DELETE FROM service_reports WHERE branch = ? AND report_date = ?",
        duckdb::params![branch, report_date],
    )?;

    let columns = KEY_COLUMNS
        .iter()
        .copied()
        .chain(std::iter::once("seq"))
        .chain(counter_columns())
        .collect::<Vec<_>>();
    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO service_reports ({}) VALUES ({placeholders})",
        columns.join(", ")
    );

    {
        let mut stmt = tx.prepare(&sql)?;

        for (seq, row) in rows.iter().enumerate() {
            let seq = i64::try_from(seq).map_err(|e| DbError::Conversion {
                message: format!("row position {seq} out of range: {e}"),
            })?;
            let t = row.counters.to_tokens();

            stmt.execute(duckdb::params![
                branch,
                report_date,
                row.technician_id,
                row.technician_name,
                seq,
                t[0],
                t[1],
                t[2],
                t[3],
                t[4],
                t[5],
                t[6],
                t[7],
                t[8],
                t[9],
                t[10],
                t[11],
                t[12],
            ])?;
        }
    }

    tx.commit()?;

    log::info!(
        "Stored {} service report rows for {branch} on {report_date} (replaced {removed})",
        rows.len()
    );

    Ok(rows.len())
}

/// Reads stored rows, optionally narrowed to one branch and/or day.
///
/// Rows are ordered by date, then branch, then their position in the
/// uploaded report.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a stored date is malformed.
pub fn query_reports(
    conn: &Connection,
    branch: Option<&str>,
    date: Option<NaiveDate>,
) -> Result<Vec<ServiceReportRow>, DbError> {
    let report_date = date.map(|d| d.format(DATE_FORMAT).to_string());

    let mut conditions = Vec::new();
    let mut binds: Vec<&str> = Vec::new();
    if let Some(branch) = branch {
        conditions.push("branch = ?");
        binds.push(branch);
    }
    if let Some(report_date) = &report_date {
        conditions.push("report_date = ?");
        binds.push(report_date);
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let columns = KEY_COLUMNS
        .iter()
        .copied()
        .chain(counter_columns())
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {columns} FROM service_reports{where_clause} ORDER BY report_date, branch, seq"
    );

    let mut stmt = conn.prepare(&sql)?;
    for (i, value) in binds.iter().enumerate() {
        stmt.raw_bind_parameter(i + 1, *value)?;
    }
    stmt.raw_execute()?;

    let mut results = Vec::new();
    let mut rows = stmt.raw_query();
    while let Some(row) = rows.next()? {
        let branch: String = row.get(0)?;
        let report_date: String = row.get(1)?;
        let technician_id: String = row.get(2)?;
        let technician_name: String = row.get(3)?;

        let mut tokens: [String; ProductivityCounter::COUNT] = Default::default();
        for (i, token) in tokens.iter_mut().enumerate() {
            *token = row.get(KEY_COLUMNS.len() + i)?;
        }

        let date = NaiveDate::parse_from_str(&report_date, DATE_FORMAT).map_err(|e| {
            DbError::Conversion {
                message: format!("invalid report_date '{report_date}': {e}"),
            }
        })?;

        results.push(ServiceReportRow {
            technician_id,
            technician_name,
            counters: ProductivityCounters::from_tokens(tokens),
            branch,
            date,
        });
    }

    Ok(results)
}

/// Thread-safe handle over one report database connection.
///
/// `DuckDB` connections are not `Sync`, so access is serialised through a
/// mutex. Calls block; async callers should use `spawn_blocking`.
pub struct ReportStore {
    conn: Mutex<Connection>,
}

impl ReportStore {
    /// Opens (or creates) the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the database cannot be opened.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        log::info!("Opening report database at {}", path.display());
        Ok(Self {
            conn: Mutex::new(open(path)?),
        })
    }

    /// Opens an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the database cannot be created.
    pub fn in_memory() -> Result<Self, DbError> {
        Ok(Self {
            conn: Mutex::new(open_in_memory()?),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|e| DbError::Conversion {
            message: format!("report database lock poisoned: {e}"),
        })
    }

    /// See [`replace_reports`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the replacement fails.
    pub fn replace(
        &self,
        branch: &str,
        date: NaiveDate,
        rows: &[ServiceReportRow],
    ) -> Result<usize, DbError> {
        let mut conn = self.lock()?;
        replace_reports(&mut conn, branch, date, rows)
    }

    /// See [`query_reports`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub fn query(
        &self,
        branch: Option<&str>,
        date: Option<NaiveDate>,
    ) -> Result<Vec<ServiceReportRow>, DbError> {
        let conn = self.lock()?;
        query_reports(&conn, branch, date)
    }
}
