/// Row Source Module
///
/// Lazy, finite, single-pass access to query results. Rows are converted and
/// buffered a batch at a time so a consumer never holds the whole result set.

use crate::core::db::schema::{Columns, Row, Value};
use crate::core::{ExportError, Result};
use rusqlite::{params, Connection, Params, Statement};
use std::collections::VecDeque;
use tracing::{debug, info};

/// A sequence of result rows with known column descriptors.
///
/// Sources are not restartable: once `next_row` returns `Ok(None)` a second
/// pass needs a fresh source (and a fresh query execution).
pub trait RowSource {
    /// Column descriptors, available before the first row is pulled
    fn columns(&self) -> &Columns;

    /// Pulls the next row, `Ok(None)` once the source is exhausted
    fn next_row(&mut self) -> Result<Option<Row>>;
}

impl<S: RowSource + ?Sized> RowSource for Box<S> {
    fn columns(&self) -> &Columns {
        (**self).columns()
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        (**self).next_row()
    }
}

/// Converts a driver row into owned values using the column descriptors.
fn convert_row(row: &rusqlite::Row<'_>, columns: &Columns) -> Result<Row> {
    let mut values = Vec::with_capacity(columns.len());
    for (i, column) in columns.iter().enumerate() {
        values.push(Value::from_sql(row.get_ref(i)?, column.kind));
    }
    Ok(values)
}

/// Rows of an executed statement, fetched in fixed-size batches.
pub struct ChunkedRows<'stmt> {
    columns: Columns,
    rows: rusqlite::Rows<'stmt>,
    batch: VecDeque<Row>,
    batch_size: usize,
    exhausted: bool,
    fetched: usize,
}

impl<'stmt> ChunkedRows<'stmt> {
    /// Executes `stmt` with `params` and returns a source over its rows.
    ///
    /// The query runs immediately; rows are then pulled `batch_size` at a time.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::Config` for a zero batch size and
    /// `ExportError::Database` if the statement fails to execute.
    pub fn execute<P: Params>(
        stmt: &'stmt mut Statement<'_>,
        params: P,
        batch_size: usize,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(ExportError::Config(
                "batch size must be greater than zero".to_string(),
            ));
        }
        let columns = Columns::from_statement(stmt);
        let rows = stmt.query(params)?;
        Ok(ChunkedRows {
            columns,
            rows,
            batch: VecDeque::with_capacity(batch_size),
            batch_size,
            exhausted: false,
            fetched: 0,
        })
    }

    /// Number of rows fetched from the driver so far
    pub fn fetched(&self) -> usize {
        self.fetched
    }

    fn fill_batch(&mut self) -> Result<()> {
        while self.batch.len() < self.batch_size {
            match self.rows.next()? {
                Some(row) => {
                    let values = convert_row(row, &self.columns)?;
                    self.batch.push_back(values);
                }
                None => {
                    self.exhausted = true;
                    break;
                }
            }
        }
        self.fetched += self.batch.len();
        debug!(
            "fetched batch of {} rows ({} total)",
            self.batch.len(),
            self.fetched
        );
        Ok(())
    }
}

impl RowSource for ChunkedRows<'_> {
    fn columns(&self) -> &Columns {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        if self.batch.is_empty() && !self.exhausted {
            self.fill_batch()?;
        }
        Ok(self.batch.pop_front())
    }
}

/// Walks an integer key space window by window.
///
/// `sql` must take two positional parameters, the inclusive lower and
/// exclusive upper key of a window. `max_sql` returns the largest key (or
/// NULL for an empty table). Each window is executed separately so memory is
/// bounded by the rows of one window.
pub struct KeyRangeRows<'conn> {
    conn: &'conn Connection,
    sql: String,
    columns: Columns,
    chunk_size: i64,
    max_key: i64,
    current: i64,
    buffer: VecDeque<Row>,
}

impl<'conn> KeyRangeRows<'conn> {
    /// Looks up the key range and loads the first window.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::Config` for a non-positive chunk size and
    /// `ExportError::Database` if either query fails.
    pub fn new(conn: &'conn Connection, sql: &str, max_sql: &str, chunk_size: i64) -> Result<Self> {
        if chunk_size <= 0 {
            return Err(ExportError::Config(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        let max_key: Option<i64> = conn.query_row(max_sql, [], |row| row.get(0))?;
        let columns = {
            let stmt = conn.prepare_cached(sql)?;
            Columns::from_statement(&stmt)
        };

        let mut source = KeyRangeRows {
            conn,
            sql: sql.to_string(),
            columns,
            chunk_size,
            max_key: max_key.unwrap_or(0),
            current: 0,
            buffer: VecDeque::new(),
        };
        source.load_window()?;
        Ok(source)
    }

    fn load_window(&mut self) -> Result<()> {
        let upper = self.current.saturating_add(self.chunk_size);
        info!("fetching {}...{}", self.current, upper);

        let mut stmt = self.conn.prepare_cached(&self.sql)?;
        let mut rows = stmt.query(params![self.current, upper])?;
        while let Some(row) = rows.next()? {
            self.buffer.push_back(convert_row(row, &self.columns)?);
        }
        Ok(())
    }
}

impl RowSource for KeyRangeRows<'_> {
    fn columns(&self) -> &Columns {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        loop {
            if let Some(row) = self.buffer.pop_front() {
                return Ok(Some(row));
            }
            let next = self.current.saturating_add(self.chunk_size);
            if next > self.max_key || next == self.current {
                return Ok(None);
            }
            self.current = next;
            self.load_window()?;
        }
    }
}

/// An in-memory row source over rows the caller already holds.
#[derive(Debug, Clone)]
pub struct RowBuffer {
    columns: Columns,
    rows: VecDeque<Row>,
}

impl RowBuffer {
    pub fn new(columns: Columns, rows: Vec<Row>) -> Self {
        RowBuffer {
            columns,
            rows: rows.into(),
        }
    }
}

impl RowSource for RowBuffer {
    fn columns(&self) -> &Columns {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        Ok(self.rows.pop_front())
    }
}
