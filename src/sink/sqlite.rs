use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use tracing::debug;

use super::FillSink;
use crate::db;
use crate::domain::Fill;

/// Buffers fills and writes each batch in one transaction.
///
/// Rows are keyed by [`db::fill_key`] and inserted with `INSERT OR IGNORE`, so
/// replaying a chunk after a crash adds nothing.
pub struct SqliteFillSink {
    conn: Connection,
    table: String,
    buffer: Vec<Fill>,
    batch_size: usize,
    written: usize,
}

impl SqliteFillSink {
    pub fn open(db_path: &str, table: &str, batch_size: usize) -> Result<Self> {
        let conn = db::open(db_path)?;
        Self::with_connection(conn, table, batch_size)
    }

    pub fn with_connection(conn: Connection, table: &str, batch_size: usize) -> Result<Self> {
        db::create_fill_table(&conn, table)?;
        Ok(Self {
            conn,
            table: table.to_string(),
            buffer: Vec::with_capacity(batch_size),
            batch_size: batch_size.max(1),
            written: 0,
        })
    }

    /// Rows actually inserted so far; duplicates are not counted.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl FillSink for SqliteFillSink {
    fn add(&mut self, fill: Fill) -> Result<()> {
        self.buffer.push(fill);
        Ok(())
    }

    fn should_flush(&self) -> bool {
        self.buffer.len() >= self.batch_size
    }

    fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let sql = format!(
            "INSERT OR IGNORE INTO {} (fill_key, {}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            self.table,
            db::FILL_COLUMNS
        );

        let tx = self
            .conn
            .transaction()
            .context("Failed to begin fill batch transaction")?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare_cached(&sql)?;
            for f in &self.buffer {
                inserted += stmt.execute(params![
                    db::fill_key(f),
                    f.wallet,
                    f.coin,
                    f.side.as_str(),
                    f.px.to_string(),
                    f.sz.to_string(),
                    f.ts_ms,
                    f.hash,
                    f.base_tid,
                    f.trade_id,
                    f.role.map(|r| r.as_str()),
                    f.counterparty,
                    f.notional_usd.map(|n| n.to_string()),
                ])?;
            }
        }
        tx.commit().context("Failed to commit fill batch")?;

        debug!(
            table = %self.table,
            batch = self.buffer.len(),
            inserted,
            "fill batch flushed"
        );
        self.written += inserted;
        self.buffer.clear();
        Ok(())
    }
}
