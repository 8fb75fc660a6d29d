use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use tracing::{debug, info};

use super::FillProvider;
use crate::db;
use crate::domain::{Fill, TimeWindow};

/// Reads fills from the warehouse trade table.
///
/// Any side other than `A` is read as `B`, and `@` instruments are excluded in SQL.
pub struct WarehouseFillProvider {
    conn: Mutex<Connection>,
    table: String,
}

impl WarehouseFillProvider {
    pub fn open(db_path: &str, table: &str) -> Result<Self> {
        let conn = db::open(db_path)?;
        let provider = Self::with_connection(conn, table)?;
        info!(path = %db_path, table = %table, "warehouse source opened");
        Ok(provider)
    }

    pub fn with_connection(conn: Connection, table: &str) -> Result<Self> {
        let table = db::checked_table_name(table)?.to_string();
        Ok(Self {
            conn: Mutex::new(conn),
            table,
        })
    }

    fn select_sql(&self, with_coin: bool) -> String {
        format!(
            r#"
SELECT wallet,
       coin,
       CASE WHEN side = 'A' THEN 'A' ELSE 'B' END AS side,
       px,
       sz,
       ts_ms,
       hash,
       base_tid,
       trade_id,
       role,
       counterparty,
       notional_usd
FROM {table}
WHERE wallet = ?1
  AND coin NOT LIKE '@%'
  AND ts_ms >= ?2
  AND ts_ms < ?3
  {coin_filter}
ORDER BY ts_ms
"#,
            table = self.table,
            coin_filter = if with_coin { "AND coin = ?4" } else { "" },
        )
    }
}

impl FillProvider for WarehouseFillProvider {
    fn fetch_fills(
        &self,
        wallet: &str,
        window: &TimeWindow,
        coin: Option<&str>,
    ) -> Result<Vec<Fill>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&self.select_sql(coin.is_some()))
            .with_context(|| format!("Failed to prepare warehouse query on {}", self.table))?;

        let (start, end) = (window.start_ms(), window.end_ms());
        let fills = match coin {
            Some(coin) => stmt
                .query_map(params![wallet, start, end, coin], db::fill_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>(),
            None => stmt
                .query_map(params![wallet, start, end], db::fill_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>(),
        }
        .context("Failed to read warehouse fills")?;

        debug!(wallet = %wallet, rows = fills.len(), "warehouse fills loaded");
        Ok(fills)
    }
}
