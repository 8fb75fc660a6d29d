//! Shared SQLite plumbing for the state store, the fill sink and the warehouse reader.

use std::str::FromStr;

use anyhow::{bail, Context, Result};
use rusqlite::types::{FromSqlError, ValueRef};
use rusqlite::{Connection, OpenFlags, Row};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::domain::{Fill, Role, Side};

/// Column list shared by the fill table writer and the warehouse query.
pub const FILL_COLUMNS: &str =
    "wallet, coin, side, px, sz, ts_ms, hash, base_tid, trade_id, role, counterparty, notional_usd";

/// Opens (or creates) a database file with the pragmas every store here relies on.
pub fn open(path: &str) -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;

    let conn = Connection::open_with_flags(path, flags)
        .with_context(|| format!("Failed to open database at {}", path))?;

    let journal_mode: String = conn
        .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
        .unwrap_or_default();
    if path != ":memory:" && journal_mode.to_lowercase() != "wal" {
        warn!("WAL mode not active, journal_mode = {}", journal_mode);
    }
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("Failed to set synchronous pragma")?;

    debug!(path = %path, "database opened");
    Ok(conn)
}

/// Table names are interpolated into SQL, so only plain (optionally schema-qualified)
/// identifiers are accepted.
pub fn checked_table_name(name: &str) -> Result<&str> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if !valid {
        bail!("invalid table name: {:?}", name);
    }
    Ok(name)
}

pub fn create_fill_table(conn: &Connection, table: &str) -> Result<()> {
    let table = checked_table_name(table)?;
    let sql = format!(
        r#"
CREATE TABLE IF NOT EXISTS {table} (
    fill_key TEXT PRIMARY KEY,
    wallet TEXT NOT NULL,
    coin TEXT NOT NULL,
    side TEXT NOT NULL,
    px TEXT NOT NULL,
    sz TEXT NOT NULL,
    ts_ms INTEGER NOT NULL,
    hash TEXT,
    base_tid INTEGER,
    trade_id INTEGER,
    role TEXT,
    counterparty TEXT,
    notional_usd TEXT
);

CREATE INDEX IF NOT EXISTS idx_{index}_wallet_ts ON {table}(wallet, ts_ms);
"#,
        table = table,
        index = table.replace('.', "_"),
    );
    conn.execute_batch(&sql)
        .with_context(|| format!("Failed to create fill table {}", table))
}

/// Idempotency key for a stored fill: the derived trade id when known, otherwise the
/// full identifying tuple.
pub fn fill_key(fill: &Fill) -> String {
    match fill.trade_id {
        Some(trade_id) => format!("{}:{}", fill.wallet, trade_id),
        None => format!(
            "{}:{}:{}:{}:{}:{}:{}",
            fill.wallet,
            fill.coin,
            fill.side,
            fill.ts_ms,
            fill.hash.as_deref().unwrap_or(""),
            fill.px.normalize(),
            fill.sz.normalize()
        ),
    }
}

/// Reads a decimal stored as TEXT, INTEGER or REAL.
pub fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let value = row.get_ref(idx)?;
    let parsed = match value {
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map_err(|e| FromSqlError::Other(Box::new(e)))
            .and_then(|s| {
                Decimal::from_str(s.trim())
                    .or_else(|_| Decimal::from_scientific(s.trim()))
                    .map_err(|e| FromSqlError::Other(Box::new(e)))
            }),
        ValueRef::Integer(i) => Ok(Decimal::from(i)),
        ValueRef::Real(f) => Decimal::from_str(&f.to_string())
            .map_err(|e| FromSqlError::Other(Box::new(e))),
        _ => Err(FromSqlError::InvalidType),
    };
    parsed.map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, value.data_type(), Box::new(e))
    })
}

fn optional_decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    match row.get_ref(idx)? {
        ValueRef::Null => Ok(None),
        _ => decimal_at(row, idx).map(Some),
    }
}

/// Maps a row selected with [`FILL_COLUMNS`] into a [`Fill`].
pub fn fill_from_row(row: &Row<'_>) -> rusqlite::Result<Fill> {
    let side: String = row.get(2)?;
    let role: Option<String> = row.get(9)?;
    Ok(Fill {
        wallet: row.get(0)?,
        coin: row.get(1)?,
        side: Side::parse(&side),
        px: decimal_at(row, 3)?,
        sz: decimal_at(row, 4)?,
        ts_ms: row.get(5)?,
        hash: row.get(6)?,
        base_tid: row.get(7)?,
        trade_id: row.get(8)?,
        role: role.as_deref().and_then(Role::parse),
        counterparty: row.get(10)?,
        notional_usd: optional_decimal_at(row, 11)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_table_name() {
        assert!(checked_table_name("trades").is_ok());
        assert!(checked_table_name("analytics.trades_v2").is_ok());
        assert!(checked_table_name("").is_err());
        assert!(checked_table_name("1trades").is_err());
        assert!(checked_table_name("trades; DROP TABLE x").is_err());
    }

    #[test]
    fn test_create_fill_table_is_idempotent() {
        let conn = open(":memory:").unwrap();
        create_fill_table(&conn, "fills").unwrap();
        create_fill_table(&conn, "fills").unwrap();
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM fills", [], |row| row.get(0))
            .unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn test_decimal_at_reads_all_storage_classes() {
        let conn = open(":memory:").unwrap();
        let (text, int, real): (Decimal, Decimal, Decimal) = conn
            .query_row("SELECT '100.123456789', 42, 0.5", [], |row| {
                Ok((decimal_at(row, 0)?, decimal_at(row, 1)?, decimal_at(row, 2)?))
            })
            .unwrap();
        assert_eq!(text.to_string(), "100.123456789");
        assert_eq!(int, Decimal::from(42));
        assert_eq!(real.to_string(), "0.5");
    }
}
