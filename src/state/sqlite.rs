use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use super::StateRepository;
use crate::db;
use crate::domain::WalletState;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS wallet_backfill_state (
    wallet_id INTEGER PRIMARY KEY,
    next_start_ms INTEGER,
    finished INTEGER NOT NULL DEFAULT 0,
    updated_at INTEGER NOT NULL
);
"#;

pub struct SqliteStateRepository {
    conn: Mutex<Connection>,
}

impl SqliteStateRepository {
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = db::open(db_path)?;
        Self::with_connection(conn)
    }

    pub fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to initialize backfill state schema")?;

        let wallets: i64 = conn
            .query_row("SELECT COUNT(*) FROM wallet_backfill_state", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);
        info!("Backfill state store ready ({} wallets tracked)", wallets);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl StateRepository for SqliteStateRepository {
    fn load(&self, wallet_id: i64) -> Result<WalletState> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT next_start_ms, finished FROM wallet_backfill_state WHERE wallet_id = ?1",
                params![wallet_id],
                |row| Ok((row.get::<_, Option<i64>>(0)?, row.get::<_, bool>(1)?)),
            )
            .optional()
            .with_context(|| format!("Failed to load state for wallet {}", wallet_id))?;

        Ok(match row {
            Some((next_start_ms, finished)) => WalletState {
                wallet_id,
                next_start_ms,
                finished,
            },
            None => WalletState::fresh(wallet_id),
        })
    }

    fn save(&self, wallet_id: i64, next_start_ms: i64, finished: bool) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        self.conn
            .lock()
            .execute(
                "INSERT INTO wallet_backfill_state (wallet_id, next_start_ms, finished, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(wallet_id) DO UPDATE SET
                    next_start_ms = excluded.next_start_ms,
                    finished = excluded.finished,
                    updated_at = excluded.updated_at",
                params![wallet_id, next_start_ms, finished, now],
            )
            .with_context(|| format!("Failed to save state for wallet {}", wallet_id))?;
        Ok(())
    }
}
