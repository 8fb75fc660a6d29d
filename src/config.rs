//! Environment-driven settings for the CLI and the providers it wires up.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use rust_decimal::Decimal;

use crate::backfill::engine::{DEFAULT_AHEAD_SAFETY_MS, DEFAULT_CHUNK_MS, DEFAULT_MAX_EMPTY_CHUNKS};
use crate::backfill::{ChunkPlan, FillCountPolicy, RetryPolicy};
use crate::exchange::DEFAULT_INFO_URL;
use crate::matching::Tolerances;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub info_url: String,
    pub timeout: Duration,
    pub retries: u32,
    pub sleep_cap: Duration,
    pub fill_cap: Option<usize>,
    pub tolerances: Tolerances,
    pub warehouse_db_path: String,
    pub warehouse_table: String,
    pub state_db_path: String,
    pub chunk_ms: i64,
    pub ahead_safety_ms: i64,
    pub max_empty_chunks: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Malformed numbers fall back to their
    /// defaults; malformed tolerances are an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let info_url = lookup("HL_INFO_URL").unwrap_or_else(|| DEFAULT_INFO_URL.to_string());

        let timeout_sec: f64 = lookup("HL_TIMEOUT_SEC")
            .unwrap_or_else(|| "15".to_string())
            .parse()
            .unwrap_or(15.0);

        let retries = lookup("HL_RETRIES")
            .unwrap_or_else(|| "5".to_string())
            .parse()
            .unwrap_or(5);

        let sleep_cap_sec: f64 = lookup("HL_SLEEP_CAP_SEC")
            .unwrap_or_else(|| "5".to_string())
            .parse()
            .unwrap_or(5.0);

        let fill_cap = lookup("HL_FILL_CAP").and_then(|v| v.parse().ok());

        let defaults = Tolerances::default();
        let tolerances = Tolerances {
            px: decimal_var(&lookup, "TOL_PX", defaults.px)?,
            sz: decimal_var(&lookup, "TOL_SZ", defaults.sz)?,
            ts_ms: lookup("TOL_TS_MS")
                .unwrap_or_else(|| "2000".to_string())
                .parse()
                .unwrap_or(defaults.ts_ms),
        };

        let warehouse_db_path =
            lookup("WAREHOUSE_DB_PATH").unwrap_or_else(|| "./warehouse.db".to_string());
        let warehouse_table = lookup("WAREHOUSE_TABLE").unwrap_or_else(|| "trades".to_string());
        let state_db_path =
            lookup("STATE_DB_PATH").unwrap_or_else(|| "./backfill_state.db".to_string());

        let chunk_ms = lookup("BACKFILL_CHUNK_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CHUNK_MS);
        let ahead_safety_ms = lookup("BACKFILL_AHEAD_SAFETY_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_AHEAD_SAFETY_MS);
        let max_empty_chunks = lookup("BACKFILL_MAX_EMPTY_CHUNKS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_EMPTY_CHUNKS);

        Ok(Self {
            info_url,
            timeout: secs(timeout_sec, 15.0),
            retries,
            sleep_cap: secs(sleep_cap_sec, 5.0),
            fill_cap,
            tolerances,
            warehouse_db_path,
            warehouse_table,
            state_db_path,
            chunk_ms,
            ahead_safety_ms,
            max_empty_chunks,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries, self.sleep_cap)
    }

    pub fn fill_count_policy(&self) -> FillCountPolicy {
        FillCountPolicy::new(self.fill_cap)
    }

    pub fn chunk_plan(&self, start_ms: i64) -> ChunkPlan {
        ChunkPlan::new(start_ms)
            .with_chunk_ms(self.chunk_ms)
            .with_ahead_safety_ms(self.ahead_safety_ms)
            .with_max_empty_chunks(self.max_empty_chunks)
    }
}

fn decimal_var(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Decimal,
) -> Result<Decimal> {
    match lookup(key) {
        Some(raw) => Decimal::from_str(raw.trim())
            .or_else(|_| Decimal::from_scientific(raw.trim()))
            .with_context(|| format!("{} is not a decimal: {:?}", key, raw)),
        None => Ok(default),
    }
}

fn secs(value: f64, fallback: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_else(|_| Duration::from_secs_f64(fallback))
}
