//! Fill reconciliation library.
//!
//! Backfills a wallet's fills from the exchange's time-ordered query API and reconciles them
//! against the internal trade warehouse. The `fill-recon` binary is a thin CLI over this crate.

pub mod backfill;
pub mod compare;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod exchange;
pub mod matching;
pub mod normalize;
pub mod providers;
pub mod sink;
pub mod state;
pub mod verify;

pub use config::AppConfig;
pub use error::BackfillError;
