//! Exchange query API: typed requests, raw wire records and the transport seam.

pub mod models;
pub mod transport;

pub use models::{InfoRequest, RawFill};
pub use transport::{HttpInfoTransport, InfoResponse, InfoTransport, DEFAULT_INFO_URL};
