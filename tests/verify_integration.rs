//! End-to-end verification: a SQLite warehouse on one side, a scripted exchange on the other.

mod common;

use std::str::FromStr;

use rust_decimal::Decimal;

use common::{engine, raw_fill, TimelineTransport};
use fill_recon::backfill::FillCountPolicy;
use fill_recon::domain::{Fill, Role, Side};
use fill_recon::matching::{MatchMode, Tolerances};
use fill_recon::providers::{ExchangeFillProvider, FillProvider, WarehouseFillProvider};
use fill_recon::sink::{FillSink, SqliteFillSink};
use fill_recon::verify::{self, VerifyRequest};

const WALLET: &str = "0xabc";

fn warehouse_fill(coin: &str, side: Side, px: &str, ts_ms: i64, tid: i64) -> Fill {
    let px = Decimal::from_str(px).unwrap();
    let sz = Decimal::from_str("0.5").unwrap();
    Fill {
        wallet: WALLET.to_string(),
        coin: coin.to_string(),
        trade_id: Some(tid * 10 + side.trade_id_suffix()),
        side,
        px,
        sz,
        ts_ms,
        hash: Some(format!("0x{:x}", tid)),
        base_tid: Some(tid),
        role: Some(Role::Taker),
        counterparty: Some("0xcounter".to_string()),
        notional_usd: None,
    }
}

fn seed_warehouse(path: &str) {
    let mut sink = SqliteFillSink::open(path, "trades", 100).unwrap();
    let fills = vec![
        warehouse_fill("BTC", Side::Bid, "100", 1_000, 1),
        warehouse_fill("BTC", Side::Ask, "101", 2_000, 2),
        warehouse_fill("ETH", Side::Bid, "10", 3_000, 3),
        // not on the exchange
        warehouse_fill("ETH", Side::Ask, "10", 4_000, 4),
        warehouse_fill("@107", Side::Bid, "1", 4_500, 5),
        // outside the window
        warehouse_fill("BTC", Side::Bid, "100", 20_000, 6),
    ];
    for fill in fills {
        sink.add(fill).unwrap();
    }
    sink.flush().unwrap();
}

fn exchange() -> ExchangeFillProvider<TimelineTransport> {
    let transport = TimelineTransport::new(
        vec![
            raw_fill("BTC", "B", "100", 1_000, 1),
            // price drifted beyond tolerance
            raw_fill("BTC", "A", "101.5", 2_100, 2),
            raw_fill("ETH", "B", "10", 3_000, 3),
            raw_fill("@107", "B", "1", 4_500, 5),
            // missing from the warehouse
            raw_fill("SOL", "A", "20", 5_000, 7),
        ],
        2,
    );
    ExchangeFillProvider::new(engine(transport, 0), FillCountPolicy::default())
}

fn request(mode: MatchMode, coin: Option<&str>) -> VerifyRequest {
    VerifyRequest {
        wallet: WALLET.to_string(),
        start_ms: 0,
        end_ms: 10_000,
        coin: coin.map(str::to_string),
        mode: Some(mode.as_str().to_string()),
    }
}

#[test]
fn test_verify_fills_mode_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("warehouse.db");
    let path = path.to_str().unwrap();
    seed_warehouse(path);

    let warehouse = WarehouseFillProvider::open(path, "trades").unwrap();
    let response = verify::run(
        &request(MatchMode::Fills, None),
        &warehouse,
        &exchange(),
        Tolerances::default(),
    )
    .unwrap();

    let counts = &response.report.counts;
    assert_eq!(counts.warehouse_rows, 4);
    assert_eq!(counts.exchange_rows, 4);
    assert_eq!(counts.matched, 2);
    assert_eq!(counts.mismatched, 1);
    assert_eq!(counts.only_in_warehouse, 1);
    assert_eq!(counts.only_in_exchange, 1);

    let mismatch = &response.report.mismatched[0];
    assert_eq!(mismatch.warehouse.trade_id, 22);
    assert_eq!(mismatch.deltas.px, Decimal::from_str("-0.5").unwrap());
    assert_eq!(mismatch.deltas.ts_ms, -100);
    assert_eq!(response.report.only_in_warehouse[0].trade_id, 42);
    assert_eq!(response.report.only_in_exchange[0].coin, "SOL");
}

#[test]
fn test_verify_grouped_mode_with_coin_filter() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("warehouse.db");
    let path = path.to_str().unwrap();
    seed_warehouse(path);

    let warehouse = WarehouseFillProvider::open(path, "trades").unwrap();
    let response = verify::run(
        &request(MatchMode::Grouped, Some("BTC")),
        &warehouse,
        &exchange(),
        Tolerances::default(),
    )
    .unwrap();

    // hash, coin and side agree for both BTC legs even though one price drifted
    assert_eq!(response.mode, MatchMode::Grouped);
    assert_eq!(response.report.counts.matched, 2);
    assert!(response.report.is_clean());
}

#[test]
fn test_warehouse_round_trip_keeps_exchange_shape() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("warehouse.db");
    let path = path.to_str().unwrap();
    seed_warehouse(path);

    let warehouse = WarehouseFillProvider::open(path, "trades").unwrap();
    let window = fill_recon::domain::TimeWindow::new(0, 10_000).unwrap();
    let fills = warehouse.fetch_fills(WALLET, &window, None).unwrap();

    assert_eq!(fills.len(), 4);
    assert!(fills.iter().all(|f| !f.coin.starts_with('@')));
    assert_eq!(fills[0].counterparty.as_deref(), Some("0xcounter"));
    assert_eq!(fills[1].side, Side::Ask);
}
