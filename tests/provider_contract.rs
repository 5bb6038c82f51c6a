//! End-to-end failover across the real provider adapters.
//!
//! Drives the default historical/realtime routers against a keyed transport
//! double, so every attempt goes through real URL construction, payload
//! parsing and contract validation.

use std::sync::Arc;

use sinotick_core::{
    historical_router, realtime_router, route_hist_bars, route_realtime_quotes, Adjust, Cell,
    DataSource, HistBarsRequest, Interval, RealtimeRequest, Symbol,
};
use sinotick_tests::KeyedHttpClient;
use time::macros::date;

fn hist_request(adjust: Adjust) -> HistBarsRequest {
    HistBarsRequest::new(
        Symbol::parse("600000").expect("valid symbol"),
        Interval::Day,
        adjust,
        date!(2024 - 01 - 01),
        date!(2024 - 01 - 31),
    )
    .expect("valid request")
}

fn realtime_request() -> RealtimeRequest {
    RealtimeRequest::new(vec![Symbol::parse("600000").expect("valid symbol")])
        .expect("valid request")
}

const EASTMONEY_KLINES: &str = r#"{"rc":0,"data":{"code":"600000","klines":[
    "2024-01-02,10.00,10.10,10.20,9.90,123456,1250000.5",
    "2024-01-03,10.10,10.05,10.30,10.00,98765,990000.0"
]}}"#;

const TENCENT_QFQ_KLINES: &str = r#"{"code":0,"data":{"sh600000":{"qfq_day":[
    ["2024-01-02","10.00","10.10","10.20","9.90","123456.0"]
]}}}"#;

fn tencent_tick_body() -> String {
    let mut fields = vec!["1", "浦发银行", "600000", "10.10", "9.95", "10.00"];
    fields.extend(std::iter::repeat("0").take(24));
    fields.push("20240102150003");
    format!("v_sh600000=\"{}\";\n", fields.join("~"))
}

#[test]
fn healthy_primary_answers_without_touching_backups() {
    let client = Arc::new(KeyedHttpClient::new().route_ok("push2his", EASTMONEY_KLINES));
    let router = historical_router(client).expect("default sources");

    let table = route_hist_bars(&router, &hist_request(Adjust::Qfq)).expect("primary succeeds");
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.cell(0, "close").and_then(Cell::as_f64), Some(10.10));

    let stats = router.get_stats();
    assert_eq!(stats["eastmoney"].success, 1);
    assert!(!stats.contains_key("tencent"));
    assert!(!stats.contains_key("sina"));
}

#[test]
fn gateway_error_on_primary_fails_over_to_tencent() {
    let client = Arc::new(
        KeyedHttpClient::new()
            .route_status("push2his", 502)
            .route_ok("ifzq.gtimg", TENCENT_QFQ_KLINES),
    );
    let router = historical_router(client).expect("default sources");
    let req = hist_request(Adjust::Qfq);

    let outcome = router.execute_with_result("hist_bars", |source| source.hist_bars(&req));
    assert!(outcome.success);
    assert_eq!(outcome.source.as_deref(), Some("tencent"));
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.error_details.len(), 1);
    assert_eq!(outcome.error_details[0].source, "eastmoney");
    assert!(outcome.error_details[0].error.contains("status 502"));

    let table = outcome.data.expect("table present");
    assert_eq!(
        table.columns(),
        ["timestamp", "open", "high", "low", "close", "volume"]
    );
}

#[test]
fn dead_transport_exhausts_all_sources_in_preference_order() {
    // no routes: every request fails like a dead host
    let client = Arc::new(KeyedHttpClient::new());
    let router = historical_router(client).expect("default sources");

    let error =
        route_hist_bars(&router, &hist_request(Adjust::Qfq)).expect_err("all sources fail");
    let message = error.to_string();
    assert!(message.starts_with("all data sources failed for 'hist_bars':"));

    let positions: Vec<usize> = ["eastmoney:", "tencent:", "sina:"]
        .iter()
        .map(|needle| message.find(needle).expect("listed"))
        .collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    // sina never went on the wire for an adjusted request
    assert!(message.contains("unadjusted"));

    let stats = router.get_stats();
    for source in ["eastmoney", "tencent", "sina"] {
        assert_eq!(stats[source].failure, 1, "{source} counted one failure");
        assert_eq!(stats[source].success, 0);
    }
}

#[test]
fn empty_primary_payload_fails_contract_and_sina_serves_quotes() {
    let sina_body = concat!(
        "var hq_str_sh600000=\"浦发银行,10.00,9.95,10.10,10.20,9.90,",
        "10.09,10.10,123456,1250000.0,100,10.09,200,10.08,300,10.07,",
        "400,10.06,500,10.05,600,10.11,700,10.12,800,10.13,900,10.14,",
        "1000,10.15,2024-01-02,15:00:03,00\";\n",
    );
    let client = Arc::new(
        KeyedHttpClient::new()
            .route_ok("push2.eastmoney", r#"{"data":{"diff":[]}}"#)
            .route_ok("hq.sinajs", sina_body),
    );
    let router = realtime_router(client).expect("default sources");
    let req = realtime_request();

    let outcome =
        router.execute_with_result("realtime_quotes", |source| source.realtime_quotes(&req));
    assert!(outcome.success);
    assert_eq!(outcome.source.as_deref(), Some("sina"));
    assert_eq!(outcome.attempts, 2);
    assert_eq!(
        outcome.error_details,
        vec![sinotick_core::AttemptFailure::new("eastmoney", "empty result")]
    );

    let table = outcome.data.expect("table present");
    assert_eq!(
        table.cell(0, "symbol").and_then(Cell::as_str),
        Some("600000")
    );
    assert_eq!(table.cell(0, "price").and_then(Cell::as_f64), Some(10.10));
    assert_eq!(
        table.cell(0, "timestamp").and_then(Cell::as_str),
        Some("2024-01-02 15:00:03")
    );
}

#[test]
fn realtime_route_helper_reaches_tencent_as_last_resort() {
    let client = Arc::new(
        KeyedHttpClient::new()
            .route_error("push2.eastmoney", "connection reset")
            .route_status("hq.sinajs", 503)
            .route_ok("qt.gtimg", tencent_tick_body()),
    );
    let router = realtime_router(client).expect("default sources");

    let table =
        route_realtime_quotes(&router, &realtime_request()).expect("tencent answers last");
    assert_eq!(table.cell(0, "price").and_then(Cell::as_f64), Some(10.10));
    assert_eq!(
        table.cell(0, "timestamp").and_then(Cell::as_str),
        Some("2024-01-02 15:00:03")
    );

    let stats = router.get_stats();
    assert_eq!(stats["eastmoney"].failure, 1);
    assert_eq!(stats["sina"].failure, 1);
    assert_eq!(stats["tencent"].success, 1);
}

#[test]
fn default_source_orders_are_stable() {
    let client: Arc<dyn sinotick_core::HttpClient> = Arc::new(KeyedHttpClient::new());

    let hist = historical_router(client.clone()).expect("default sources");
    assert_eq!(hist.provider_names(), ["eastmoney", "tencent", "sina"]);

    let realtime = realtime_router(client).expect("default sources");
    assert_eq!(realtime.provider_names(), ["eastmoney", "sina", "tencent"]);
}

#[test]
fn factory_contracts_pin_required_columns() {
    let client: Arc<dyn sinotick_core::HttpClient> = Arc::new(KeyedHttpClient::new());

    let hist = historical_router(client.clone()).expect("default sources");
    let columns: Vec<&str> = hist
        .contract()
        .required_columns()
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(
        columns,
        ["close", "high", "low", "open", "timestamp", "volume"]
    );
    assert_eq!(hist.contract().min_rows(), 1);

    let realtime = realtime_router(client).expect("default sources");
    let columns: Vec<&str> = realtime
        .contract()
        .required_columns()
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(columns, ["price", "symbol", "timestamp"]);
}

#[test]
fn source_ids_are_distinct() {
    let client: Arc<dyn sinotick_core::HttpClient> = Arc::new(KeyedHttpClient::new());
    let sources: Vec<Arc<dyn DataSource>> = vec![
        Arc::new(sinotick_core::EastMoneyAdapter::with_http_client(client.clone())),
        Arc::new(sinotick_core::TencentAdapter::with_http_client(client.clone())),
        Arc::new(sinotick_core::SinaAdapter::with_http_client(client)),
    ];
    let mut ids: Vec<&str> = sources.iter().map(|source| source.id()).collect();
    ids.dedup();
    assert_eq!(ids.len(), 3);
}
