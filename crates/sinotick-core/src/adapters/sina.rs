//! Sina Finance adapter.
//!
//! Historical bars come from the `CN_MarketData.getKLineData` JSON endpoint;
//! realtime quotes from the `hq.sinajs.cn` text endpoint, which requires a
//! Referer header.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use time::macros::format_description;
use time::Date;

use crate::cache::CacheStore;
use crate::columns::standardize_bar_columns;
use crate::http_client::{HttpClient, HttpRequest, NoopHttpClient};
use crate::provider::{Adjust, DataSource, HistBarsRequest, Interval, RealtimeRequest, SourceError};
use crate::{Cell, DataTable};

const HIST_CACHE_TTL: Duration = Duration::from_secs(3_600);
const SINA_REFERER: &str = "https://finance.sina.com.cn";

/// Adapter for the Sina Finance endpoints.
#[derive(Clone)]
pub struct SinaAdapter {
    http_client: Arc<dyn HttpClient>,
    cache: CacheStore,
}

impl Default for SinaAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(NoopHttpClient),
            cache: CacheStore::disabled(),
        }
    }
}

impl SinaAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            ..Self::default()
        }
    }

    pub fn with_cache(mut self, cache: CacheStore) -> Self {
        self.cache = cache;
        self
    }

    fn fetch_body(&self, url: &str, ttl: Option<Duration>) -> Result<String, SourceError> {
        if let Some(ttl) = ttl {
            if let Some(body) = self.cache.get(url) {
                return Ok(body);
            }
            let body = self.execute(url)?;
            self.cache.put(url.to_owned(), body.clone(), Some(ttl));
            return Ok(body);
        }
        self.execute(url)
    }

    fn execute(&self, url: &str) -> Result<String, SourceError> {
        let request = HttpRequest::get(url).with_header("Referer", SINA_REFERER);
        let response = self.http_client.execute(request).map_err(|error| {
            if error.retryable() {
                SourceError::unavailable(format!("sina transport error: {error}"))
            } else {
                SourceError::upstream(format!("sina transport error: {error}"))
            }
        })?;

        if !response.is_success() {
            return Err(SourceError::upstream(format!(
                "sina upstream returned status {}",
                response.status
            )));
        }

        Ok(response.body)
    }
}

impl DataSource for SinaAdapter {
    fn id(&self) -> &'static str {
        "sina"
    }

    fn hist_bars(&self, req: &HistBarsRequest) -> Result<DataTable, SourceError> {
        if req.adjust != Adjust::None {
            return Err(SourceError::unsupported(
                "sina kline endpoint serves unadjusted prices only",
            ));
        }
        let scale = match req.interval {
            Interval::Hour => 60,
            Interval::Day => 240,
            other => {
                return Err(SourceError::unsupported(format!(
                    "sina kline endpoint does not serve '{other}' bars"
                )))
            }
        };

        let url = format!(
            "https://money.finance.sina.com.cn/quotes_service/api/json_v2.php/CN_MarketData.getKLineData?symbol={}&scale={}&ma=no&datalen=1023",
            req.symbol.prefixed(),
            scale,
        );

        let body = self.fetch_body(&url, Some(HIST_CACHE_TTL))?;
        let klines: Vec<SinaKline> = serde_json::from_str(&body)
            .map_err(|error| SourceError::parse(format!("sina kline payload: {error}")))?;

        let mut table =
            DataTable::new(["day", "open", "high", "low", "close", "volume"])
                .map_err(|error| SourceError::parse(error.to_string()))?;

        for kline in &klines {
            if !within_range(&kline.day, req.start_date, req.end_date)? {
                continue;
            }
            table
                .push_row([
                    Cell::from(kline.day.as_str()),
                    parse_price(&kline.open)?,
                    parse_price(&kline.high)?,
                    parse_price(&kline.low)?,
                    parse_price(&kline.close)?,
                    parse_volume(&kline.volume)?,
                ])
                .map_err(|error| SourceError::parse(error.to_string()))?;
        }

        standardize_bar_columns(&mut table);
        Ok(table)
    }

    fn realtime_quotes(&self, req: &RealtimeRequest) -> Result<DataTable, SourceError> {
        let list: Vec<String> = req.symbols.iter().map(|symbol| symbol.prefixed()).collect();
        let url = format!("https://hq.sinajs.cn/list={}", list.join(","));
        let body = self.fetch_body(&url, None)?;

        let mut table = DataTable::new([
            "symbol", "name", "price", "open", "high", "low", "prev_close", "timestamp",
        ])
        .map_err(|error| SourceError::parse(error.to_string()))?;

        for (symbol, line) in req.symbols.iter().zip(body.lines()) {
            let Some(payload) = line.split('"').nth(1) else {
                return Err(SourceError::parse(format!(
                    "sina quote line for '{symbol}' is not quoted"
                )));
            };
            if payload.is_empty() {
                continue;
            }
            // hq.sinajs field order: name, open, prev_close, price, high,
            // low, ... , date (30), time (31)
            let fields: Vec<&str> = payload.split(',').collect();
            if fields.len() < 32 {
                return Err(SourceError::parse(format!(
                    "sina quote line for '{symbol}' has {} fields, expected 32",
                    fields.len()
                )));
            }
            table
                .push_row([
                    Cell::from(symbol.code()),
                    Cell::from(fields[0]),
                    parse_price(fields[3])?,
                    parse_price(fields[1])?,
                    parse_price(fields[4])?,
                    parse_price(fields[5])?,
                    parse_price(fields[2])?,
                    Cell::from(format!("{} {}", fields[30], fields[31])),
                ])
                .map_err(|error| SourceError::parse(error.to_string()))?;
        }

        Ok(table)
    }
}

#[derive(Debug, Deserialize)]
struct SinaKline {
    day: String,
    open: String,
    high: String,
    low: String,
    close: String,
    volume: String,
}

fn within_range(day: &str, start: Date, end: Date) -> Result<bool, SourceError> {
    // hour bars carry "YYYY-MM-DD HH:MM:SS"; the leading 10 bytes are the date
    let date_part = day.get(..10).unwrap_or(day);
    let format = format_description!("[year]-[month]-[day]");
    let date = Date::parse(date_part, &format)
        .map_err(|_| SourceError::parse(format!("sina kline date '{day}'")))?;
    Ok(date >= start && date <= end)
}

fn parse_price(raw: &str) -> Result<Cell, SourceError> {
    raw.parse::<f64>()
        .map(Cell::from)
        .map_err(|_| SourceError::parse(format!("sina numeric field '{raw}'")))
}

fn parse_volume(raw: &str) -> Result<Cell, SourceError> {
    if let Ok(value) = raw.parse::<i64>() {
        return Ok(Cell::from(value));
    }
    parse_price(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing::StaticHttpClient;
    use crate::provider::Symbol;
    use time::macros::date;

    fn hist_request(interval: Interval, adjust: Adjust) -> HistBarsRequest {
        HistBarsRequest::new(
            Symbol::parse("600000").expect("valid symbol"),
            interval,
            adjust,
            date!(2024 - 01 - 01),
            date!(2024 - 01 - 31),
        )
        .expect("valid request")
    }

    #[test]
    fn hist_bars_standardizes_day_column_and_filters_range() {
        let body = r#"[
            {"day":"2023-12-29","open":"9.90","high":"10.00","low":"9.80","close":"9.95","volume":"111111"},
            {"day":"2024-01-02","open":"10.00","high":"10.20","low":"9.90","close":"10.10","volume":"123456"}
        ]"#;
        let client = Arc::new(StaticHttpClient::ok(body));
        let adapter = SinaAdapter::with_http_client(client.clone());

        let table = adapter
            .hist_bars(&hist_request(Interval::Day, Adjust::None))
            .expect("parses");
        assert_eq!(
            table.columns(),
            ["timestamp", "open", "high", "low", "close", "volume"]
        );
        assert_eq!(table.row_count(), 1);
        assert_eq!(
            table.cell(0, "timestamp").and_then(Cell::as_str),
            Some("2024-01-02")
        );

        let request = &client.requests()[0];
        assert!(request.url.contains("symbol=sh600000"));
        assert!(request.url.contains("scale=240"));
        assert_eq!(
            request.headers.get("referer").map(String::as_str),
            Some(SINA_REFERER)
        );
    }

    #[test]
    fn adjusted_and_subdaily_requests_are_unsupported() {
        let adapter = SinaAdapter::default();
        let error = adapter
            .hist_bars(&hist_request(Interval::Day, Adjust::Qfq))
            .expect_err("adjusted unsupported");
        assert!(error.message().contains("unadjusted"));

        let error = adapter
            .hist_bars(&hist_request(Interval::Week, Adjust::None))
            .expect_err("week unsupported");
        assert!(error.message().contains("week"));
    }

    #[test]
    fn realtime_quotes_parse_the_hq_text_format() {
        let body = concat!(
            "var hq_str_sh600000=\"浦发银行,10.00,9.95,10.10,10.20,9.90,",
            "10.09,10.10,123456,1250000.0,100,10.09,200,10.08,300,10.07,",
            "400,10.06,500,10.05,600,10.11,700,10.12,800,10.13,900,10.14,",
            "1000,10.15,2024-01-02,15:00:03,00\";\n",
        );
        let adapter = SinaAdapter::with_http_client(Arc::new(StaticHttpClient::ok(body)));
        let req = RealtimeRequest::new(vec![Symbol::parse("600000").expect("valid symbol")])
            .expect("valid request");

        let table = adapter.realtime_quotes(&req).expect("parses");
        assert_eq!(table.cell(0, "symbol").and_then(Cell::as_str), Some("600000"));
        assert_eq!(table.cell(0, "price").and_then(Cell::as_f64), Some(10.10));
        assert_eq!(table.cell(0, "prev_close").and_then(Cell::as_f64), Some(9.95));
        assert_eq!(
            table.cell(0, "timestamp").and_then(Cell::as_str),
            Some("2024-01-02 15:00:03")
        );
    }

    #[test]
    fn delisted_symbol_yields_an_empty_table() {
        let body = "var hq_str_sh600000=\"\";\n";
        let adapter = SinaAdapter::with_http_client(Arc::new(StaticHttpClient::ok(body)));
        let req = RealtimeRequest::new(vec![Symbol::parse("600000").expect("valid symbol")])
            .expect("valid request");

        let table = adapter.realtime_quotes(&req).expect("parses");
        assert!(table.is_empty());
    }
}
