//! EastMoney (push2his / push2) adapter.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::cache::CacheStore;
use crate::http_client::{HttpClient, HttpRequest, NoopHttpClient};
use crate::provider::{Adjust, DataSource, HistBarsRequest, Interval, RealtimeRequest, SourceError};
use crate::{Cell, DataTable};

const HIST_CACHE_TTL: Duration = Duration::from_secs(3_600);
const REALTIME_CACHE_TTL: Duration = Duration::from_secs(60);

/// Adapter for the EastMoney quote/kline endpoints.
#[derive(Clone)]
pub struct EastMoneyAdapter {
    http_client: Arc<dyn HttpClient>,
    cache: CacheStore,
}

impl Default for EastMoneyAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(NoopHttpClient),
            cache: CacheStore::disabled(),
        }
    }
}

impl EastMoneyAdapter {
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

    fn fetch_body(&self, url: &str, ttl: Duration) -> Result<String, SourceError> {
        if let Some(body) = self.cache.get(url) {
            return Ok(body);
        }

        let response = self
            .http_client
            .execute(HttpRequest::get(url))
            .map_err(|error| {
                if error.retryable() {
                    SourceError::unavailable(format!("eastmoney transport error: {error}"))
                } else {
                    SourceError::upstream(format!("eastmoney transport error: {error}"))
                }
            })?;

        if !response.is_success() {
            return Err(SourceError::upstream(format!(
                "eastmoney upstream returned status {}",
                response.status
            )));
        }

        self.cache
            .put(url.to_owned(), response.body.clone(), Some(ttl));
        Ok(response.body)
    }
}

impl DataSource for EastMoneyAdapter {
    fn id(&self) -> &'static str {
        "eastmoney"
    }

    fn hist_bars(&self, req: &HistBarsRequest) -> Result<DataTable, SourceError> {
        let date_format = format_description!("[year][month][day]");
        let beg = req
            .start_date
            .format(&date_format)
            .map_err(|error| SourceError::invalid_request(error.to_string()))?;
        let end = req
            .end_date
            .format(&date_format)
            .map_err(|error| SourceError::invalid_request(error.to_string()))?;

        let url = format!(
            "https://push2his.eastmoney.com/api/qt/stock/kline/get?secid={}&klt={}&fqt={}&beg={}&end={}&fields1=f1,f2,f3,f4,f5,f6&fields2=f51,f52,f53,f54,f55,f56,f57",
            req.symbol.secid(),
            kline_type(req.interval),
            adjust_flag(req.adjust),
            beg,
            end,
        );

        let body = self.fetch_body(&url, HIST_CACHE_TTL)?;
        let payload: KlineResponse = serde_json::from_str(&body)
            .map_err(|error| SourceError::parse(format!("eastmoney kline payload: {error}")))?;
        let klines = payload
            .data
            .and_then(|data| data.klines)
            .ok_or_else(|| SourceError::parse("eastmoney kline payload missing data.klines"))?;

        let mut table = DataTable::new([
            "timestamp", "open", "high", "low", "close", "volume", "amount",
        ])
        .map_err(|error| SourceError::parse(error.to_string()))?;

        for line in &klines {
            // fields2 order: date, open, close, high, low, volume, amount
            let parts: Vec<&str> = line.split(',').collect();
            if parts.len() < 7 {
                return Err(SourceError::parse(format!(
                    "eastmoney kline row has {} fields, expected 7",
                    parts.len()
                )));
            }
            table
                .push_row([
                    Cell::from(parts[0]),
                    parse_price(parts[1])?,
                    parse_price(parts[3])?,
                    parse_price(parts[4])?,
                    parse_price(parts[2])?,
                    parse_volume(parts[5])?,
                    parse_price(parts[6])?,
                ])
                .map_err(|error| SourceError::parse(error.to_string()))?;
        }

        Ok(table)
    }

    fn realtime_quotes(&self, req: &RealtimeRequest) -> Result<DataTable, SourceError> {
        let secids: Vec<String> = req.symbols.iter().map(|symbol| symbol.secid()).collect();
        let url = format!(
            "https://push2.eastmoney.com/api/qt/ulist.np/get?secids={}&fields=f2,f3,f12,f14",
            secids.join(","),
        );

        let body = self.fetch_body(&url, REALTIME_CACHE_TTL)?;
        let payload: UlistResponse = serde_json::from_str(&body)
            .map_err(|error| SourceError::parse(format!("eastmoney ulist payload: {error}")))?;
        let quotes = payload
            .data
            .and_then(|data| data.diff)
            .ok_or_else(|| SourceError::parse("eastmoney ulist payload missing data.diff"))?;

        let as_of = now_rfc3339();
        let mut table = DataTable::new(["symbol", "name", "price", "change_pct", "timestamp"])
            .map_err(|error| SourceError::parse(error.to_string()))?;

        for quote in &quotes {
            // f2/f3 carry two implied decimal places
            table
                .push_row([
                    Cell::from(quote.f12.as_str()),
                    Cell::from(quote.f14.as_str()),
                    quote.f2.map_or(Cell::Null, |value| Cell::from(value / 100.0)),
                    quote.f3.map_or(Cell::Null, |value| Cell::from(value / 100.0)),
                    Cell::from(as_of.as_str()),
                ])
                .map_err(|error| SourceError::parse(error.to_string()))?;
        }

        Ok(table)
    }
}

#[derive(Debug, Deserialize)]
struct KlineResponse {
    data: Option<KlineData>,
}

#[derive(Debug, Deserialize)]
struct KlineData {
    klines: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct UlistResponse {
    data: Option<UlistData>,
}

#[derive(Debug, Deserialize)]
struct UlistData {
    diff: Option<Vec<UlistQuote>>,
}

#[derive(Debug, Deserialize)]
struct UlistQuote {
    #[serde(default)]
    f2: Option<f64>,
    #[serde(default)]
    f3: Option<f64>,
    #[serde(default)]
    f12: String,
    #[serde(default)]
    f14: String,
}

const fn kline_type(interval: Interval) -> u16 {
    match interval {
        Interval::Minute => 1,
        Interval::Hour => 60,
        Interval::Day => 101,
        Interval::Week => 102,
        Interval::Month => 103,
    }
}

const fn adjust_flag(adjust: Adjust) -> u8 {
    match adjust {
        Adjust::None => 0,
        Adjust::Qfq => 1,
        Adjust::Hfq => 2,
    }
}

fn parse_price(raw: &str) -> Result<Cell, SourceError> {
    raw.parse::<f64>()
        .map(Cell::from)
        .map_err(|_| SourceError::parse(format!("eastmoney numeric field '{raw}'")))
}

fn parse_volume(raw: &str) -> Result<Cell, SourceError> {
    if let Ok(value) = raw.parse::<i64>() {
        return Ok(Cell::from(value));
    }
    parse_price(raw)
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
