//! Tencent (gtimg) adapter.
//!
//! Historical bars come from the `web.ifzq.gtimg.cn` fqkline JSON endpoint;
//! realtime quotes from the `qt.gtimg.cn` tilde-separated text endpoint.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use time::macros::format_description;
use time::Date;

use crate::cache::CacheStore;
use crate::http_client::{HttpClient, HttpRequest, NoopHttpClient};
use crate::provider::{Adjust, DataSource, HistBarsRequest, Interval, RealtimeRequest, SourceError};
use crate::{Cell, DataTable};

const HIST_CACHE_TTL: Duration = Duration::from_secs(3_600);

/// Adapter for the Tencent quote/kline endpoints.
#[derive(Clone)]
pub struct TencentAdapter {
    http_client: Arc<dyn HttpClient>,
    cache: CacheStore,
}

impl Default for TencentAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(NoopHttpClient),
            cache: CacheStore::disabled(),
        }
    }
}

impl TencentAdapter {
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
        let response = self
            .http_client
            .execute(HttpRequest::get(url))
            .map_err(|error| {
                if error.retryable() {
                    SourceError::unavailable(format!("tencent transport error: {error}"))
                } else {
                    SourceError::upstream(format!("tencent transport error: {error}"))
                }
            })?;

        if !response.is_success() {
            return Err(SourceError::upstream(format!(
                "tencent upstream returned status {}",
                response.status
            )));
        }

        Ok(response.body)
    }
}

impl DataSource for TencentAdapter {
    fn id(&self) -> &'static str {
        "tencent"
    }

    fn hist_bars(&self, req: &HistBarsRequest) -> Result<DataTable, SourceError> {
        let kind = match req.interval {
            Interval::Day => "day",
            Interval::Week => "week",
            Interval::Month => "month",
            other => {
                return Err(SourceError::unsupported(format!(
                    "tencent fqkline endpoint does not serve '{other}' bars"
                )))
            }
        };
        let fq = match req.adjust {
            Adjust::None => "",
            Adjust::Qfq => "qfq",
            Adjust::Hfq => "hfq",
        };

        let prefixed = req.symbol.prefixed();
        let date_format = format_description!("[year]-[month]-[day]");
        let start = req
            .start_date
            .format(&date_format)
            .map_err(|error| SourceError::invalid_request(error.to_string()))?;
        let end = req
            .end_date
            .format(&date_format)
            .map_err(|error| SourceError::invalid_request(error.to_string()))?;
        let param = format!("{prefixed},{kind},{start},{end},640,{fq}");
        let url = format!(
            "https://web.ifzq.gtimg.cn/appstock/app/fqkline/get?param={}",
            urlencoding::encode(&param),
        );

        let body = self.fetch_body(&url, Some(HIST_CACHE_TTL))?;
        let payload: Value = serde_json::from_str(&body)
            .map_err(|error| SourceError::parse(format!("tencent fqkline payload: {error}")))?;

        // adjusted series live under "qfq_day"/"hfq_day", plain under "day"
        let series = &payload["data"][&prefixed];
        let keyed = format!("{}_{}", fq, kind);
        let rows = [keyed.as_str(), kind]
            .iter()
            .filter_map(|key| series[*key].as_array())
            .next()
            .ok_or_else(|| {
                SourceError::parse(format!(
                    "tencent fqkline payload missing data.{prefixed}.{kind}"
                ))
            })?;

        let mut table = DataTable::new(["timestamp", "open", "high", "low", "close", "volume"])
            .map_err(|error| SourceError::parse(error.to_string()))?;

        for row in rows {
            let fields = row
                .as_array()
                .ok_or_else(|| SourceError::parse("tencent kline row is not an array"))?;
            if fields.len() < 6 {
                return Err(SourceError::parse(format!(
                    "tencent kline row has {} fields, expected 6",
                    fields.len()
                )));
            }
            let day = fields[0]
                .as_str()
                .ok_or_else(|| SourceError::parse("tencent kline date is not a string"))?;
            if !within_range(day, req.start_date, req.end_date)? {
                continue;
            }
            // row order: date, open, close, high, low, volume
            table
                .push_row([
                    Cell::from(day),
                    numeric_cell(&fields[1])?,
                    numeric_cell(&fields[3])?,
                    numeric_cell(&fields[4])?,
                    numeric_cell(&fields[2])?,
                    numeric_cell(&fields[5])?,
                ])
                .map_err(|error| SourceError::parse(error.to_string()))?;
        }

        Ok(table)
    }

    fn realtime_quotes(&self, req: &RealtimeRequest) -> Result<DataTable, SourceError> {
        let list: Vec<String> = req.symbols.iter().map(|symbol| symbol.prefixed()).collect();
        let url = format!("https://qt.gtimg.cn/q={}", list.join(","));
        let body = self.fetch_body(&url, None)?;

        let mut table = DataTable::new(["symbol", "name", "price", "prev_close", "open", "timestamp"])
            .map_err(|error| SourceError::parse(error.to_string()))?;

        for (symbol, line) in req.symbols.iter().zip(body.lines()) {
            let Some(payload) = line.split('"').nth(1) else {
                return Err(SourceError::parse(format!(
                    "tencent quote line for '{symbol}' is not quoted"
                )));
            };
            if payload.is_empty() {
                continue;
            }
            // field order: market flag, name, code, price, prev close, open,
            // ... , timestamp (30) as YYYYMMDDHHMMSS
            let fields: Vec<&str> = payload.split('~').collect();
            if fields.len() < 31 {
                return Err(SourceError::parse(format!(
                    "tencent quote line for '{symbol}' has {} fields, expected 31",
                    fields.len()
                )));
            }
            table
                .push_row([
                    Cell::from(fields[2]),
                    Cell::from(fields[1]),
                    parse_price(fields[3])?,
                    parse_price(fields[4])?,
                    parse_price(fields[5])?,
                    Cell::from(format_tick_time(fields[30])),
                ])
                .map_err(|error| SourceError::parse(error.to_string()))?;
        }

        Ok(table)
    }
}

fn within_range(day: &str, start: Date, end: Date) -> Result<bool, SourceError> {
    let format = format_description!("[year]-[month]-[day]");
    let date = Date::parse(day.get(..10).unwrap_or(day), &format)
        .map_err(|_| SourceError::parse(format!("tencent kline date '{day}'")))?;
    Ok(date >= start && date <= end)
}

fn numeric_cell(value: &Value) -> Result<Cell, SourceError> {
    if let Some(number) = value.as_f64() {
        return Ok(Cell::from(number));
    }
    if let Some(raw) = value.as_str() {
        return raw
            .parse::<f64>()
            .map(Cell::from)
            .map_err(|_| SourceError::parse(format!("tencent numeric field '{raw}'")));
    }
    Err(SourceError::parse(format!(
        "tencent numeric field '{value}'"
    )))
}

fn parse_price(raw: &str) -> Result<Cell, SourceError> {
    raw.parse::<f64>()
        .map(Cell::from)
        .map_err(|_| SourceError::parse(format!("tencent numeric field '{raw}'")))
}

/// `20240102150003` into `2024-01-02 15:00:03`; unknown shapes pass through.
fn format_tick_time(raw: &str) -> String {
    if raw.len() == 14 && raw.bytes().all(|byte| byte.is_ascii_digit()) {
        format!(
            "{}-{}-{} {}:{}:{}",
            &raw[..4],
            &raw[4..6],
            &raw[6..8],
            &raw[8..10],
            &raw[10..12],
            &raw[12..14]
        )
    } else {
        raw.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing::StaticHttpClient;
    use crate::provider::Symbol;
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

    #[test]
    fn hist_bars_read_the_adjusted_series() {
        let body = r#"{"code":0,"data":{"sh600000":{"qfq_day":[
            ["2024-01-02","10.00","10.10","10.20","9.90","123456.0"],
            ["2024-02-01","10.10","10.20","10.30","10.00","98765.0"]
        ]}}}"#;
        let client = Arc::new(StaticHttpClient::ok(body));
        let adapter = TencentAdapter::with_http_client(client.clone());

        let table = adapter.hist_bars(&hist_request(Adjust::Qfq)).expect("parses");
        assert_eq!(
            table.columns(),
            ["timestamp", "open", "high", "low", "close", "volume"]
        );
        // the 2024-02-01 row is outside the requested range
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.cell(0, "close").and_then(Cell::as_f64), Some(10.10));
        assert_eq!(table.cell(0, "high").and_then(Cell::as_f64), Some(10.20));

        let url = &client.requests()[0].url;
        assert!(url.contains("fqkline/get?param=sh600000%2Cday%2C2024-01-01%2C2024-01-31%2C640%2Cqfq"));
    }

    #[test]
    fn hist_bars_fall_back_to_the_plain_series_key() {
        let body = r#"{"code":0,"data":{"sh600000":{"day":[
            ["2024-01-02",10.0,10.1,10.2,9.9,123456.0]
        ]}}}"#;
        let adapter = TencentAdapter::with_http_client(Arc::new(StaticHttpClient::ok(body)));

        let table = adapter.hist_bars(&hist_request(Adjust::None)).expect("parses");
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.cell(0, "volume").and_then(Cell::as_f64), Some(123456.0));
    }

    #[test]
    fn minute_bars_are_unsupported() {
        let adapter = TencentAdapter::default();
        let req = HistBarsRequest::new(
            Symbol::parse("600000").expect("valid symbol"),
            Interval::Minute,
            Adjust::None,
            date!(2024 - 01 - 01),
            date!(2024 - 01 - 31),
        )
        .expect("valid request");

        let error = adapter.hist_bars(&req).expect_err("must fail");
        assert!(error.message().contains("minute"));
    }

    #[test]
    fn realtime_quotes_parse_the_tilde_format() {
        let mut fields = vec!["1", "浦发银行", "600000", "10.10", "9.95", "10.00"];
        fields.extend(std::iter::repeat("0").take(24));
        fields.push("20240102150003");
        let body = format!("v_sh600000=\"{}\";\n", fields.join("~"));

        let adapter = TencentAdapter::with_http_client(Arc::new(StaticHttpClient::ok(body)));
        let req = RealtimeRequest::new(vec![Symbol::parse("600000").expect("valid symbol")])
            .expect("valid request");

        let table = adapter.realtime_quotes(&req).expect("parses");
        assert_eq!(table.cell(0, "symbol").and_then(Cell::as_str), Some("600000"));
        assert_eq!(table.cell(0, "name").and_then(Cell::as_str), Some("浦发银行"));
        assert_eq!(table.cell(0, "price").and_then(Cell::as_f64), Some(10.10));
        assert_eq!(
            table.cell(0, "timestamp").and_then(Cell::as_str),
            Some("2024-01-02 15:00:03")
        );
    }
}
