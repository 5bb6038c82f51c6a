//! Provider contract and request types.
//!
//! Every upstream source implements [`DataSource`]: one explicit method per
//! logical dataset, taking a validated request and returning a normalized
//! [`DataTable`] or a [`SourceError`]. The router depends only on this trait,
//! never on concrete provider types.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{DataTable, ValidationError};

/// Exchange an A-share code trades on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    Shanghai,
    Shenzhen,
    Beijing,
}

impl Exchange {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shanghai => "sh",
            Self::Shenzhen => "sz",
            Self::Beijing => "bj",
        }
    }

    /// Market flag used by EastMoney `secid` parameters.
    pub const fn eastmoney_market(self) -> u8 {
        match self {
            Self::Shanghai => 1,
            Self::Shenzhen | Self::Beijing => 0,
        }
    }
}

impl Display for Exchange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized A-share code: six digits plus the derived exchange.
///
/// Accepts the code formats seen across upstream portals: `600000`,
/// `sh600000` / `SH600000` and `600000.SH`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    code: String,
    exchange: Exchange,
}

impl Symbol {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        let lowered = trimmed.to_ascii_lowercase();
        let (code, explicit) = if let Some(code) = lowered
            .strip_prefix("sh")
            .map(|rest| (rest, Exchange::Shanghai))
            .or_else(|| lowered.strip_prefix("sz").map(|rest| (rest, Exchange::Shenzhen)))
            .or_else(|| lowered.strip_prefix("bj").map(|rest| (rest, Exchange::Beijing)))
        {
            (code.0, Some(code.1))
        } else if let Some((code, suffix)) = lowered.split_once('.') {
            let exchange = match suffix {
                "sh" => Exchange::Shanghai,
                "sz" => Exchange::Shenzhen,
                "bj" => Exchange::Beijing,
                _ => {
                    return Err(ValidationError::InvalidSymbol {
                        value: input.to_owned(),
                    })
                }
            };
            (code, Some(exchange))
        } else {
            (lowered.as_str(), None)
        };

        if code.len() != 6 || !code.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(ValidationError::InvalidSymbol {
                value: input.to_owned(),
            });
        }

        let exchange = match explicit {
            Some(exchange) => exchange,
            None => derive_exchange(code).ok_or_else(|| ValidationError::UnknownExchange {
                value: input.to_owned(),
            })?,
        };

        Ok(Self {
            code: code.to_owned(),
            exchange,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub const fn exchange(&self) -> Exchange {
        self.exchange
    }

    /// Prefixed form used by Sina and Tencent endpoints, e.g. `sh600000`.
    pub fn prefixed(&self) -> String {
        format!("{}{}", self.exchange.as_str(), self.code)
    }

    /// EastMoney `secid` form, e.g. `1.600000`.
    pub fn secid(&self) -> String {
        format!("{}.{}", self.exchange.eastmoney_market(), self.code)
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.code)
    }
}

impl FromStr for Symbol {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

fn derive_exchange(code: &str) -> Option<Exchange> {
    match code.as_bytes().first()? {
        b'6' | b'9' => Some(Exchange::Shanghai),
        b'0' | b'2' | b'3' => Some(Exchange::Shenzhen),
        b'4' | b'8' => Some(Exchange::Beijing),
        _ => None,
    }
}

/// Bar interval for historical data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl Interval {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "minute" => Ok(Self::Minute),
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => Err(ValidationError::InvalidInterval {
                value: other.to_owned(),
            }),
        }
    }
}

/// Price adjustment mode for historical bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Adjust {
    None,
    Qfq,
    Hfq,
}

impl Adjust {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Qfq => "qfq",
            Self::Hfq => "hfq",
        }
    }
}

impl FromStr for Adjust {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "qfq" => Ok(Self::Qfq),
            "hfq" => Ok(Self::Hfq),
            other => Err(ValidationError::InvalidAdjust {
                value: other.to_owned(),
            }),
        }
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    InvalidRequest,
    Upstream,
    Parse,
    Unsupported,
}

/// Structured source error recovered by the router during failover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Upstream,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Parse,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unsupported,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SourceError {}

/// Request payload for historical bars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistBarsRequest {
    pub symbol: Symbol,
    pub interval: Interval,
    pub adjust: Adjust,
    pub start_date: Date,
    pub end_date: Date,
}

impl HistBarsRequest {
    pub fn new(
        symbol: Symbol,
        interval: Interval,
        adjust: Adjust,
        start_date: Date,
        end_date: Date,
    ) -> Result<Self, SourceError> {
        if start_date > end_date {
            return Err(SourceError::invalid_request(format!(
                "start date {start_date} is after end date {end_date}"
            )));
        }
        Ok(Self {
            symbol,
            interval,
            adjust,
            start_date,
            end_date,
        })
    }
}

/// Request payload for realtime quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeRequest {
    pub symbols: Vec<Symbol>,
}

impl RealtimeRequest {
    pub fn new(symbols: Vec<Symbol>) -> Result<Self, SourceError> {
        if symbols.is_empty() {
            return Err(SourceError::invalid_request(
                "realtime request must include at least one symbol",
            ));
        }
        Ok(Self { symbols })
    }
}

/// Source adapter contract.
///
/// One method per logical dataset; each returns the canonical table shape
/// for that dataset. Implementations must be `Send + Sync` so a router can
/// be shared across threads.
pub trait DataSource: Send + Sync {
    /// Stable source identifier, e.g. `"eastmoney"`.
    fn id(&self) -> &'static str;

    /// Historical bars with columns
    /// `timestamp, open, high, low, close, volume`.
    fn hist_bars(&self, req: &HistBarsRequest) -> Result<DataTable, SourceError>;

    /// Realtime quotes with columns `symbol, price, timestamp` (plus
    /// source-specific extras).
    fn realtime_quotes(&self, req: &RealtimeRequest) -> Result<DataTable, SourceError>;
}
