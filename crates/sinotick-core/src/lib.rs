//! # Sinotick Core
//!
//! Multi-source routing and normalization core for Chinese market data.
//!
//! ## Overview
//!
//! Upstream endpoints for Chinese financial data (EastMoney, Sina, Tencent)
//! are unstable and mutually inconsistent: field names, date formats, code
//! formats and units all differ. This crate unifies them behind one tabular
//! contract and routes each request across the sources with automatic
//! failover:
//!
//! - **[`DataTable`]** is the canonical tabular shape (named columns, rows of
//!   flat scalars) every provider normalizes into
//! - **[`DataSource`]** is the adapter contract concrete providers implement
//! - **[`MultiSourceRouter`]** attempts providers in priority order,
//!   validates each result against a [`ResultContract`] and returns the
//!   first table that passes, or an aggregated failure report
//! - **[`ExecutionResult`]** is the structured, non-failing outcome carrier
//!   for callers that prefer a value over an error
//!
//! ## Quick Start
//!
//! ```rust
//! use sinotick_core::{
//!     Cell, DataTable, MultiSourceRouter, ResultContract, SourceError,
//! };
//!
//! struct Fixed(Result<DataTable, SourceError>);
//!
//! impl Fixed {
//!     fn fetch(&self) -> Result<DataTable, SourceError> {
//!         self.0.clone()
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut bars = DataTable::new(["timestamp", "close"])?;
//!     bars.push_row([Cell::from("2024-01-02"), Cell::from(10.1)])?;
//!
//!     let router = MultiSourceRouter::new(
//!         vec![
//!             ("eastmoney".to_owned(), Fixed(Err(SourceError::unavailable("timeout")))),
//!             ("sina".to_owned(), Fixed(Ok(bars))),
//!         ],
//!         ResultContract::new().with_required_columns(["timestamp", "close"]),
//!     )?;
//!
//!     let table = router.execute("fetch", Fixed::fetch)?;
//!     assert_eq!(table.row_count(), 1);
//!     assert_eq!(router.get_stats()["sina"].success, 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Failure semantics
//!
//! Per-provider errors and contract violations are recovered locally and the
//! scan continues; only total exhaustion reaches the caller. The caller
//! picks the convention: [`MultiSourceRouter::execute`] turns exhaustion
//! into a [`RouterError`] whose message lists every source with its reason,
//! [`MultiSourceRouter::execute_with_result`] returns the same information
//! structurally and never fails for provider reasons.
//!
//! ## Concurrency
//!
//! The router is synchronous and sequential; provider calls block. The only
//! shared mutable state is the per-source statistics map, which is guarded
//! by a mutex so a router instance may be shared across threads.

pub mod adapters;
pub mod cache;
pub mod columns;
pub mod contract;
pub mod error;
pub mod http_client;
pub mod provider;
pub mod routing;
pub mod stats;
pub mod table;

// Re-export commonly used types at crate root for convenience

pub use adapters::{EastMoneyAdapter, SinaAdapter, TencentAdapter};

pub use cache::CacheStore;

pub use contract::{ContractViolation, ResultContract};

pub use error::ValidationError;

pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient, ReqwestHttpClient};

pub use provider::{
    Adjust, DataSource, Exchange, HistBarsRequest, Interval, RealtimeRequest, SourceError,
    SourceErrorKind, Symbol,
};

pub use routing::{
    historical_router, realtime_router, route_hist_bars, route_realtime_quotes, AttemptFailure,
    ExecutionResult, MultiSourceRouter, RouterError,
};

pub use stats::{ExecutionStats, SourceCounters};

pub use table::{Cell, DataTable};
