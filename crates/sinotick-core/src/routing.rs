//! Multi-source routing with automatic failover.
//!
//! A [`MultiSourceRouter`] owns an ordered list of named providers for one
//! logical dataset. Each execution walks the list in construction order,
//! validates every returned table against the attached [`ResultContract`]
//! and stops at the first result that passes. Per-provider errors are
//! recovered locally; only total exhaustion reaches the caller, either as a
//! [`RouterError`] (`execute`) or as a structured [`ExecutionResult`]
//! (`execute_with_result`).

use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::adapters::{EastMoneyAdapter, SinaAdapter, TencentAdapter};
use crate::contract::ResultContract;
use crate::http_client::HttpClient;
use crate::provider::{DataSource, HistBarsRequest, RealtimeRequest};
use crate::stats::{ExecutionStats, SourceCounters};
use crate::DataTable;

/// One failed attempt, in attempt order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptFailure {
    pub source: String,
    pub error: String,
}

impl AttemptFailure {
    pub fn new(source: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            error: error.into(),
        }
    }
}

/// Routing errors surfaced to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// Configuration error: raised at construction, never deferred.
    #[error("router requires at least one provider")]
    EmptyProviderList,

    /// Every provider failed; the message lists each source and its reason
    /// in attempt order.
    #[error("{}", exhausted_message(.operation, .failures))]
    Exhausted {
        operation: String,
        failures: Vec<AttemptFailure>,
    },
}

fn exhausted_message(operation: &str, failures: &[AttemptFailure]) -> String {
    let mut message = format!("all data sources failed for '{operation}':");
    for failure in failures {
        message.push_str(&format!("\n  {}: {}", failure.source, failure.error));
    }
    message
}

/// Immutable snapshot of one `execute_with_result` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub data: Option<DataTable>,
    pub source: Option<String>,
    pub error: Option<String>,
    pub attempts: usize,
    pub error_details: Vec<AttemptFailure>,
}

impl ExecutionResult {
    fn succeeded(
        data: DataTable,
        source: String,
        attempts: usize,
        error_details: Vec<AttemptFailure>,
    ) -> Self {
        Self {
            success: true,
            data: Some(data),
            source: Some(source),
            error: None,
            attempts,
            error_details,
        }
    }

    fn exhausted(operation: &str, attempts: usize, error_details: Vec<AttemptFailure>) -> Self {
        Self {
            success: false,
            data: None,
            source: None,
            error: Some(exhausted_message(operation, &error_details)),
            attempts,
            error_details,
        }
    }
}

/// Ordered failover router over named providers of one logical dataset.
///
/// Generic over the provider handle `P` so callers can route over
/// `Arc<dyn DataSource>`, concrete adapters or plain test doubles alike;
/// `execute` takes a closure that invokes the wanted operation on `P`, so
/// arguments are forwarded by capture and no reflection is involved.
///
/// The provider order expresses priority and is never reordered, within a
/// call or across calls.
pub struct MultiSourceRouter<P> {
    providers: Vec<(String, P)>,
    contract: ResultContract,
    stats: Mutex<ExecutionStats>,
}

impl<P> MultiSourceRouter<P> {
    /// Build a router over `providers` in priority order.
    ///
    /// An empty provider list is a configuration error and fails here, not
    /// at execute time.
    pub fn new(
        providers: Vec<(String, P)>,
        contract: ResultContract,
    ) -> Result<Self, RouterError> {
        if providers.is_empty() {
            return Err(RouterError::EmptyProviderList);
        }
        Ok(Self {
            providers,
            contract,
            stats: Mutex::new(ExecutionStats::new()),
        })
    }

    /// Router with the default contract (`min_rows = 1`, no required
    /// columns).
    pub fn with_default_contract(providers: Vec<(String, P)>) -> Result<Self, RouterError> {
        Self::new(providers, ResultContract::default())
    }

    /// Provider names in priority order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers
            .iter()
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn contract(&self) -> &ResultContract {
        &self.contract
    }

    /// Snapshot of the per-source counters accumulated by this instance.
    pub fn get_stats(&self) -> BTreeMap<String, SourceCounters> {
        self.lock_stats().snapshot()
    }

    /// Attempt `invoke` against each provider in order and return the first
    /// validated table.
    ///
    /// `operation` is a diagnostic label only; dispatch happens inside the
    /// closure, which captures whatever arguments the operation needs. Any
    /// error type with a `Display` message is accepted from providers and
    /// treated uniformly.
    ///
    /// # Errors
    ///
    /// [`RouterError::Exhausted`] when every provider failed, listing each
    /// source with its specific reason in attempt order.
    pub fn execute<F, E>(&self, operation: &str, invoke: F) -> Result<DataTable, RouterError>
    where
        F: FnMut(&P) -> Result<DataTable, E>,
        E: Display,
    {
        let outcome = self.execute_with_result(operation, invoke);
        match outcome.data {
            Some(data) if outcome.success => Ok(data),
            _ => Err(RouterError::Exhausted {
                operation: operation.to_owned(),
                failures: outcome.error_details,
            }),
        }
    }

    /// Same attempt/validation/tracking semantics as [`execute`], but total
    /// exhaustion is returned as a value instead of an error; provider
    /// failures never surface as errors from this method.
    ///
    /// [`execute`]: MultiSourceRouter::execute
    pub fn execute_with_result<F, E>(&self, operation: &str, mut invoke: F) -> ExecutionResult
    where
        F: FnMut(&P) -> Result<DataTable, E>,
        E: Display,
    {
        let mut failures: Vec<AttemptFailure> = Vec::new();
        let mut attempts = 0usize;

        for (name, provider) in &self.providers {
            attempts += 1;
            let verdict = match invoke(provider) {
                Ok(table) => match self.contract.validate(&table) {
                    Ok(()) => Ok(table),
                    Err(violation) => Err(violation.to_string()),
                },
                Err(error) => Err(error.to_string()),
            };

            match verdict {
                Ok(table) => {
                    self.lock_stats().record(name, true);
                    if !failures.is_empty() {
                        info!(
                            source = %name,
                            operation,
                            failed_attempts = failures.len(),
                            "fallback source succeeded"
                        );
                    }
                    return ExecutionResult::succeeded(table, name.clone(), attempts, failures);
                }
                Err(reason) => {
                    warn!(source = %name, operation, %reason, "provider attempt failed");
                    self.lock_stats().record(name, false);
                    failures.push(AttemptFailure::new(name.clone(), reason));
                }
            }
        }

        ExecutionResult::exhausted(operation, attempts, failures)
    }

    fn lock_stats(&self) -> MutexGuard<'_, ExecutionStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Default source order and contract for historical bars.
///
/// Tencent comes before Sina because the Sina kline endpoint cannot serve
/// adjusted prices.
pub fn historical_router(
    http_client: Arc<dyn HttpClient>,
) -> Result<MultiSourceRouter<Arc<dyn DataSource>>, RouterError> {
    let contract = ResultContract::new()
        .with_required_columns(["timestamp", "open", "high", "low", "close", "volume"])
        .with_min_rows(1);
    router_over_sources(
        vec![
            Arc::new(EastMoneyAdapter::with_http_client(http_client.clone())),
            Arc::new(TencentAdapter::with_http_client(http_client.clone())),
            Arc::new(SinaAdapter::with_http_client(http_client)),
        ],
        contract,
    )
}

/// Default source order and contract for realtime quotes. Sina is the
/// preferred quote backup; Tencent is the last resort.
pub fn realtime_router(
    http_client: Arc<dyn HttpClient>,
) -> Result<MultiSourceRouter<Arc<dyn DataSource>>, RouterError> {
    let contract = ResultContract::new()
        .with_required_columns(["symbol", "price", "timestamp"])
        .with_min_rows(1);
    router_over_sources(
        vec![
            Arc::new(EastMoneyAdapter::with_http_client(http_client.clone())),
            Arc::new(SinaAdapter::with_http_client(http_client.clone())),
            Arc::new(TencentAdapter::with_http_client(http_client)),
        ],
        contract,
    )
}

fn router_over_sources(
    sources: Vec<Arc<dyn DataSource>>,
    contract: ResultContract,
) -> Result<MultiSourceRouter<Arc<dyn DataSource>>, RouterError> {
    let providers = sources
        .into_iter()
        .map(|source| (source.id().to_owned(), source))
        .collect();
    MultiSourceRouter::new(providers, contract)
}

/// Route a historical-bars request across the default sources.
pub fn route_hist_bars(
    router: &MultiSourceRouter<Arc<dyn DataSource>>,
    req: &HistBarsRequest,
) -> Result<DataTable, RouterError> {
    router.execute("hist_bars", |source| source.hist_bars(req))
}

/// Route a realtime-quotes request across the default sources.
pub fn route_realtime_quotes(
    router: &MultiSourceRouter<Arc<dyn DataSource>>,
    req: &RealtimeRequest,
) -> Result<DataTable, RouterError> {
    router.execute("realtime_quotes", |source| source.realtime_quotes(req))
}
