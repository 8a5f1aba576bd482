//! Async wrapper around [`BudgetAnalytics`] for use in async runtimes (Tokio, etc.).
//!
//! Every call runs on the blocking thread pool via
//! [`tokio::task::spawn_blocking`] with its own cloned handle, so concurrent
//! calls use separate DuckDB connections. An optional timeout bounds each
//! call; when it fires, or when the returned future is dropped, the caller
//! stops waiting and the result is discarded.
//!
//! # Example
//!
//! ```no_run
//! use budget_analytics::{AccountCategory, AnalyticsFilter, AsyncBudgetAnalytics, Period};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let analytics = AsyncBudgetAnalytics::builder()
//!         .data_dir("/srv/budget/snapshots")
//!         .query_timeout(Duration::from_secs(30))
//!         .build()
//!         .await
//!         .unwrap();
//!
//!     let filter = AnalyticsFilter::new(AccountCategory::Expense, Period::year(2023));
//!     let page = analytics
//!         .get_aggregated_line_items(filter, Some(20), None)
//!         .await
//!         .unwrap();
//! }
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{AnalyticsError, Result};
use crate::grouping::GroupOptions;
use crate::models::{AggregateResult, AggregatedRow, AnalyticsFilter, GroupedItem};
use crate::rates::CurrencyRates;
use crate::{BudgetAnalytics, BudgetAnalyticsBuilder};

// ---------------------------------------------------------------------------
// AsyncBudgetAnalyticsBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing an [`AsyncBudgetAnalytics`] instance.
#[derive(Default)]
pub struct AsyncBudgetAnalyticsBuilder {
    inner: BudgetAnalyticsBuilder,
    query_timeout: Option<Duration>,
}

impl AsyncBudgetAnalyticsBuilder {
    /// See [`BudgetAnalyticsBuilder::data_dir`].
    pub fn data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.inner = self.inner.data_dir(path);
        self
    }

    /// See [`BudgetAnalyticsBuilder::database_path`].
    pub fn database_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.inner = self.inner.database_path(path);
        self
    }

    pub fn cache_max_items(mut self, n: usize) -> Self {
        self.inner = self.inner.cache_max_items(n);
        self
    }

    pub fn cache_max_bytes(mut self, n: usize) -> Self {
        self.inner = self.inner.cache_max_bytes(n);
        self
    }

    pub fn currency_rates(mut self, rates: CurrencyRates) -> Self {
        self.inner = self.inner.currency_rates(rates);
        self
    }

    pub fn currency_rates_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.inner = self.inner.currency_rates_file(path);
        self
    }

    /// Upper bound on each call. No timeout by default.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    /// Build the engine on the blocking thread pool.
    pub async fn build(self) -> Result<AsyncBudgetAnalytics> {
        let query_timeout = self.query_timeout;
        let inner = self.inner;
        let analytics = tokio::task::spawn_blocking(move || inner.build())
            .await
            .map_err(|e| AnalyticsError::Task(format!("task join error: {e}")))??;
        Ok(AsyncBudgetAnalytics::new(analytics).with_timeout(query_timeout))
    }
}

// ---------------------------------------------------------------------------
// AsyncBudgetAnalytics
// ---------------------------------------------------------------------------

/// Async wrapper around [`BudgetAnalytics`].
///
/// Cloning is cheap; clones share the underlying engine, its cache and the
/// timeout.
#[derive(Clone)]
pub struct AsyncBudgetAnalytics {
    inner: Arc<Mutex<BudgetAnalytics>>,
    query_timeout: Option<Duration>,
}

impl AsyncBudgetAnalytics {
    /// Create a new builder for configuring the async engine.
    pub fn builder() -> AsyncBudgetAnalyticsBuilder {
        AsyncBudgetAnalyticsBuilder::default()
    }

    /// Wrap an existing engine.
    pub fn new(analytics: BudgetAnalytics) -> Self {
        Self {
            inner: Arc::new(Mutex::new(analytics)),
            query_timeout: None,
        }
    }

    /// Bound every call by `timeout` (`None` waits indefinitely).
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Run a sync operation on the blocking thread pool.
    ///
    /// The closure receives a handle with its own connection; the shared
    /// engine is only locked while that handle is cloned. Fails with
    /// [`AnalyticsError::Timeout`] when the configured timeout elapses first.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&BudgetAnalytics) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let shared = Arc::clone(&self.inner);
        let task = tokio::task::spawn_blocking(move || {
            let handle = shared.lock().try_clone()?;
            f(&handle)
        });

        let joined = match self.query_timeout {
            Some(limit) => tokio::time::timeout(limit, task)
                .await
                .map_err(|_| AnalyticsError::Timeout(limit))?,
            None => task.await,
        };
        joined.map_err(|e| AnalyticsError::Task(format!("task join error: {e}")))?
    }

    /// Async mirror of [`BudgetAnalytics::get_aggregated_line_items`].
    pub async fn get_aggregated_line_items(
        &self,
        filter: AnalyticsFilter,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<AggregateResult> {
        self.run(move |a| a.get_aggregated_line_items(&filter, limit, offset))
            .await
    }

    /// Async mirror of [`BudgetAnalytics::resolve_population_denominator`].
    pub async fn resolve_population_denominator(&self, filter: AnalyticsFilter) -> Result<f64> {
        self.run(move |a| a.resolve_population_denominator(&filter))
            .await
    }

    /// Async mirror of [`BudgetAnalytics::group_items`].
    pub async fn group_items(
        &self,
        rows: Vec<AggregatedRow>,
        filter: AnalyticsFilter,
        options: GroupOptions,
    ) -> Result<Vec<GroupedItem>> {
        self.run(move |a| Ok(a.group_items(&rows, &filter, &options)))
            .await
    }
}
