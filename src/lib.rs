//! Aggregation, normalization and drilldown engine for public budget
//! execution data.
//!
//! A declarative [`AnalyticsFilter`] over execution line items is compiled to
//! parameterized SQL, aggregated per classification pair in DuckDB, normalized
//! (totals, per capita, currency converted, or both) and cached. Aggregated rows
//! can then be regrouped by classification depth for drilldown views.
//!
//! # Quick start
//!
//! ```no_run
//! use budget_analytics::{AccountCategory, AnalyticsFilter, BudgetAnalytics, Period};
//!
//! let analytics = BudgetAnalytics::builder()
//!     .data_dir("/srv/budget/snapshots")
//!     .build()
//!     .unwrap();
//!
//! let mut filter = AnalyticsFilter::new(AccountCategory::Expense, Period::year(2023));
//! filter.functional_prefixes = vec!["65.".to_string()];
//!
//! let page = analytics.get_aggregated_line_items(&filter, Some(20), None).unwrap();
//! println!("{} groups", page.total_count);
//! ```

#[cfg(feature = "async")]
pub mod async_client;
pub mod cache;
pub mod compiler;
pub mod config;
pub mod connection;
pub mod error;
pub mod grouping;
pub mod models;
pub mod normalization;
pub mod queries;
pub mod rates;
pub mod schema;
pub mod sql_builder;

#[cfg(feature = "async")]
pub use async_client::AsyncBudgetAnalytics;
pub use cache::{CacheConfig, CacheStats, ResultCache};
pub use connection::Connection;
pub use error::{AnalyticsError, Result};
pub use grouping::{Dimension, GroupOptions, RootDepth};
pub use models::*;
pub use rates::CurrencyRates;
pub use sql_builder::{SqlBuilder, SqlValue};

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// BudgetAnalyticsBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`BudgetAnalytics`] instance.
///
/// The store is taken from, in order of precedence: an explicit
/// [`connection`](Self::connection), a DuckDB [`database_path`](Self::database_path),
/// or a [`data_dir`](Self::data_dir) of parquet snapshots (the platform data
/// directory when nothing is set).
#[derive(Default)]
pub struct BudgetAnalyticsBuilder {
    data_dir: Option<PathBuf>,
    database_path: Option<PathBuf>,
    connection: Option<Connection>,
    cache: CacheConfig,
    currency_rates: Option<CurrencyRates>,
    currency_rates_file: Option<PathBuf>,
}

impl BudgetAnalyticsBuilder {
    /// Directory holding the parquet snapshots and, optionally, the rates file.
    pub fn data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Open an existing DuckDB database file instead of parquet snapshots.
    pub fn database_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.database_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Use an already opened connection.
    pub fn connection(mut self, conn: Connection) -> Self {
        self.connection = Some(conn);
        self
    }

    /// Maximum number of cached results. Defaults to 1000; 0 disables caching.
    pub fn cache_max_items(mut self, n: usize) -> Self {
        self.cache.max_items = n;
        self
    }

    /// Approximate byte budget of the result cache. Defaults to 64 MiB.
    pub fn cache_max_bytes(mut self, n: usize) -> Self {
        self.cache.max_bytes = n;
        self
    }

    /// Use these conversion rates for currency normalization.
    pub fn currency_rates(mut self, rates: CurrencyRates) -> Self {
        self.currency_rates = Some(rates);
        self
    }

    /// Load conversion rates from a JSON (or `.json.gz`) file.
    pub fn currency_rates_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.currency_rates_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Open the store and load the rate table.
    ///
    /// Without explicit rates, `exchange_rates.json` in the data directory is
    /// used when present; otherwise every year converts at rate 1.
    pub fn build(self) -> Result<BudgetAnalytics> {
        let conn = match (self.connection, &self.database_path) {
            (Some(conn), _) => conn,
            (None, Some(path)) => {
                info!(path = %path.display(), "opening line item database");
                Connection::open(path)?
            }
            (None, None) => {
                let dir = self.data_dir.clone().unwrap_or_else(config::default_data_dir);
                let conn = Connection::open_in_memory()?;
                conn.register_dataset(&dir)?;
                conn
            }
        };

        let rates = match (self.currency_rates, self.currency_rates_file) {
            (Some(rates), _) => rates,
            (None, Some(path)) => CurrencyRates::load(&path)?,
            (None, None) => match self.data_dir.map(|d| d.join(config::RATES_FILE)) {
                Some(path) if path.exists() => CurrencyRates::load(&path)?,
                _ => CurrencyRates::new(),
            },
        };

        Ok(BudgetAnalytics {
            conn,
            cache: Arc::new(ResultCache::new(self.cache)),
            rates: Arc::new(rates),
            national_population: Arc::new(Mutex::new(None)),
        })
    }
}

// ---------------------------------------------------------------------------
// BudgetAnalytics
// ---------------------------------------------------------------------------

/// The main entry point: runs filters through aggregation, normalization and
/// the result cache.
///
/// A handle owns one DuckDB connection and is not `Sync`. Use
/// [`try_clone`](Self::try_clone) to get a handle for another thread; clones
/// share the result cache, the rate table and the memoized national
/// population.
pub struct BudgetAnalytics {
    conn: Connection,
    cache: Arc<ResultCache>,
    rates: Arc<CurrencyRates>,
    national_population: Arc<Mutex<Option<f64>>>,
}

impl BudgetAnalytics {
    /// Create a new builder for configuring the engine.
    pub fn builder() -> BudgetAnalyticsBuilder {
        BudgetAnalyticsBuilder::default()
    }

    /// Another handle on the same database with its own connection.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            conn: self.conn.try_clone()?,
            cache: Arc::clone(&self.cache),
            rates: Arc::clone(&self.rates),
            national_population: Arc::clone(&self.national_population),
        })
    }

    // -- Pipeline ------------------------------------------------------------

    /// Aggregate, normalize and paginate the line items selected by `filter`.
    ///
    /// Results are cached per canonical filter and page. The period is
    /// validated before the store is queried.
    pub fn get_aggregated_line_items(
        &self,
        filter: &AnalyticsFilter,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<AggregateResult> {
        let key = cache::fingerprint(filter, limit, offset)?;
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let raw = self.line_items().aggregate(filter, limit, offset)?;

        let denominator = if filter.normalization.is_per_capita() {
            self.resolve_population_denominator(filter)?
        } else {
            0.0
        };

        let result = normalization::normalize(raw, filter, &self.rates, denominator, limit, offset);
        debug!(
            rows = result.rows.len(),
            total_count = result.total_count,
            normalization = ?filter.normalization,
            "aggregation finished"
        );

        self.cache.set(key, result.clone());
        Ok(result)
    }

    /// Regroup aggregated rows for a drilldown view. Runs in memory.
    pub fn group_items(
        &self,
        rows: &[AggregatedRow],
        filter: &AnalyticsFilter,
        options: &GroupOptions,
    ) -> Vec<GroupedItem> {
        grouping::group_items(rows, filter, options)
    }

    /// Population the filter's amounts are divided by in per-capita modes.
    pub fn resolve_population_denominator(&self, filter: &AnalyticsFilter) -> Result<f64> {
        self.population().resolve(filter)
    }

    // -- Query accessors -----------------------------------------------------

    /// Access the aggregation executor.
    ///
    /// Returns native-currency, un-normalized results and bypasses the cache.
    pub fn line_items(&self) -> queries::LineItemQuery<'_> {
        queries::LineItemQuery::new(&self.conn)
    }

    /// Access the population resolver.
    pub fn population(&self) -> queries::PopulationQuery<'_> {
        queries::PopulationQuery::new(&self.conn).memoized(&self.national_population)
    }

    // -- Metadata and utility methods ----------------------------------------

    /// The shared result cache.
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// The shared currency rate table.
    pub fn rates(&self) -> &CurrencyRates {
        &self.rates
    }

    /// Return the list of registered table and view names.
    pub fn views(&self) -> Vec<String> {
        self.conn.views()
    }

    /// Execute a raw SQL query against the store.
    ///
    /// Placeholders are `$1`, `$2`, ... in the order of `params`.
    pub fn sql(
        &self,
        query: &str,
        params: &[SqlValue],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        self.conn.execute(query, params)
    }

    /// Return a reference to the underlying [`Connection`] for advanced usage.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for BudgetAnalytics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.cache.stats();
        write!(
            f,
            "BudgetAnalytics(views=[{}], rates={} years, cached={})",
            self.conn.views().join(", "),
            self.rates.len(),
            stats.items
        )
    }
}
