//! Filter compiler: turns an [`AnalyticsFilter`] into parameterized predicates.
//!
//! Compilation is split in two independent passes. [`JoinRequirements::analyze`]
//! decides which lookup tables are needed; [`compile_filter`] then emits the
//! predicates into a [`SqlBuilder`] whose FROM clause already carries those
//! joins. Callers add the SELECT list, grouping, ordering and pagination.

pub mod joins;
pub mod period;

pub use joins::JoinRequirements;
pub use period::{resolve_period, PeriodScope};

use crate::config;
use crate::error::Result;
use crate::models::AnalyticsFilter;
use crate::sql_builder::SqlBuilder;

/// Output of [`compile_filter`].
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    /// FROM + JOIN + WHERE (+ HAVING unless deferred) over `execution_line_items eli`.
    pub builder: SqlBuilder,
    pub joins: JoinRequirements,
    pub period: PeriodScope,
    /// True when aggregate thresholds must be applied after normalization.
    pub thresholds_deferred: bool,
}

impl CompiledFilter {
    /// `SUM(..)` over the period's amount column.
    pub fn amount_sum(&self) -> String {
        format!("SUM({})", self.period.amount_column)
    }
}

/// Compile `filter` into predicates and bound values.
///
/// Fails with `InvalidPeriod` before anything is emitted when the period
/// labels are malformed.
pub fn compile_filter(filter: &AnalyticsFilter) -> Result<CompiledFilter> {
    let joins = JoinRequirements::analyze(filter);

    let mut qb = SqlBuilder::new(&format!("{} eli", config::LINE_ITEMS_TABLE));
    for clause in joins.clauses() {
        qb.join(clause);
    }

    let period = resolve_period(&filter.period, &mut qb)?;
    let amount = period.amount_column;

    qb.where_eq("eli.account_category", filter.account_category.as_str());

    if let Some(ref rt) = filter.report_type {
        qb.where_eq("eli.report_type", rt.as_str());
    }
    if let Some(ref cui) = filter.main_creditor_cui {
        qb.where_eq("eli.main_creditor_cui", cui.as_str());
    }

    // -- entity / territorial scope ----------------------------------------
    if !filter.entity_cuis.is_empty() {
        qb.where_in("eli.entity_cui", &filter.entity_cuis);
    }
    if !filter.uat_ids.is_empty() {
        qb.where_in("e.uat_id", &filter.uat_ids);
    }
    if !filter.county_codes.is_empty() {
        qb.where_in("u.county_code", &filter.county_codes);
    }
    if let Some(is_uat) = filter.is_uat {
        qb.where_eq("e.is_uat", is_uat);
    }
    if let Some(min) = filter.min_population {
        qb.where_gte("u.population", min);
    }
    if let Some(max) = filter.max_population {
        qb.where_lte("u.population", max);
    }
    if !filter.entity_types.is_empty() {
        qb.where_in("e.entity_type", &filter.entity_types);
    }
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        qb.where_contains("e.name", term);
    }

    // -- classifications ---------------------------------------------------
    if !filter.functional_codes.is_empty() {
        qb.where_in("eli.functional_code", &filter.functional_codes);
    }
    if !filter.functional_prefixes.is_empty() {
        qb.where_any_prefix("eli.functional_code", &filter.functional_prefixes);
    }
    if !filter.economic_codes.is_empty() {
        qb.where_in("eli.economic_code", &filter.economic_codes);
    }
    if !filter.economic_prefixes.is_empty() {
        qb.where_any_prefix("eli.economic_code", &filter.economic_prefixes);
    }

    // -- other dimensions --------------------------------------------------
    if !filter.funding_source_ids.is_empty() {
        qb.where_in("eli.funding_source_id", &filter.funding_source_ids);
    }
    if !filter.budget_sector_ids.is_empty() {
        qb.where_in("eli.budget_sector_id", &filter.budget_sector_ids);
    }
    if !filter.program_codes.is_empty() {
        qb.where_in("eli.program_code", &filter.program_codes);
    }
    if !filter.expense_types.is_empty() {
        let kinds: Vec<&str> = filter.expense_types.iter().map(|t| t.as_str()).collect();
        qb.where_in("eli.expense_type", &kinds);
    }

    // -- per-item thresholds -----------------------------------------------
    if let Some(min) = filter.item_min_amount {
        qb.where_gte(amount, min);
    }
    if let Some(max) = filter.item_max_amount {
        qb.where_lte(amount, max);
    }

    // -- exclusions --------------------------------------------------------
    let ex = &filter.exclude;
    qb.where_not_in("eli.entity_cui", &ex.entity_cuis);
    qb.where_not_in("eli.main_creditor_cui", &ex.main_creditor_cuis);
    qb.where_not_in("e.uat_id", &ex.uat_ids);
    qb.where_not_in("u.county_code", &ex.county_codes);
    qb.where_not_in("e.entity_type", &ex.entity_types);
    qb.where_not_in("eli.functional_code", &ex.functional_codes);
    qb.where_no_prefix("eli.functional_code", &ex.functional_prefixes);
    qb.where_not_in("eli.economic_code", &ex.economic_codes);
    qb.where_no_prefix("eli.economic_code", &ex.economic_prefixes);
    qb.where_not_in("eli.funding_source_id", &ex.funding_source_ids);
    qb.where_not_in("eli.budget_sector_id", &ex.budget_sector_ids);
    qb.where_not_in("eli.program_code", &ex.program_codes);
    let excluded_kinds: Vec<&str> = ex.expense_types.iter().map(|t| t.as_str()).collect();
    qb.where_not_in("eli.expense_type", &excluded_kinds);

    // -- aggregate thresholds ----------------------------------------------
    let thresholds_deferred = filter.normalization.is_currency();
    if !thresholds_deferred {
        if let Some(min) = filter.aggregate_min_amount {
            let p = qb.bind(min);
            qb.having_raw(format!("SUM({}) >= {}", amount, p));
        }
        if let Some(max) = filter.aggregate_max_amount {
            let p = qb.bind(max);
            qb.having_raw(format!("SUM({}) <= {}", amount, p));
        }
    }

    Ok(CompiledFilter {
        builder: qb,
        joins,
        period,
        thresholds_deferred,
    })
}
