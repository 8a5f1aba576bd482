//! Presentation transforms over aggregated rows.
//!
//! `total` and `per_capita` results arrive from the store already thresholded,
//! sorted and paginated; only the per-capita division happens here. Currency
//! modes receive per-year buckets, which are converted, re-aggregated per
//! classification pair and then thresholded, sorted and paginated in memory.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::debug;

use crate::models::{AggregateResult, AggregatedRow, AnalyticsFilter};
use crate::rates::CurrencyRates;

/// Divide every per-year bucket by its year's rate and fold the buckets of
/// each `(functional, economic)` pair into one row.
///
/// Rows without a year convert at rate 1. First-seen order is preserved.
pub fn convert_currency(rows: Vec<AggregatedRow>, rates: &CurrencyRates) -> Vec<AggregatedRow> {
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut out: Vec<AggregatedRow> = Vec::new();

    for row in rows {
        let rate = row.year.map_or(1.0, |y| rates.rate(y));
        let converted = row.amount / rate;
        let key = (row.functional_code.clone(), row.economic_code.clone());

        match index.get(&key) {
            Some(&i) => {
                out[i].amount += converted;
                out[i].count += row.count;
            }
            None => {
                index.insert(key, out.len());
                out.push(AggregatedRow {
                    amount: converted,
                    year: None,
                    ..row
                });
            }
        }
    }

    out
}

/// Divide amounts by `denominator`. A zero (or unusable) denominator leaves
/// the amounts unchanged.
pub fn apply_per_capita(rows: &mut [AggregatedRow], denominator: f64) {
    if denominator == 0.0 || !denominator.is_finite() {
        debug!(denominator, "per-capita skipped");
        return;
    }
    for row in rows.iter_mut() {
        row.amount /= denominator;
    }
}

/// Keep rows whose amount lies within the filter's aggregate bounds.
pub fn apply_aggregate_thresholds(rows: &mut Vec<AggregatedRow>, filter: &AnalyticsFilter) {
    let (min, max) = (filter.aggregate_min_amount, filter.aggregate_max_amount);
    if min.is_none() && max.is_none() {
        return;
    }
    rows.retain(|r| min.map_or(true, |m| r.amount >= m) && max.map_or(true, |m| r.amount <= m));
}

/// Amount descending, then functional and economic code ascending.
pub fn sort_rows(rows: &mut [AggregatedRow]) {
    rows.sort_by(compare_rows);
}

fn compare_rows(a: &AggregatedRow, b: &AggregatedRow) -> Ordering {
    b.amount
        .total_cmp(&a.amount)
        .then_with(|| a.functional_code.cmp(&b.functional_code))
        .then_with(|| a.economic_code.cmp(&b.economic_code))
}

/// Slice a page out of `rows`. No limit means every row after `offset`.
pub fn paginate(rows: Vec<AggregatedRow>, limit: Option<usize>, offset: Option<usize>) -> Vec<AggregatedRow> {
    let skip = offset.unwrap_or(0);
    let take = limit.unwrap_or(usize::MAX);
    rows.into_iter().skip(skip).take(take).collect()
}

/// Run the normalization pipeline over the executor's output.
///
/// `denominator` is only consulted for per-capita modes. For currency modes
/// `total_count` is recomputed after thresholds; otherwise the executor's
/// count is kept.
pub fn normalize(
    raw: AggregateResult,
    filter: &AnalyticsFilter,
    rates: &CurrencyRates,
    denominator: f64,
    limit: Option<usize>,
    offset: Option<usize>,
) -> AggregateResult {
    let mode = filter.normalization;

    if !mode.is_currency() {
        let mut rows = raw.rows;
        if mode.is_per_capita() {
            apply_per_capita(&mut rows, denominator);
        }
        return AggregateResult {
            rows,
            total_count: raw.total_count,
        };
    }

    let mut rows = convert_currency(raw.rows, rates);
    if mode.is_per_capita() {
        apply_per_capita(&mut rows, denominator);
    }
    apply_aggregate_thresholds(&mut rows, filter);
    sort_rows(&mut rows);

    let total_count = rows.len();
    let rows = paginate(rows, limit, offset);
    debug!(total_count, page = rows.len(), "normalized currency rows");

    AggregateResult { rows, total_count }
}
