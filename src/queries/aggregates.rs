//! Grouped aggregation over `execution_line_items`.

use std::collections::HashSet;

use tracing::debug;

use crate::compiler::{compile_filter, CompiledFilter};
use crate::config;
use crate::connection::Connection;
use crate::error::Result;
use crate::models::{AggregateResult, AggregatedRow, AnalyticsFilter};

// ---------------------------------------------------------------------------
// LineItemQuery
// ---------------------------------------------------------------------------

/// Aggregation executor backed by the `execution_line_items` table.
///
/// Amounts are returned in native currency; normalization happens later.
pub struct LineItemQuery<'a> {
    conn: &'a Connection,
}

impl<'a> LineItemQuery<'a> {
    /// Create a new `LineItemQuery` bound to the given connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Sum amounts per `(functional, economic)` classification pair.
    ///
    /// For currency normalization modes the rows are additionally split per
    /// year and returned unsorted and unpaginated, because conversion changes
    /// each group's total; `limit`/`offset` are ignored in that case and
    /// `total_count` is the number of distinct classification pairs.
    /// Otherwise aggregate thresholds, ordering and pagination run in the
    /// store and `total_count` comes from a second count over the grouping.
    pub fn aggregate(
        &self,
        filter: &AnalyticsFilter,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<AggregateResult> {
        let per_year = filter.normalization.is_currency();
        let mut compiled = compile_filter(filter)?;
        shape_grouping(&mut compiled, per_year);

        if per_year {
            let (sql, params) = compiled.builder.build();
            let rows: Vec<AggregatedRow> = self.conn.execute_into(&sql, &params)?;
            let total_count = rows
                .iter()
                .map(|r| (r.functional_code.as_str(), r.economic_code.as_str()))
                .collect::<HashSet<_>>()
                .len();
            debug!(buckets = rows.len(), groups = total_count, "aggregated per year");
            return Ok(AggregateResult { rows, total_count });
        }

        let (count_sql, count_params) = compiled.builder.build_count();

        compiled.builder.order_by(&[
            "\"amount\" DESC",
            "\"functionalCode\" ASC",
            "\"economicCode\" ASC",
        ]);
        if let Some(n) = limit {
            compiled.builder.limit(n);
        }
        if let Some(n) = offset.filter(|&n| n > 0) {
            compiled.builder.offset(n);
        }

        let (sql, params) = compiled.builder.build();
        let rows: Vec<AggregatedRow> = self.conn.execute_into(&sql, &params)?;

        let total_count = self
            .conn
            .execute_scalar(&count_sql, &count_params)?
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as usize;

        debug!(rows = rows.len(), total_count, "aggregated line items");
        Ok(AggregateResult { rows, total_count })
    }
}

/// Add the classification lookups, SELECT list and GROUP BY to a compiled filter.
fn shape_grouping(compiled: &mut CompiledFilter, per_year: bool) {
    let amount = format!(
        "CAST(COALESCE({}, 0) AS DOUBLE) AS \"amount\"",
        compiled.amount_sum()
    );
    let economic_code = format!(
        "COALESCE(eli.economic_code, '{}') AS \"economicCode\"",
        config::UNKNOWN_ECONOMIC_CODE
    );
    let economic_name = format!(
        "CASE WHEN eli.economic_code IS NULL THEN '{}' \
         ELSE COALESCE(ec.economic_name, eli.economic_code) END AS \"economicName\"",
        config::UNKNOWN_ECONOMIC_NAME
    );

    let mut select = vec![
        "eli.functional_code AS \"functionalCode\"",
        "COALESCE(fc.functional_name, eli.functional_code) AS \"functionalName\"",
        economic_code.as_str(),
        economic_name.as_str(),
        amount.as_str(),
        "COUNT(*) AS \"count\"",
    ];
    let mut group = vec![
        "eli.functional_code",
        "fc.functional_name",
        "eli.economic_code",
        "ec.economic_name",
    ];
    if per_year {
        select.push("eli.year AS \"year\"");
        group.push("eli.year");
    }

    compiled
        .builder
        .join(&format!(
            "LEFT JOIN {} fc ON eli.functional_code = fc.functional_code",
            config::FUNCTIONAL_TABLE
        ))
        .join(&format!(
            "LEFT JOIN {} ec ON eli.economic_code = ec.economic_code",
            config::ECONOMIC_TABLE
        ))
        .select(&select)
        .group_by(&group);
}
