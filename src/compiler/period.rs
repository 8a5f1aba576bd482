//! Period selection to row predicates.

use crate::error::Result;
use crate::models::{Period, PeriodLabel, PeriodSelection, PeriodType};
use crate::sql_builder::SqlBuilder;

/// What the period resolver decided besides the emitted predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodScope {
    pub period_type: PeriodType,
    /// Pre-marked aggregate flag emitted as the leading predicate, if any.
    pub bucket_flag: Option<&'static str>,
    /// Per-row amount column for this granularity.
    pub amount_column: &'static str,
}

impl PeriodScope {
    pub fn for_type(period_type: PeriodType) -> Self {
        match period_type {
            PeriodType::Year => Self {
                period_type,
                bucket_flag: Some("eli.is_yearly"),
                amount_column: "eli.ytd_amount",
            },
            PeriodType::Quarter => Self {
                period_type,
                bucket_flag: Some("eli.is_quarterly"),
                amount_column: "eli.quarterly_amount",
            },
            PeriodType::Month => Self {
                period_type,
                bucket_flag: None,
                amount_column: "eli.monthly_amount",
            },
        }
    }
}

/// Validate `period` and append its predicates to `qb`.
///
/// The bucket flag goes first so the store can use it as a leading filter.
/// Nothing is appended when validation fails.
pub fn resolve_period(period: &Period, qb: &mut SqlBuilder) -> Result<PeriodScope> {
    let labels = period.labels()?;
    let scope = PeriodScope::for_type(period.period_type);

    if let Some(flag) = scope.bucket_flag {
        qb.where_raw(format!("{} = TRUE", flag));
    }

    match &period.selection {
        PeriodSelection::Interval { .. } => {
            let (start, end) = (labels[0], labels[1]);
            if start == end {
                let cond = label_equality(qb, start);
                qb.where_raw(cond);
            } else {
                let key = ordinal_expr(period.period_type);
                let lo = qb.bind(start.ordinal());
                let hi = qb.bind(end.ordinal());
                qb.where_raw(format!("{} BETWEEN {} AND {}", key, lo, hi));
            }
        }
        PeriodSelection::Dates(_) => {
            let parts: Vec<String> = labels.iter().map(|l| label_equality(qb, *l)).collect();
            if parts.len() == 1 {
                qb.where_raw(parts[0].clone());
            } else {
                qb.where_raw(format!("({})", parts.join(" OR ")));
            }
        }
    }

    Ok(scope)
}

fn ordinal_expr(period_type: PeriodType) -> &'static str {
    match period_type {
        PeriodType::Year => "eli.year",
        PeriodType::Month => "(eli.year * 100 + eli.month)",
        PeriodType::Quarter => "(eli.year * 10 + eli.quarter)",
    }
}

fn label_equality(qb: &mut SqlBuilder, label: PeriodLabel) -> String {
    let year = qb.bind(label.year());
    match label {
        PeriodLabel::Year(_) => format!("eli.year = {}", year),
        PeriodLabel::Month(_, m) => {
            let month = qb.bind(i64::from(m));
            format!("(eli.year = {} AND eli.month = {})", year, month)
        }
        PeriodLabel::Quarter(_, q) => {
            let quarter = qb.bind(i64::from(q));
            format!("(eli.year = {} AND eli.quarter = {})", year, quarter)
        }
    }
}
