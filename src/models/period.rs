use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};

// ---------------------------------------------------------------------------
// Period
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PeriodType {
    Year,
    Month,
    Quarter,
}

/// Which reporting periods are selected. Exactly one form is ever present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodSelection {
    Interval { start: String, end: String },
    Dates(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    #[serde(rename = "type")]
    pub period_type: PeriodType,
    pub selection: PeriodSelection,
}

impl Period {
    /// A single year, e.g. `Period::year(2023)`.
    pub fn year(year: i32) -> Self {
        Self::interval(PeriodType::Year, &year.to_string(), &year.to_string())
    }

    /// An inclusive interval of labels of the given type.
    pub fn interval(period_type: PeriodType, start: &str, end: &str) -> Self {
        Self {
            period_type,
            selection: PeriodSelection::Interval {
                start: start.to_string(),
                end: end.to_string(),
            },
        }
    }

    /// An explicit list of labels of the given type.
    pub fn dates(period_type: PeriodType, labels: &[&str]) -> Self {
        Self {
            period_type,
            selection: PeriodSelection::Dates(labels.iter().map(|l| l.to_string()).collect()),
        }
    }

    /// Parse the interval bounds or the date list.
    ///
    /// For intervals the result is `[start, end]`; fails if either label does
    /// not match the period type or if `start > end`.
    pub fn labels(&self) -> Result<Vec<PeriodLabel>> {
        match &self.selection {
            PeriodSelection::Interval { start, end } => {
                let s = PeriodLabel::parse(self.period_type, start)?;
                let e = PeriodLabel::parse(self.period_type, end)?;
                if s > e {
                    return Err(AnalyticsError::InvalidPeriod(format!(
                        "interval start {} is after end {}",
                        start, end
                    )));
                }
                Ok(vec![s, e])
            }
            PeriodSelection::Dates(dates) => {
                if dates.is_empty() {
                    return Err(AnalyticsError::InvalidPeriod(
                        "dates selection is empty".to_string(),
                    ));
                }
                dates
                    .iter()
                    .map(|d| PeriodLabel::parse(self.period_type, d))
                    .collect()
            }
        }
    }

    /// Every calendar year the period touches, ascending and distinct.
    pub fn years(&self) -> Result<Vec<i32>> {
        let labels = self.labels()?;
        let mut years: Vec<i32> = match self.selection {
            PeriodSelection::Interval { .. } => (labels[0].year()..=labels[1].year()).collect(),
            PeriodSelection::Dates(_) => labels.iter().map(PeriodLabel::year).collect(),
        };
        years.sort_unstable();
        years.dedup();
        Ok(years)
    }
}

// ---------------------------------------------------------------------------
// PeriodLabel
// ---------------------------------------------------------------------------

/// A validated `YYYY`, `YYYY-MM` or `YYYY-QN` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PeriodLabel {
    Year(i32),
    Month(i32, u32),
    Quarter(i32, u32),
}

impl PeriodLabel {
    pub fn parse(period_type: PeriodType, label: &str) -> Result<Self> {
        let invalid = || {
            AnalyticsError::InvalidPeriod(format!(
                "label '{}' does not match the {:?} format",
                label, period_type
            ))
        };

        let year = label.get(0..4).and_then(parse_digits).ok_or_else(invalid)? as i32;

        match period_type {
            PeriodType::Year if label.len() == 4 => Ok(PeriodLabel::Year(year)),
            PeriodType::Month if label.len() == 7 && label.get(4..5) == Some("-") => {
                let month = label.get(5..7).and_then(parse_digits).ok_or_else(invalid)?;
                if !(1..=12).contains(&month) {
                    return Err(invalid());
                }
                Ok(PeriodLabel::Month(year, month))
            }
            PeriodType::Quarter if label.len() == 7 && label.get(4..6) == Some("-Q") => {
                let quarter = label.get(6..7).and_then(parse_digits).ok_or_else(invalid)?;
                if !(1..=4).contains(&quarter) {
                    return Err(invalid());
                }
                Ok(PeriodLabel::Quarter(year, quarter))
            }
            _ => Err(invalid()),
        }
    }

    pub fn year(&self) -> i32 {
        match *self {
            PeriodLabel::Year(y) | PeriodLabel::Month(y, _) | PeriodLabel::Quarter(y, _) => y,
        }
    }

    /// Order-preserving integer key: `YYYY`, `YYYYMM` or `YYYYQ`.
    pub fn ordinal(&self) -> i64 {
        match *self {
            PeriodLabel::Year(y) => i64::from(y),
            PeriodLabel::Month(y, m) => i64::from(y) * 100 + i64::from(m),
            PeriodLabel::Quarter(y, q) => i64::from(y) * 10 + i64::from(q),
        }
    }
}

fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
