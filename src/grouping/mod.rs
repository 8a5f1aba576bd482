//! Hierarchical regrouping of aggregated rows by classification depth.
//!
//! Classification codes are chapter (2 digits), subchapter (4) and paragraph
//! (6) prefixes of one another. The store keeps them dot formatted
//! (`65.03.01`); this module works on the digits only and hands digits back,
//! leaving [`format_code`] to display layers.
//!
//! A view is described by [`GroupOptions`]: which dimension to group on, the
//! drilldown path chosen so far, and optionally a code of the other dimension
//! that pins the view (a pivot). Grouping runs in memory over the executor's
//! rows and never touches the store.

pub mod labels;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config;
use crate::models::{AggregatedRow, AnalyticsFilter, GroupedItem};

/// Deepest classification level; nodes at this depth are leaves.
pub const LEAF_DEPTH: usize = 6;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    #[default]
    Functional,
    Economic,
}

impl Dimension {
    fn name<'r>(&self, row: &'r AggregatedRow) -> &'r str {
        match self {
            Dimension::Functional => &row.functional_name,
            Dimension::Economic => &row.economic_name,
        }
    }
}

/// Depth of the top level when no drilldown path is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootDepth {
    #[default]
    Chapter,
    Subchapter,
    Paragraph,
}

impl RootDepth {
    pub fn digits(&self) -> usize {
        match self {
            RootDepth::Chapter => 2,
            RootDepth::Subchapter => 4,
            RootDepth::Paragraph => 6,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupOptions {
    pub dimension: Dimension,
    /// Codes chosen so far, outermost first.
    pub path: Vec<String>,
    /// Prefix the other dimension's code must carry.
    pub pivot_constraint: Option<String>,
    pub root_depth: RootDepth,
    /// Chapter codes dropped from the view.
    pub exclude_chapters: Vec<String>,
}

impl GroupOptions {
    pub fn new(dimension: Dimension) -> Self {
        Self {
            dimension,
            ..Self::default()
        }
    }

    pub fn path<S: AsRef<str>>(mut self, path: &[S]) -> Self {
        self.path = path.iter().map(|p| p.as_ref().to_string()).collect();
        self
    }

    pub fn pivot(mut self, code: &str) -> Self {
        self.pivot_constraint = Some(code.to_string());
        self
    }

    pub fn root_depth(mut self, depth: RootDepth) -> Self {
        self.root_depth = depth;
        self
    }

    pub fn exclude_chapters<S: AsRef<str>>(mut self, chapters: &[S]) -> Self {
        self.exclude_chapters = chapters.iter().map(|c| c.as_ref().to_string()).collect();
        self
    }
}

// ---------------------------------------------------------------------------
// Code helpers
// ---------------------------------------------------------------------------

/// Strip everything but ASCII digits: `"65.03.01"` → `"650301"`.
pub fn normalize_code(code: &str) -> String {
    code.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Number of digits in a (possibly dotted) code.
pub fn code_depth(code: &str) -> usize {
    code.chars().filter(|c| c.is_ascii_digit()).count()
}

/// Dotted display form: `"650301"` → `"65.03.01"`.
pub fn format_code(code: &str) -> String {
    let digits = normalize_code(code);
    digits
        .as_bytes()
        .chunks(2)
        .filter_map(|pair| std::str::from_utf8(pair).ok())
        .collect::<Vec<_>>()
        .join(".")
}

/// Depth the next view groups at.
pub fn target_depth(options: &GroupOptions) -> usize {
    match options.path.last() {
        None => options.root_depth.digits(),
        Some(leaf) => (code_depth(leaf) + 2).min(LEAF_DEPTH),
    }
}

fn truncate(code: &str, depth: usize) -> &str {
    code.get(..depth).unwrap_or(code)
}

// ---------------------------------------------------------------------------
// group_items
// ---------------------------------------------------------------------------

struct Bucket<'r> {
    value: f64,
    count: i64,
    representative: &'r AggregatedRow,
}

/// Regroup `rows` one level below the current drilldown position.
///
/// Rows the filter excludes by classification are dropped here as well, so
/// rows that bypassed the store (cached or re-aggregated) obey the same
/// exclusions. Groups come back sorted by value descending, ties by code.
pub fn group_items(
    rows: &[AggregatedRow],
    filter: &AnalyticsFilter,
    options: &GroupOptions,
) -> Vec<GroupedItem> {
    let dimension = options.dimension;
    let depth = target_depth(options);

    let leaf = options.path.last().map(|p| normalize_code(p));
    let pivot = options.pivot_constraint.as_deref().map(normalize_code);
    let excluded_chapters: Vec<String> = options
        .exclude_chapters
        .iter()
        .map(|c| normalize_code(c))
        .collect();
    let exclusions = Exclusions::from_filter(filter);
    let unclassified = normalize_code(config::UNKNOWN_ECONOMIC_CODE);

    let mut buckets: HashMap<String, Bucket<'_>> = HashMap::new();

    for row in rows {
        let functional = normalize_code(&row.functional_code);
        let economic = normalize_code(&row.economic_code);
        if exclusions.drops(&functional, &economic) {
            continue;
        }

        let (code, other) = match dimension {
            Dimension::Functional => (functional, economic),
            Dimension::Economic => (economic, functional),
        };

        if excluded_chapters.iter().any(|c| truncate(&code, 2) == c) {
            continue;
        }
        if dimension == Dimension::Economic && code == unclassified {
            continue;
        }
        if let Some(ref p) = pivot {
            if !other.starts_with(p.as_str()) {
                continue;
            }
        }
        if let Some(ref l) = leaf {
            if !code.starts_with(l.as_str()) || code.len() < depth {
                continue;
            }
        }

        let key = truncate(&code, depth);
        if leaf.as_deref() == Some(key) {
            continue;
        }

        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            value: 0.0,
            count: 0,
            representative: row,
        });
        bucket.value += row.amount;
        bucket.count += row.count;
    }

    let total: f64 = buckets.values().map(|b| b.value).sum();

    let mut items: Vec<GroupedItem> = buckets
        .into_iter()
        .map(|(code, bucket)| {
            let name = display_name(dimension, &code, bucket.representative);
            GroupedItem {
                percentage: if total == 0.0 { 0.0 } else { bucket.value / total },
                is_leaf: depth >= LEAF_DEPTH,
                value: bucket.value,
                count: bucket.count,
                name,
                code,
            }
        })
        .collect();

    items.sort_by(|a, b| b.value.total_cmp(&a.value).then_with(|| a.code.cmp(&b.code)));
    items
}

fn display_name(dimension: Dimension, code: &str, representative: &AggregatedRow) -> String {
    if code.len() < LEAF_DEPTH {
        if let Some(name) = labels::label(dimension, code) {
            return name.to_string();
        }
        return code.to_string();
    }
    let raw = dimension.name(representative).trim();
    if raw.is_empty() {
        code.to_string()
    } else {
        raw.to_string()
    }
}

/// Classification exclusions of a filter, in digit form.
struct Exclusions {
    functional_codes: Vec<String>,
    functional_prefixes: Vec<String>,
    economic_codes: Vec<String>,
    economic_prefixes: Vec<String>,
}

impl Exclusions {
    fn from_filter(filter: &AnalyticsFilter) -> Self {
        let digits = |v: &[String]| {
            v.iter()
                .map(|c| normalize_code(c))
                .filter(|c| !c.is_empty())
                .collect::<Vec<_>>()
        };
        let ex = &filter.exclude;
        Self {
            functional_codes: digits(&ex.functional_codes),
            functional_prefixes: digits(&ex.functional_prefixes),
            economic_codes: digits(&ex.economic_codes),
            economic_prefixes: digits(&ex.economic_prefixes),
        }
    }

    fn drops(&self, functional: &str, economic: &str) -> bool {
        self.functional_codes.iter().any(|c| c == functional)
            || self.functional_prefixes.iter().any(|p| functional.starts_with(p.as_str()))
            || self.economic_codes.iter().any(|c| c == economic)
            || self.economic_prefixes.iter().any(|p| economic.starts_with(p.as_str()))
    }
}
