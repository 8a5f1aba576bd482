use serde::{Deserialize, Serialize};

/// One `(functional, economic)` classification pair with its summed amount.
///
/// Amounts are in native currency. `year` is only set when the executor
/// grouped per year for currency conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedRow {
    pub functional_code: String,
    pub functional_name: String,
    pub economic_code: String,
    pub economic_name: String,
    pub amount: f64,
    pub count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

/// A page of aggregated rows plus the number of groups across all pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub rows: Vec<AggregatedRow>,
    pub total_count: usize,
}

/// A classification node produced by the grouping engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedItem {
    pub code: String,
    pub name: String,
    pub value: f64,
    pub count: i64,
    pub is_leaf: bool,
    pub percentage: f64,
}
