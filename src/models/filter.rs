use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};
use crate::models::period::Period;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountCategory {
    #[serde(rename = "ch", alias = "expense")]
    Expense,
    #[serde(rename = "vn", alias = "revenue")]
    Revenue,
}

impl AccountCategory {
    /// Value stored in the `account_category` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountCategory::Expense => "ch",
            AccountCategory::Revenue => "vn",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseType {
    Dezvoltare,
    Functionare,
}

impl ExpenseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseType::Dezvoltare => "dezvoltare",
            ExpenseType::Functionare => "functionare",
        }
    }
}

/// Presentation transform applied to aggregated amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Normalization {
    #[default]
    #[serde(rename = "total")]
    Total,
    #[serde(rename = "total_euro", alias = "total_currency")]
    TotalCurrency,
    #[serde(rename = "per_capita")]
    PerCapita,
    #[serde(rename = "per_capita_euro", alias = "per_capita_currency")]
    PerCapitaCurrency,
}

impl Normalization {
    pub fn parse(mode: &str) -> Result<Self> {
        match mode {
            "total" => Ok(Normalization::Total),
            "total_euro" | "total_currency" => Ok(Normalization::TotalCurrency),
            "per_capita" => Ok(Normalization::PerCapita),
            "per_capita_euro" | "per_capita_currency" => Ok(Normalization::PerCapitaCurrency),
            other => Err(AnalyticsError::UnknownNormalization(other.to_string())),
        }
    }

    /// Whether amounts are converted per year, which forces per-year buckets.
    pub fn is_currency(&self) -> bool {
        matches!(
            self,
            Normalization::TotalCurrency | Normalization::PerCapitaCurrency
        )
    }

    pub fn is_per_capita(&self) -> bool {
        matches!(
            self,
            Normalization::PerCapita | Normalization::PerCapitaCurrency
        )
    }
}

// ---------------------------------------------------------------------------
// ExcludeFilter
// ---------------------------------------------------------------------------

/// Negated counterparts of the list-valued inclusion fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExcludeFilter {
    pub entity_cuis: Vec<String>,
    pub main_creditor_cuis: Vec<String>,
    pub uat_ids: Vec<i64>,
    pub county_codes: Vec<String>,
    pub entity_types: Vec<String>,
    pub functional_codes: Vec<String>,
    pub functional_prefixes: Vec<String>,
    pub economic_codes: Vec<String>,
    pub economic_prefixes: Vec<String>,
    pub funding_source_ids: Vec<i64>,
    pub budget_sector_ids: Vec<i64>,
    pub program_codes: Vec<String>,
    pub expense_types: Vec<ExpenseType>,
}

impl ExcludeFilter {
    pub fn is_empty(&self) -> bool {
        self == &ExcludeFilter::default()
    }
}

// ---------------------------------------------------------------------------
// AnalyticsFilter
// ---------------------------------------------------------------------------

/// Declarative filter over execution line items.
///
/// Empty lists and `None` values mean "no restriction".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsFilter {
    pub account_category: AccountCategory,
    pub period: Period,

    #[serde(default)]
    pub report_type: Option<String>,
    #[serde(default)]
    pub main_creditor_cui: Option<String>,

    // -- scope --
    #[serde(default)]
    pub entity_cuis: Vec<String>,
    #[serde(default)]
    pub uat_ids: Vec<i64>,
    #[serde(default)]
    pub county_codes: Vec<String>,
    #[serde(default)]
    pub is_uat: Option<bool>,
    #[serde(default)]
    pub min_population: Option<i64>,
    #[serde(default)]
    pub max_population: Option<i64>,
    #[serde(default)]
    pub entity_types: Vec<String>,
    #[serde(default)]
    pub search: Option<String>,

    // -- classifications --
    #[serde(default)]
    pub functional_codes: Vec<String>,
    #[serde(default)]
    pub functional_prefixes: Vec<String>,
    #[serde(default)]
    pub economic_codes: Vec<String>,
    #[serde(default)]
    pub economic_prefixes: Vec<String>,

    // -- other dimensions --
    #[serde(default)]
    pub funding_source_ids: Vec<i64>,
    #[serde(default)]
    pub budget_sector_ids: Vec<i64>,
    #[serde(default)]
    pub program_codes: Vec<String>,
    #[serde(default)]
    pub expense_types: Vec<ExpenseType>,

    // -- thresholds --
    #[serde(default)]
    pub item_min_amount: Option<f64>,
    #[serde(default)]
    pub item_max_amount: Option<f64>,
    #[serde(default)]
    pub aggregate_min_amount: Option<f64>,
    #[serde(default)]
    pub aggregate_max_amount: Option<f64>,

    #[serde(default)]
    pub exclude: ExcludeFilter,
    #[serde(default)]
    pub normalization: Normalization,
}

impl AnalyticsFilter {
    /// A filter with only the required fields set.
    pub fn new(account_category: AccountCategory, period: Period) -> Self {
        Self {
            account_category,
            period,
            report_type: None,
            main_creditor_cui: None,
            entity_cuis: Vec::new(),
            uat_ids: Vec::new(),
            county_codes: Vec::new(),
            is_uat: None,
            min_population: None,
            max_population: None,
            entity_types: Vec::new(),
            search: None,
            functional_codes: Vec::new(),
            functional_prefixes: Vec::new(),
            economic_codes: Vec::new(),
            economic_prefixes: Vec::new(),
            funding_source_ids: Vec::new(),
            budget_sector_ids: Vec::new(),
            program_codes: Vec::new(),
            expense_types: Vec::new(),
            item_min_amount: None,
            item_max_amount: None,
            aggregate_min_amount: None,
            aggregate_max_amount: None,
            exclude: ExcludeFilter::default(),
            normalization: Normalization::Total,
        }
    }

    /// Parse a filter received as JSON from a transport layer.
    ///
    /// A missing period is reported as `InvalidFilter` and an unrecognised
    /// normalization mode as `UnknownNormalization`, both before any
    /// deserialization of the remaining fields.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| AnalyticsError::InvalidFilter("filter must be an object".into()))?;

        if obj.get("period").map_or(true, |p| p.is_null()) {
            return Err(AnalyticsError::InvalidFilter("period is required".into()));
        }

        if let Some(mode) = obj.get("normalization").filter(|m| !m.is_null()) {
            let mode = mode.as_str().ok_or_else(|| {
                AnalyticsError::UnknownNormalization(mode.to_string())
            })?;
            Normalization::parse(mode)?;
        }

        serde_json::from_value(value).map_err(|e| AnalyticsError::InvalidFilter(e.to_string()))
    }

    /// Whether any dimension narrows the set of reporting entities.
    pub fn has_entity_scope(&self) -> bool {
        !self.entity_cuis.is_empty()
            || !self.uat_ids.is_empty()
            || !self.county_codes.is_empty()
            || self.is_uat.is_some()
            || !self.entity_types.is_empty()
    }

    /// Copy with every list field sorted and deduplicated, so filters that
    /// select the same rows serialize identically.
    pub fn canonical(&self) -> Self {
        let mut f = self.clone();
        canon(&mut f.entity_cuis);
        canon(&mut f.uat_ids);
        canon(&mut f.county_codes);
        canon(&mut f.entity_types);
        canon(&mut f.functional_codes);
        canon(&mut f.functional_prefixes);
        canon(&mut f.economic_codes);
        canon(&mut f.economic_prefixes);
        canon(&mut f.funding_source_ids);
        canon(&mut f.budget_sector_ids);
        canon(&mut f.program_codes);
        canon(&mut f.expense_types);

        let ex = &mut f.exclude;
        canon(&mut ex.entity_cuis);
        canon(&mut ex.main_creditor_cuis);
        canon(&mut ex.uat_ids);
        canon(&mut ex.county_codes);
        canon(&mut ex.entity_types);
        canon(&mut ex.functional_codes);
        canon(&mut ex.functional_prefixes);
        canon(&mut ex.economic_codes);
        canon(&mut ex.economic_prefixes);
        canon(&mut ex.funding_source_ids);
        canon(&mut ex.budget_sector_ids);
        canon(&mut ex.program_codes);
        canon(&mut ex.expense_types);
        f
    }
}

fn canon<T: Ord>(v: &mut Vec<T>) {
    v.sort();
    v.dedup();
}
