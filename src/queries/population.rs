//! Population denominators for per-capita normalization.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::Mutex;
use serde::Deserialize;
use tracing::debug;

use crate::config;
use crate::connection::Connection;
use crate::error::Result;
use crate::models::AnalyticsFilter;
use crate::sql_builder::SqlBuilder;

// ---------------------------------------------------------------------------
// EntityScope
// ---------------------------------------------------------------------------

/// Territorial reach of one reporting entity.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityScope {
    /// A locality-level entity; counts its UAT's population.
    Uat {
        uat_id: i64,
        county_code: Option<String>,
        population: f64,
    },
    /// A county council; counts the whole county.
    County { county_code: String },
    /// No territorial mapping; counts the whole country.
    Country,
}

#[derive(Debug, Deserialize)]
struct EntityScopeRow {
    entity_type: Option<String>,
    uat_id: Option<i64>,
    uat_found: bool,
    county_code: Option<String>,
    population: Option<f64>,
}

impl EntityScopeRow {
    fn into_scope(self) -> EntityScope {
        if self.entity_type.as_deref() == Some(config::COUNTY_COUNCIL_ENTITY_TYPE) {
            return match self.county_code {
                Some(county_code) => EntityScope::County { county_code },
                None => EntityScope::Country,
            };
        }
        match self.uat_id {
            Some(uat_id) if self.uat_found => EntityScope::Uat {
                uat_id,
                county_code: self.county_code,
                population: self.population.unwrap_or(0.0),
            },
            _ => EntityScope::Country,
        }
    }
}

// ---------------------------------------------------------------------------
// PopulationQuery
// ---------------------------------------------------------------------------

/// Resolves the population a filter's amounts are divided by.
pub struct PopulationQuery<'a> {
    conn: &'a Connection,
    national_memo: Option<&'a Mutex<Option<f64>>>,
}

impl<'a> PopulationQuery<'a> {
    /// Create a new `PopulationQuery` bound to the given connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            national_memo: None,
        }
    }

    /// Reuse (and fill) a memoized national population.
    pub fn memoized(mut self, memo: &'a Mutex<Option<f64>>) -> Self {
        self.national_memo = Some(memo);
        self
    }

    /// Population for the filter's entity scope.
    ///
    /// Unscoped filters use the national population. Scoped filters sum the
    /// distinct UATs and counties their entities cover, without counting a UAT
    /// whose county is already counted; any entity without a territorial
    /// mapping makes the whole country the denominator. Returns 0 when no
    /// entity matches.
    pub fn resolve(&self, filter: &AnalyticsFilter) -> Result<f64> {
        if !filter.has_entity_scope() {
            return self.national();
        }

        let scopes = self.entity_scopes(filter)?;
        if scopes.is_empty() {
            debug!("no entities matched the population scope");
            return Ok(0.0);
        }
        if scopes.iter().any(|s| matches!(s, EntityScope::Country)) {
            return self.national();
        }

        let mut counties: BTreeSet<String> = BTreeSet::new();
        let mut uats: BTreeMap<i64, (Option<String>, f64)> = BTreeMap::new();
        for scope in scopes {
            match scope {
                EntityScope::County { county_code } => {
                    counties.insert(county_code);
                }
                EntityScope::Uat {
                    uat_id,
                    county_code,
                    population,
                } => {
                    uats.insert(uat_id, (county_code, population));
                }
                EntityScope::Country => {}
            }
        }

        let uat_total: f64 = uats
            .values()
            .filter(|(county, _)| county.as_ref().map_or(true, |c| !counties.contains(c)))
            .map(|(_, population)| population)
            .sum();

        // An empty code list would select every county.
        let county_total: f64 = if counties.is_empty() {
            0.0
        } else {
            let county_codes: Vec<String> = counties.into_iter().collect();
            self.county_populations(&county_codes)?.values().sum()
        };

        debug!(uat_total, county_total, "resolved scoped population");
        Ok(uat_total + county_total)
    }

    /// Sum over counties of each county's population.
    pub fn national(&self) -> Result<f64> {
        if let Some(memo) = self.national_memo {
            if let Some(value) = *memo.lock() {
                return Ok(value);
            }
        }

        let value = self.county_populations(&[])?.values().sum();

        if let Some(memo) = self.national_memo {
            *memo.lock() = Some(value);
        }
        debug!(population = value, "resolved national population");
        Ok(value)
    }

    /// Population per county, restricted to `county_codes` unless empty.
    ///
    /// A county's population is that of its aggregate unit (the UAT whose
    /// SIRUTA code equals the county code, or the capital's dedicated code),
    /// falling back to the largest locality when no aggregate row exists.
    /// Summing every locality would double count the aggregate.
    pub fn county_populations(&self, county_codes: &[String]) -> Result<BTreeMap<String, f64>> {
        let mut qb = SqlBuilder::new(&format!("{} u", config::UATS_TABLE));
        let capital = qb.bind(config::CAPITAL_COUNTY_CODE);
        let capital_siruta = qb.bind(config::CAPITAL_SIRUTA_CODE);
        let population = format!(
            "CAST(COALESCE(MAX(CASE WHEN u.siruta_code = u.county_code \
             OR (u.county_code = {} AND u.siruta_code = {}) \
             THEN u.population END), MAX(u.population), 0) AS DOUBLE) AS population",
            capital, capital_siruta
        );
        qb.select(&["u.county_code AS county_code", population.as_str()]);
        qb.where_raw("u.county_code IS NOT NULL");
        if !county_codes.is_empty() {
            qb.where_in("u.county_code", county_codes);
        }
        qb.group_by(&["u.county_code"]);

        #[derive(Deserialize)]
        struct CountyRow {
            county_code: String,
            population: f64,
        }

        let (sql, params) = qb.build();
        let rows: Vec<CountyRow> = self.conn.execute_into(&sql, &params)?;
        Ok(rows
            .into_iter()
            .map(|r| (r.county_code, r.population))
            .collect())
    }

    /// Classify every entity the filter's scope selects.
    pub fn entity_scopes(&self, filter: &AnalyticsFilter) -> Result<Vec<EntityScope>> {
        let mut qb = SqlBuilder::new(&format!("{} e", config::ENTITIES_TABLE));
        qb.join(&format!("LEFT JOIN {} u ON e.uat_id = u.id", config::UATS_TABLE));
        qb.select(&[
            "e.entity_type AS entity_type",
            "e.uat_id AS uat_id",
            "(u.id IS NOT NULL) AS uat_found",
            "u.county_code AS county_code",
            "CAST(u.population AS DOUBLE) AS population",
        ]);

        if !filter.entity_cuis.is_empty() {
            qb.where_in("e.cui", &filter.entity_cuis);
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
        if !filter.entity_types.is_empty() {
            qb.where_in("e.entity_type", &filter.entity_types);
        }
        if let Some(min) = filter.min_population {
            qb.where_gte("u.population", min);
        }
        if let Some(max) = filter.max_population {
            qb.where_lte("u.population", max);
        }
        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            qb.where_contains("e.name", term);
        }

        let ex = &filter.exclude;
        qb.where_not_in("e.cui", &ex.entity_cuis);
        qb.where_not_in("e.uat_id", &ex.uat_ids);
        qb.where_not_in("u.county_code", &ex.county_codes);
        qb.where_not_in("e.entity_type", &ex.entity_types);

        let (sql, params) = qb.build();
        let rows: Vec<EntityScopeRow> = self.conn.execute_into(&sql, &params)?;
        Ok(rows.into_iter().map(EntityScopeRow::into_scope).collect())
    }
}
