//! Which lookup tables a filter needs joined to the line items.

use crate::models::AnalyticsFilter;

pub const ENTITY_JOIN: &str = "JOIN entities e ON eli.entity_cui = e.cui";
pub const TERRITORIAL_JOIN: &str = "LEFT JOIN uats u ON e.uat_id = u.id";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinRequirements {
    pub needs_entity_join: bool,
    pub needs_territorial_join: bool,
}

impl JoinRequirements {
    /// Inspect the filter without compiling it.
    ///
    /// UATs are reached through the entity row, so a territorial join always
    /// implies the entity join.
    pub fn analyze(filter: &AnalyticsFilter) -> Self {
        let ex = &filter.exclude;

        let needs_territorial_join = !filter.county_codes.is_empty()
            || filter.min_population.is_some()
            || filter.max_population.is_some()
            || !ex.county_codes.is_empty();

        let needs_entity_join = needs_territorial_join
            || !filter.entity_types.is_empty()
            || filter.is_uat.is_some()
            || filter.search.as_deref().is_some_and(|s| !s.trim().is_empty())
            || !filter.uat_ids.is_empty()
            || !ex.entity_types.is_empty()
            || !ex.uat_ids.is_empty();

        Self {
            needs_entity_join,
            needs_territorial_join,
        }
    }

    /// JOIN clauses in the order they must appear.
    pub fn clauses(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.needs_entity_join {
            out.push(ENTITY_JOIN);
        }
        if self.needs_territorial_join {
            out.push(TERRITORIAL_JOIN);
        }
        out
    }
}
