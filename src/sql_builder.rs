//! SQL builder with parameterized query construction.
//!
//! Every value goes through DuckDB's parameter binding with explicit positional
//! placeholders (`$1`, `$2`, ...), never through string interpolation. The
//! placeholder index is the value's position in the accumulated parameter list,
//! so WHERE and HAVING predicates can be added in any order and still line up
//! with their bound values. Builder methods return `&mut Self` for chaining.
//!
//! # Example
//!
//! ```rust
//! use budget_analytics::SqlBuilder;
//! let (sql, params) = SqlBuilder::new("execution_line_items eli")
//!     .where_eq("eli.year", 2023)
//!     .where_any_prefix("eli.functional_code", &["65."])
//!     .order_by(&["amount DESC"])
//!     .limit(10)
//!     .build();
//! assert!(sql.contains("eli.year = $1"));
//! assert_eq!(params.len(), 2);
//! ```

use duckdb::types::{ToSql, ToSqlOutput};

/// A value bound to a positional placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&String> for SqlValue {
    fn from(v: &String) -> Self {
        SqlValue::Text(v.clone())
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(i64::from(v))
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Text(s) => ToSqlOutput::from(s.as_str()),
            SqlValue::Int(n) => ToSqlOutput::from(*n),
            SqlValue::Float(f) => ToSqlOutput::from(*f),
            SqlValue::Bool(b) => ToSqlOutput::from(*b),
        })
    }
}

/// Builds parameterized SQL queries safely.
#[derive(Debug, Clone)]
pub struct SqlBuilder {
    select_cols: Vec<String>,
    from_table: String,
    joins: Vec<String>,
    where_clauses: Vec<String>,
    params: Vec<SqlValue>,
    group_by_cols: Vec<String>,
    having_clauses: Vec<String>,
    order_by_cols: Vec<String>,
    limit_val: Option<usize>,
    offset_val: Option<usize>,
}

impl SqlBuilder {
    /// Create a builder targeting the given table or view.
    pub fn new(table: &str) -> Self {
        Self {
            select_cols: vec!["*".to_string()],
            from_table: table.to_string(),
            joins: Vec::new(),
            where_clauses: Vec::new(),
            params: Vec::new(),
            group_by_cols: Vec::new(),
            having_clauses: Vec::new(),
            order_by_cols: Vec::new(),
            limit_val: None,
            offset_val: None,
        }
    }

    /// Append a value to the parameter list and return its placeholder.
    pub fn bind(&mut self, value: impl Into<SqlValue>) -> String {
        self.params.push(value.into());
        format!("${}", self.params.len())
    }

    /// Set the columns to select (replaces the default `*`).
    pub fn select(&mut self, cols: &[&str]) -> &mut Self {
        self.select_cols = cols.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Add a JOIN clause, e.g. `"JOIN entities e ON eli.entity_cui = e.cui"`.
    pub fn join(&mut self, clause: &str) -> &mut Self {
        self.joins.push(clause.to_string());
        self
    }

    /// Add a WHERE condition whose placeholders were obtained from [`bind`](Self::bind).
    pub fn where_raw(&mut self, condition: impl Into<String>) -> &mut Self {
        self.where_clauses.push(condition.into());
        self
    }

    /// Add an equality condition: `{column} = $n`.
    pub fn where_eq(&mut self, column: &str, value: impl Into<SqlValue>) -> &mut Self {
        let p = self.bind(value);
        self.where_clauses.push(format!("{} = {}", column, p));
        self
    }

    /// Add a greater-than-or-equal condition: `{column} >= $n`.
    pub fn where_gte(&mut self, column: &str, value: impl Into<SqlValue>) -> &mut Self {
        let p = self.bind(value);
        self.where_clauses.push(format!("{} >= {}", column, p));
        self
    }

    /// Add a less-than-or-equal condition: `{column} <= $n`.
    pub fn where_lte(&mut self, column: &str, value: impl Into<SqlValue>) -> &mut Self {
        let p = self.bind(value);
        self.where_clauses.push(format!("{} <= {}", column, p));
        self
    }

    /// Add a case-insensitive substring match on `column`.
    ///
    /// `term` is matched literally: `%`, `_` and `\` are escaped before the
    /// pattern `%term%` is bound.
    pub fn where_contains(&mut self, column: &str, term: &str) -> &mut Self {
        let p = self.bind(format!("%{}%", escape_like(term)));
        self.where_clauses.push(format!(
            "LOWER({}) LIKE LOWER({}) ESCAPE '\\'",
            column, p
        ));
        self
    }

    /// Add an IN condition with parameterized values.
    ///
    /// Empty values list produces `FALSE`.
    pub fn where_in<V>(&mut self, column: &str, values: &[V]) -> &mut Self
    where
        V: Clone + Into<SqlValue>,
    {
        if values.is_empty() {
            self.where_clauses.push("FALSE".to_string());
            return self;
        }
        let placeholders = self.bind_all(values);
        self.where_clauses
            .push(format!("{} IN ({})", column, placeholders.join(", ")));
        self
    }

    /// Add a NULL-safe NOT IN condition: rows with a NULL `column` are kept.
    ///
    /// Empty values list is a no-op.
    pub fn where_not_in<V>(&mut self, column: &str, values: &[V]) -> &mut Self
    where
        V: Clone + Into<SqlValue>,
    {
        if values.is_empty() {
            return self;
        }
        let placeholders = self.bind_all(values);
        self.where_clauses.push(format!(
            "({} IS NULL OR {} NOT IN ({}))",
            column,
            column,
            placeholders.join(", ")
        ));
        self
    }

    /// Keep rows whose `column` starts with any of `prefixes`.
    ///
    /// Empty prefix list produces `FALSE`.
    pub fn where_any_prefix<S: AsRef<str>>(&mut self, column: &str, prefixes: &[S]) -> &mut Self {
        if prefixes.is_empty() {
            self.where_clauses.push("FALSE".to_string());
            return self;
        }
        let cond = self.prefix_disjunction(column, prefixes);
        self.where_clauses.push(cond);
        self
    }

    /// Drop rows whose `column` starts with any of `prefixes` (NULL-safe).
    ///
    /// Empty prefix list is a no-op.
    pub fn where_no_prefix<S: AsRef<str>>(&mut self, column: &str, prefixes: &[S]) -> &mut Self {
        if prefixes.is_empty() {
            return self;
        }
        let cond = self.prefix_disjunction(column, prefixes);
        self.where_clauses
            .push(format!("({} IS NULL OR NOT {})", column, cond));
        self
    }

    /// Add GROUP BY columns.
    pub fn group_by(&mut self, cols: &[&str]) -> &mut Self {
        self.group_by_cols
            .extend(cols.iter().map(|c| c.to_string()));
        self
    }

    /// Add a HAVING condition whose placeholders were obtained from [`bind`](Self::bind).
    pub fn having_raw(&mut self, condition: impl Into<String>) -> &mut Self {
        self.having_clauses.push(condition.into());
        self
    }

    /// Add ORDER BY clauses (e.g. `"amount DESC"`).
    pub fn order_by(&mut self, clauses: &[&str]) -> &mut Self {
        self.order_by_cols
            .extend(clauses.iter().map(|c| c.to_string()));
        self
    }

    /// Set the maximum number of rows to return.
    pub fn limit(&mut self, n: usize) -> &mut Self {
        self.limit_val = Some(n);
        self
    }

    /// Set the number of rows to skip before returning results.
    pub fn offset(&mut self, n: usize) -> &mut Self {
        self.offset_val = Some(n);
        self
    }

    /// WHERE conditions in emission order.
    pub fn where_clauses(&self) -> &[String] {
        &self.where_clauses
    }

    /// HAVING conditions in emission order.
    pub fn having_clauses(&self) -> &[String] {
        &self.having_clauses
    }

    /// Bound values, indexed by placeholder number minus one.
    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    /// Build the final SQL string and parameter list.
    pub fn build(&self) -> (String, Vec<SqlValue>) {
        let mut parts = self.grouped_parts();

        if !self.order_by_cols.is_empty() {
            parts.push(format!("ORDER BY {}", self.order_by_cols.join(", ")));
        }

        if let Some(n) = self.limit_val {
            parts.push(format!("LIMIT {}", n));
        }

        if let Some(n) = self.offset_val {
            parts.push(format!("OFFSET {}", n));
        }

        (parts.join("\n"), self.params.clone())
    }

    /// Build a query counting the groups (or rows) the main query produces.
    ///
    /// ORDER BY, LIMIT and OFFSET are left out; the parameter list is shared
    /// with [`build`](Self::build).
    pub fn build_count(&self) -> (String, Vec<SqlValue>) {
        let inner = self.grouped_parts().join("\n");
        (
            format!("SELECT COUNT(*) AS total FROM (\n{}\n) AS grouped", inner),
            self.params.clone(),
        )
    }

    fn grouped_parts(&self) -> Vec<String> {
        let mut parts = vec![
            format!("SELECT {}", self.select_cols.join(", ")),
            format!("FROM {}", self.from_table),
        ];

        for j in &self.joins {
            parts.push(j.clone());
        }

        if !self.where_clauses.is_empty() {
            parts.push(format!("WHERE {}", self.where_clauses.join(" AND ")));
        }

        if !self.group_by_cols.is_empty() {
            parts.push(format!("GROUP BY {}", self.group_by_cols.join(", ")));
        }

        if !self.having_clauses.is_empty() {
            parts.push(format!("HAVING {}", self.having_clauses.join(" AND ")));
        }

        parts
    }

    fn bind_all<V>(&mut self, values: &[V]) -> Vec<String>
    where
        V: Clone + Into<SqlValue>,
    {
        values.iter().map(|v| self.bind(v.clone())).collect()
    }

    fn prefix_disjunction<S: AsRef<str>>(&mut self, column: &str, prefixes: &[S]) -> String {
        let parts: Vec<String> = prefixes
            .iter()
            .map(|p| {
                let placeholder = self.bind(format!("{}%", escape_like(p.as_ref())));
                format!("{} LIKE {} ESCAPE '\\'", column, placeholder)
            })
            .collect();
        format!("({})", parts.join(" OR "))
    }
}

/// Escape LIKE wildcards so `s` matches literally under `ESCAPE '\'`.
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
