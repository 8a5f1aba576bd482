//! Table layout expected of the line item store.
//!
//! Parquet snapshots registered through
//! [`Connection::register_dataset`](crate::connection::Connection::register_dataset)
//! must expose the same column names.

pub const SCHEMA_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS functional_classifications (
    functional_code VARCHAR PRIMARY KEY,
    functional_name VARCHAR NOT NULL
);

CREATE TABLE IF NOT EXISTS economic_classifications (
    economic_code VARCHAR PRIMARY KEY,
    economic_name VARCHAR NOT NULL
);

CREATE TABLE IF NOT EXISTS uats (
    id BIGINT PRIMARY KEY,
    uat_code VARCHAR,
    siruta_code VARCHAR,
    name VARCHAR NOT NULL,
    county_code VARCHAR,
    county_name VARCHAR,
    population BIGINT
);

CREATE TABLE IF NOT EXISTS entities (
    cui VARCHAR PRIMARY KEY,
    name VARCHAR NOT NULL,
    entity_type VARCHAR,
    uat_id BIGINT,
    is_uat BOOLEAN NOT NULL DEFAULT FALSE
);

CREATE TABLE IF NOT EXISTS execution_line_items (
    line_item_id BIGINT PRIMARY KEY,
    report_type VARCHAR,
    entity_cui VARCHAR NOT NULL,
    main_creditor_cui VARCHAR,
    budget_sector_id BIGINT,
    funding_source_id BIGINT,
    functional_code VARCHAR NOT NULL,
    economic_code VARCHAR,
    account_category VARCHAR NOT NULL,
    expense_type VARCHAR,
    program_code VARCHAR,
    year INTEGER NOT NULL,
    month INTEGER NOT NULL,
    quarter INTEGER NOT NULL,
    is_yearly BOOLEAN NOT NULL DEFAULT FALSE,
    is_quarterly BOOLEAN NOT NULL DEFAULT FALSE,
    ytd_amount DOUBLE,
    monthly_amount DOUBLE,
    quarterly_amount DOUBLE
);
"#;
