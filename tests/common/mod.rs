//! Shared test fixtures for the budget analytics integration tests.
//!
//! Provides `setup_sample_db()` which creates an in-memory DuckDB store with
//! the expected schema, lookup tables loaded from NDJSON temp files and a small
//! set of execution line items inserted with bound parameters.
//!
//! Population layout:
//!
//! | county | aggregate unit | localities | county population |
//! |---|---|---|---|
//! | CJ | 10 "CJ" 700 000 | 11 Cluj-Napoca 300 000, 12 Turda 50 000 | 700 000 |
//! | B  | 20 "179132" 1 700 000 | 21 Sector 1 200 000 | 1 700 000 |
//! | AB | none | 30 Alba Iulia 60 000, 31 Aiud 20 000, 50 Mica 0 | 60 000 |
//! | SB | none | 40 Sibiu 100 000 | 100 000 |
//!
//! National population: 2 560 000.
//!
//! The 2023 yearly expense rows (ids 1-7) sum to 4 500 000 over 7
//! classification pairs.

#![allow(dead_code)]

use budget_analytics::{
    AccountCategory, AnalyticsFilter, BudgetAnalytics, Connection, CurrencyRates, Period,
};
use std::io::Write;
use tempfile::NamedTempFile;

pub const NATIONAL_POPULATION: f64 = 2_560_000.0;
pub const EXPENSE_2023_TOTAL: f64 = 4_500_000.0;
pub const EXPENSE_2023_GROUPS: usize = 7;

/// Create an in-memory store populated with the sample data.
pub fn setup_sample_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.create_schema().unwrap();

    register_classifications(&conn);
    register_uats(&conn);
    register_entities(&conn);
    insert_line_items(&conn);

    conn
}

/// A `BudgetAnalytics` over the sample store.
pub fn setup_analytics() -> BudgetAnalytics {
    setup_analytics_with_rates(CurrencyRates::new())
}

pub fn setup_analytics_with_rates(rates: CurrencyRates) -> BudgetAnalytics {
    BudgetAnalytics::builder()
        .connection(setup_sample_db())
        .currency_rates(rates)
        .build()
        .unwrap()
}

/// Expense filter for one year with nothing else set.
pub fn expense_filter(year: i32) -> AnalyticsFilter {
    AnalyticsFilter::new(AccountCategory::Expense, Period::year(year))
}

fn register_classifications(conn: &Connection) {
    let functional = vec![
        serde_json::json!({"functional_code": "65.03.01", "functional_name": "Pre-school education"}),
        serde_json::json!({"functional_code": "65.04.02", "functional_name": "Lower secondary education"}),
        serde_json::json!({"functional_code": "65.06.01", "functional_name": "University education"}),
        serde_json::json!({"functional_code": "66.06.01", "functional_name": "General hospitals"}),
        serde_json::json!({"functional_code": "70.05.01", "functional_name": "Water supply"}),
        serde_json::json!({"functional_code": "84.03.01", "functional_name": "Roads and bridges"}),
        serde_json::json!({"functional_code": "04.02.01", "functional_name": "Income tax shares"}),
    ];
    write_ndjson_and_load(conn, "functional_classifications", &functional);

    // 20.02.01 is deliberately missing to exercise the name fallback.
    let economic = vec![
        serde_json::json!({"economic_code": "10.01.01", "economic_name": "Base salaries"}),
        serde_json::json!({"economic_code": "20.01.03", "economic_name": "Heating and lighting"}),
        serde_json::json!({"economic_code": "71.01.01", "economic_name": "Constructions"}),
    ];
    write_ndjson_and_load(conn, "economic_classifications", &economic);
}

fn register_uats(conn: &Connection) {
    let uat = |id: i64, siruta: &str, name: &str, county: &str, population: i64| {
        serde_json::json!({
            "id": id,
            "uat_code": format!("U{}", id),
            "siruta_code": siruta,
            "name": name,
            "county_code": county,
            "county_name": format!("County {}", county),
            "population": population
        })
    };
    let uats = vec![
        uat(10, "CJ", "Judetul Cluj", "CJ", 700_000),
        uat(11, "54975", "Cluj-Napoca", "CJ", 300_000),
        uat(12, "55268", "Turda", "CJ", 50_000),
        uat(20, "179132", "Bucuresti", "B", 1_700_000),
        uat(21, "179141", "Sector 1", "B", 200_000),
        uat(30, "1017", "Alba Iulia", "AB", 60_000),
        uat(31, "1213", "Aiud", "AB", 20_000),
        uat(50, "1999", "Mica", "AB", 0),
        uat(40, "143450", "Sibiu", "SB", 100_000),
    ];
    write_ndjson_and_load(conn, "uats", &uats);
}

fn register_entities(conn: &Connection) {
    let entities = vec![
        serde_json::json!({"cui": "E1", "name": "Primaria Cluj-Napoca", "entity_type": "admin_municipality", "uat_id": 11, "is_uat": true}),
        serde_json::json!({"cui": "E2", "name": "Primaria Turda", "entity_type": "admin_municipality", "uat_id": 12, "is_uat": true}),
        serde_json::json!({"cui": "E3", "name": "Consiliul Judetean Cluj", "entity_type": "admin_county_council", "uat_id": 10, "is_uat": false}),
        serde_json::json!({"cui": "E4", "name": "Primaria Alba Iulia", "entity_type": "admin_municipality", "uat_id": 30, "is_uat": true}),
        serde_json::json!({"cui": "E5", "name": "Ministerul Educatiei", "entity_type": "ministry", "uat_id": null, "is_uat": false}),
        serde_json::json!({"cui": "E6", "name": "Primaria Sector 1", "entity_type": "admin_municipality", "uat_id": 21, "is_uat": true}),
        serde_json::json!({"cui": "E7", "name": "Primaria Sibiu", "entity_type": "admin_municipality", "uat_id": 40, "is_uat": true}),
        serde_json::json!({"cui": "E8", "name": "Primaria Mica", "entity_type": "admin_commune", "uat_id": 50, "is_uat": true}),
    ];
    write_ndjson_and_load(conn, "entities", &entities);
}

/// One execution line item.
pub struct Item {
    pub id: i64,
    pub entity: &'static str,
    pub functional: &'static str,
    pub economic: Option<&'static str>,
    pub category: &'static str,
    pub year: i32,
    pub month: i32,
    pub quarter: i32,
    pub is_yearly: bool,
    pub is_quarterly: bool,
    pub ytd: f64,
    pub quarterly: f64,
    pub monthly: f64,
    pub main_creditor: Option<&'static str>,
    pub funding_source: Option<i64>,
    pub budget_sector: Option<i64>,
    pub program: Option<&'static str>,
    pub expense_type: Option<&'static str>,
}

/// December row of an expense: closes the year and the fourth quarter.
pub fn yearly(
    id: i64,
    entity: &'static str,
    functional: &'static str,
    economic: Option<&'static str>,
    year: i32,
    ytd: f64,
) -> Item {
    Item {
        id,
        entity,
        functional,
        economic,
        category: "ch",
        year,
        month: 12,
        quarter: 4,
        is_yearly: true,
        is_quarterly: true,
        ytd,
        quarterly: ytd / 4.0,
        monthly: ytd / 10.0,
        main_creditor: None,
        funding_source: None,
        budget_sector: None,
        program: None,
        expense_type: None,
    }
}

fn sample_items() -> Vec<Item> {
    let mut items = vec![
        Item {
            main_creditor: Some("MC1"),
            funding_source: Some(1),
            budget_sector: Some(1),
            expense_type: Some("functionare"),
            ..yearly(1, "E1", "65.03.01", Some("10.01.01"), 2023, 1_000_000.0)
        },
        Item {
            main_creditor: Some("MC1"),
            funding_source: Some(1),
            expense_type: Some("functionare"),
            ..yearly(2, "E1", "65.04.02", Some("20.01.03"), 2023, 500_000.0)
        },
        Item {
            main_creditor: Some("MC1"),
            funding_source: Some(1),
            ..yearly(3, "E2", "66.06.01", Some("10.01.01"), 2023, 300_000.0)
        },
        yearly(4, "E3", "70.05.01", Some("20.02.01"), 2023, 200_000.0),
        yearly(5, "E4", "65.03.01", None, 2023, 100_000.0),
        Item {
            budget_sector: Some(2),
            ..yearly(6, "E5", "65.06.01", Some("10.01.01"), 2023, 2_000_000.0)
        },
        Item {
            funding_source: Some(2),
            program: Some("P1"),
            expense_type: Some("dezvoltare"),
            ..yearly(7, "E6", "84.03.01", Some("71.01.01"), 2023, 400_000.0)
        },
        yearly(8, "E1", "65.03.01", Some("10.01.01"), 2022, 900_000.0),
        Item {
            category: "vn",
            ..yearly(9, "E1", "04.02.01", None, 2023, 5_000_000.0)
        },
        Item {
            month: 3,
            quarter: 1,
            is_yearly: false,
            is_quarterly: true,
            ytd: 250_000.0,
            quarterly: 240_000.0,
            monthly: 80_000.0,
            ..yearly(10, "E1", "65.03.01", Some("10.01.01"), 2023, 0.0)
        },
        // Per-capita scenario: 50 000 000 of education spending in Sibiu.
        yearly(11, "E7", "65.03.01", Some("10.01.01"), 2024, 30_000_000.0),
        yearly(12, "E7", "65.04.02", Some("20.01.03"), 2024, 20_000_000.0),
        yearly(13, "E7", "66.06.01", Some("10.01.01"), 2024, 1_000_000.0),
        // Locality with no recorded population.
        yearly(14, "E8", "65.03.01", Some("10.01.01"), 2021, 12_345.0),
    ];
    items.sort_by_key(|i| i.id);
    items
}

pub fn insert_line_items(conn: &Connection) {
    for item in sample_items() {
        insert_item(conn, &item);
    }
}

pub fn insert_item(conn: &Connection, item: &Item) {
    conn.raw()
        .execute(
            "INSERT INTO execution_line_items (
                line_item_id, report_type, entity_cui, main_creditor_cui,
                budget_sector_id, funding_source_id, functional_code, economic_code,
                account_category, expense_type, program_code, year, month, quarter,
                is_yearly, is_quarterly, ytd_amount, monthly_amount, quarterly_amount
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)",
            duckdb::params![
                item.id,
                "executie_detaliata",
                item.entity,
                item.main_creditor,
                item.budget_sector,
                item.funding_source,
                item.functional,
                item.economic,
                item.category,
                item.expense_type,
                item.program,
                item.year,
                item.month,
                item.quarter,
                item.is_yearly,
                item.is_quarterly,
                item.ytd,
                item.monthly,
                item.quarterly,
            ],
        )
        .unwrap();
}

fn write_ndjson_and_load(conn: &Connection, table_name: &str, rows: &[serde_json::Value]) {
    let mut file = NamedTempFile::new().unwrap();
    for row in rows {
        writeln!(file, "{}", serde_json::to_string(row).unwrap()).unwrap();
    }
    file.flush().unwrap();
    let path = file.path().to_string_lossy().to_string();
    conn.load_ndjson(table_name, &path).unwrap();
}

/// Sum of `amount` over a page of rows.
pub fn sum_amounts(rows: &[budget_analytics::AggregatedRow]) -> f64 {
    rows.iter().map(|r| r.amount).sum()
}

/// Float comparison tolerant to summation order.
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-6 * a.abs().max(b.abs()).max(1.0)
}
